//! Pure merge policies for the list-valued turn-state fields. The executor
//! applies these after every node call, so they must stay deterministic and
//! side-effect-free for replay to work.

/// An empty delta clears the list, a non-empty delta appends. The planner
/// resets the reasoning trace each turn through the clearing branch while
/// the other nodes accumulate within it.
pub struct ClearingAppend;

impl ClearingAppend {
    pub fn merge<T: Clone>(current: &[T], delta: Vec<T>) -> Vec<T> {
        if delta.is_empty() {
            return Vec::new();
        }
        let mut out = current.to_vec();
        out.extend(delta);
        out
    }
}

/// Appends, then keeps only the most recent `cap` elements (oldest dropped
/// first).
pub struct BoundedAppend;

impl BoundedAppend {
    pub fn merge<T: Clone>(current: &[T], delta: Vec<T>, cap: usize) -> Vec<T> {
        let mut out = current.to_vec();
        out.extend(delta);
        if out.len() > cap {
            out.drain(..out.len() - cap);
        }
        out
    }
}
