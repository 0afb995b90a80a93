use reagent_core::default_stop_markers;

#[derive(Clone, Debug)]
pub struct GraphConfig {
    /// Agent invocations allowed per turn before the loop gives up. The
    /// sole termination safeguard besides a `Finish` step.
    pub max_iterations: u32,
    /// Literal markers stripped from model output before parsing and from
    /// streamed agent frames.
    pub stop_markers: Vec<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            stop_markers: default_stop_markers(),
        }
    }
}
