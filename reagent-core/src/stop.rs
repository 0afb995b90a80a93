/// Literal markers the model uses to delimit a turn. Kept as data so the
/// table can change without touching the parser grammar.
pub const STOP_MARKERS: [&str; 6] = [
    "Observation:",
    "[/WORKSPACE]",
    "User:",
    "STOP",
    "Error:",
    "AI:",
];

/// Marker the model prefixes its final answer with; removed from `Finish`
/// output before it reaches the caller.
pub const FINAL_ANSWER_MARKER: &str = "Agent:";

pub fn strip_stop_markers(text: &str, markers: &[String]) -> String {
    let mut out = text.to_string();
    for marker in markers {
        out = out.replace(marker.as_str(), "");
    }
    out
}

pub fn default_stop_markers() -> Vec<String> {
    STOP_MARKERS.iter().map(|m| m.to_string()).collect()
}
