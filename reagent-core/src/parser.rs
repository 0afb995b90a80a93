use std::sync::OnceLock;

use regex::Regex;

use crate::step::Step;
use crate::stop::{strip_stop_markers, FINAL_ANSWER_MARKER};

fn reaction_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?s)(?:Thought\s*:\s*(.*?)\s*)?Action\s*:\s*(.*?)\s*Action\s*Input\s*:\s*(.*?)(?:\s*Observation\s*:.*)?$",
        )
        .expect("valid reaction pattern")
    })
}

fn observation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)Observation\s*:\s*(.*)$").expect("valid observation pattern"))
}

/// Classifies raw model output as `Action`, `Finish` or `Error`.
///
/// Configured stop markers are stripped first. Text matching the
/// `Action:`/`Action Input:` grammar becomes an `Action` only when the tool
/// name is registered and the input parses as JSON; any violation becomes a
/// typed `Error` step that re-enters the loop instead of crashing it. Text
/// with no `Action:` marker is the final answer.
///
/// When no `Thought:` label is present, the thought is the stripped text
/// preceding the first `Action` token, trimmed; it is empty when the text
/// begins with `Action`.
pub fn parse_reaction(raw: &str, tool_names: &[String], stop_markers: &[String]) -> Step {
    let text = strip_stop_markers(raw, stop_markers);

    let Some(caps) = reaction_pattern().captures(&text) else {
        return Step::Finish {
            output: text.replace(FINAL_ANSWER_MARKER, "").trim().to_string(),
            log: Some(raw.to_string()),
        };
    };

    let action = caps[2].trim().to_string();
    if !tool_names.iter().any(|name| name == &action) {
        return Step::Error {
            error: format!(
                "Invalid Action `{action}`, must be one of [{}]",
                tool_names.join(", ")
            ),
            log: Some(raw.to_string()),
        };
    }

    let action_input = match serde_json::from_str(caps[3].trim()) {
        Ok(value) => value,
        Err(err) => {
            return Step::Error {
                error: format!(
                    "Invalid Action Input for `{action}`, retry the action but resolve the error: < {err} >"
                ),
                log: Some(raw.to_string()),
            };
        }
    };

    let thought = match caps.get(1).map(|m| m.as_str().trim()) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            if text.trim_start().starts_with("Action") {
                String::new()
            } else {
                text.split("Action").next().unwrap_or("").trim().to_string()
            }
        }
    };

    Step::Action {
        thought,
        action,
        action_input,
        scratchpad: text.trim().to_string(),
        log: Some(raw.to_string()),
    }
}

/// Extracts the text after an `Observation:` marker, or takes the whole
/// text verbatim. Cannot fail.
pub fn parse_observation(raw: &str) -> Step {
    let observation = match observation_pattern().captures(raw) {
        Some(caps) => caps[1].trim().to_string(),
        None => raw.trim().to_string(),
    };
    Step::Observation {
        observation,
        log: None,
    }
}

pub fn parse_plan(raw: &str) -> String {
    raw.trim().to_string()
}
