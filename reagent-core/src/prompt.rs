use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::Value;

fn slot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid slot pattern"))
}

/// Minimal `{{var}}` template. Unknown slots render as empty strings so
/// optional sections (e.g. conversation history on a first turn) need no
/// special casing.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, vars: &HashMap<String, Value>) -> String {
        slot_pattern()
            .replace_all(&self.template, |caps: &regex::Captures| {
                match vars.get(&caps[1]) {
                    Some(value) => value
                        .as_str()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| value.to_string()),
                    None => String::new(),
                }
            })
            .to_string()
    }
}
