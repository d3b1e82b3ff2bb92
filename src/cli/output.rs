//! Output formatting utilities for the CLI.

use serde::Serialize;

/// Command result printable as text or JSON.
pub trait CommandOutput: Serialize {
    /// Human-readable rendering.
    fn to_human(&self) -> String;
    /// JSON rendering.
    fn to_json(&self) -> serde_json::Value;
}

/// Print `result` in the selected format.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Short preview of a vector: the first `count` components.
pub fn preview_vector(vector: &[f32], count: usize) -> String {
    let shown: Vec<String> = vector.iter().take(count).map(|x| format!("{x:.4}")).collect();
    if vector.len() > count {
        format!("[{}, ...]", shown.join(", "))
    } else {
        format!("[{}]", shown.join(", "))
    }
}
