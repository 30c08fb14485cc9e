//! Spoken confirmation text for classified intents

use serde_json::{Map, Value};

use super::router::{Intent, IntentResult};

/// Spoken when classification produced no recognized intent
pub const UNKNOWN_INTENT_FEEDBACK: &str = "Unknown intent detected. Please try again.";

/// Render the spoken confirmation for a classification result
pub fn spoken_feedback(result: &IntentResult) -> String {
    match result.intent {
        Intent::Navigation => navigation_feedback(&result.parameters),
        Intent::Unknown => UNKNOWN_INTENT_FEEDBACK.to_string(),
    }
}

/// Build the navigation confirmation.
///
/// Parameters are read out in alphabetical key order as
/// `"Key: value"` items joined by `". "`. When a non-empty destination is
/// among them, the canned guidance sentence is appended once at the end.
pub fn navigation_feedback(parameters: &Map<String, Value>) -> String {
    let mut spoken = String::from("Navigation intent detected. ");

    let mut keys: Vec<&String> = parameters.keys().collect();
    keys.sort();

    let mut destination = String::new();

    for (index, key) in keys.iter().enumerate() {
        let capitalized = capitalize_first(key);
        let value = render_value(&parameters[key.as_str()]);

        spoken.push_str(&capitalized);
        spoken.push_str(": ");
        spoken.push_str(&value);

        if capitalized == "Destination" {
            destination = value;
        }

        if index + 1 < keys.len() {
            spoken.push_str(". ");
        }
    }

    if !destination.is_empty() {
        spoken.push_str(&format!(
            ". The nearest {destination} is 1 minute away. Turn right and you should be there in one minute."
        ));
    }

    spoken
}

/// Uppercase the first character, leaving the rest untouched
fn capitalize_first(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Strings read out bare; other JSON values in their JSON form
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
