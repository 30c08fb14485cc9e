//! Classifier prompt for the intent router

/// Instruction block sent ahead of every transcript.
///
/// The model is held to a JSON-only contract: one object, an `intent` key,
/// and any extracted parameters alongside it. The trailing space is part of
/// the prompt; the transcript is appended directly after it.
pub const INTENT_CLASSIFIER_PROMPT: &str = r#"You are an intent classifier. Given user input, classify it as one of:
- navigation: user wants directions (extract: destination)
- unknown: anything else

You must respond with ONLY valid JSON, no markdown formatting, no code blocks, no explanation.
Return ONLY the intent name and extracted parameters in raw JSON.

**Example:**
**User Input:** "Navigate to the nearest Starbucks"
**Your Response:**
{
  "intent": "navigation",
  "destination": "Starbucks"
}

**Another Example:**
**User Input:** "Find a cheap Italian restaurant"
**Response:**
{
  "intent": "find_place",
  "place_type": "restaurant",
  "modifiers": ["cheap", "Italian"]
}

**Another Example:**
**User Input:** "What is the capital of France?"
**Response:**
{
  "intent": "unknown"
}

Here is the user input: "#;

/// Build the full prompt for one transcript
pub fn build_classifier_prompt(transcript: &str) -> String {
    format!("{INTENT_CLASSIFIER_PROMPT}{transcript}")
}
