//! Intent classification pipeline
//!
//! Turns a transcribed utterance into a structured [`IntentResult`] by way
//! of a remote chat completion call, and renders the spoken confirmation
//! for the recognized intent. Classification never fails outward: every
//! error mode degrades into an `unknown` result carrying the reason.

pub mod feedback;
pub mod prompts;
pub mod router;
pub mod worker;

pub use feedback::{spoken_feedback, UNKNOWN_INTENT_FEEDBACK};
pub use prompts::{build_classifier_prompt, INTENT_CLASSIFIER_PROMPT};
pub use router::{Intent, IntentResult, IntentRouter};
pub use worker::{
    ClassifiedTranscript, IntentCommand, IntentEvent, IntentProcessor, IntentWorker,
};
