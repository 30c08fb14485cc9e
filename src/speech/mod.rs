//! Speech output
//!
//! Spoken confirmations for the navigation pipeline. The synthesis
//! backend is a capability trait, so the same [`SpeechManager`] gating
//! runs against a platform engine, the logging stand-in used by the demo
//! binary, or a recording double in tests.

pub mod synthesizer;

pub use synthesizer::{
    RecordingSpeech, SpeechBackend, SpeechManager, SpeechOptions, TracingSpeech, UtteranceLog,
};
