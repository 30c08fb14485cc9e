//! Speech synthesis manager and backends
//!
//! [`SpeechManager`] owns the gating rules: blank text is skipped and an
//! utterance arriving while the backend is mid-speech is dropped rather
//! than queued, so stale confirmations never pile up behind a long one.
//! The actual audio path lives behind [`SpeechBackend`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

/// Delivery options applied to every utterance
#[derive(Clone, Debug)]
pub struct SpeechOptions {
    /// BCP 47 tag selecting the synthesis voice
    pub language: String,
    /// Speaking rate, 0.0 to 1.0
    pub rate: f32,
    /// Output volume, 0.0 to 1.0
    pub volume: f32,
    /// Voice pitch multiplier
    pub pitch: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            rate: 0.5,
            volume: 1.0,
            pitch: 1.0,
        }
    }
}

impl SpeechOptions {
    /// Set the voice language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the speaking rate
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the output volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Set the pitch multiplier
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }
}

/// Platform speech synthesis capability
pub trait SpeechBackend: Send {
    /// Begin speaking an utterance
    fn start_utterance(&mut self, text: &str, options: &SpeechOptions);

    /// Stop speaking immediately
    fn stop(&mut self);

    /// Pause the current utterance
    fn pause(&mut self);

    /// Continue a paused utterance
    fn resume(&mut self);

    /// Whether an utterance is in progress
    fn is_speaking(&self) -> bool;

    /// Whether the current utterance is paused
    fn is_paused(&self) -> bool;
}

/// Gated front door to speech output
pub struct SpeechManager {
    backend: Box<dyn SpeechBackend>,
    options: SpeechOptions,
}

impl SpeechManager {
    pub fn new(backend: Box<dyn SpeechBackend>, options: SpeechOptions) -> Self {
        Self { backend, options }
    }

    /// Speak a confirmation.
    ///
    /// Whitespace-only text is skipped. A call while the backend is
    /// already speaking is dropped, not queued.
    pub fn speak(&mut self, text: &str) {
        if text.trim().is_empty() {
            debug!("Skipping empty utterance");
            return;
        }
        if self.backend.is_speaking() {
            debug!("Already speaking, dropping utterance: '{}'", text);
            return;
        }

        info!("Speaking: '{}'", text);
        self.backend.start_utterance(text, &self.options);
    }

    /// Stop the current utterance
    pub fn stop(&mut self) {
        self.backend.stop();
    }

    /// Pause the current utterance
    pub fn pause(&mut self) {
        self.backend.pause();
    }

    /// Continue speaking, only if currently paused
    pub fn resume(&mut self) {
        if self.backend.is_paused() {
            self.backend.resume();
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.backend.is_speaking()
    }

    pub fn options(&self) -> &SpeechOptions {
        &self.options
    }
}

/// Shared log of utterances delivered to a [`RecordingSpeech`] backend
pub type UtteranceLog = Arc<Mutex<Vec<String>>>;

/// Backend double that records utterances for assertions.
///
/// The speaking/paused flags never change on their own; tests flip them
/// through the shared handles to stage mid-speech and paused conditions.
pub struct RecordingSpeech {
    log: UtteranceLog,
    speaking: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    resumes: Arc<AtomicUsize>,
}

impl RecordingSpeech {
    /// Create the backend together with a handle to its utterance log.
    pub fn new() -> (Self, UtteranceLog) {
        let log: UtteranceLog = Arc::new(Mutex::new(Vec::new()));
        let backend = Self {
            log: Arc::clone(&log),
            speaking: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            resumes: Arc::new(AtomicUsize::new(0)),
        };
        (backend, log)
    }

    /// Shared flag reporting (and staging) the speaking state
    pub fn speaking_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.speaking)
    }

    /// Shared flag reporting (and staging) the paused state
    pub fn paused_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.paused)
    }

    /// Counter incremented on each delivered resume call
    pub fn resume_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resumes)
    }
}

impl SpeechBackend for RecordingSpeech {
    fn start_utterance(&mut self, text: &str, _options: &SpeechOptions) {
        self.log.lock().push(text.to_string());
    }

    fn stop(&mut self) {
        self.speaking.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    fn pause(&mut self) {
        if self.speaking.load(Ordering::SeqCst) {
            self.paused.store(true, Ordering::SeqCst);
        }
    }

    fn resume(&mut self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Backend that logs utterances instead of producing audio.
///
/// Backs the demo binary, where no platform synthesizer is attached.
#[derive(Debug, Default)]
pub struct TracingSpeech;

impl SpeechBackend for TracingSpeech {
    fn start_utterance(&mut self, text: &str, options: &SpeechOptions) {
        info!("[{}] {}", options.language, text);
    }

    fn stop(&mut self) {}

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn is_speaking(&self) -> bool {
        false
    }

    fn is_paused(&self) -> bool {
        false
    }
}
