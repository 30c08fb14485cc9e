//! Orchestrator for the end-to-end assistance pipeline
//!
//! Connects the subsystems: transcripts flow into the intent worker,
//! radio and session events flow into the ranging worker, and every
//! observable outcome lands in the shared pipeline state. Completed
//! classifications are additionally spoken through the speech manager.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::integration::config::OrchestratorConfig;
use crate::integration::state::{PipelineSnapshot, SharedPipelineState};
use crate::intent::{IntentEvent, IntentProcessor, IntentRouter, IntentWorker};
use crate::llm::{ChatApi, OpenRouterClient};
use crate::ranging::{
    AccessoryId, AccessoryRangingManager, RadioEvent, RadioLink, RangingEngine, RangingEvent,
    RangingProcessor, RangingWorker, SessionEvent,
};
use crate::speech::{SpeechBackend, SpeechManager};
use crate::{Result, WayfinderError};

const CHANNEL_CAPACITY: usize = 100;

/// Commands accepted by the orchestrator
#[derive(Debug)]
pub enum OrchestratorCommand {
    /// Classify a transcribed utterance
    SubmitTranscript(String),

    /// Start scanning for ranging accessories
    StartScanning,

    /// Stop an active scan
    StopScanning,

    /// Connect to a discovered accessory
    Connect(AccessoryId),

    /// Tear down the current connection
    Disconnect,

    /// Forward a radio stack event
    Radio(RadioEvent),

    /// Forward a ranging session event
    Session(SessionEvent),

    /// Shut down all workers and stop
    Shutdown,
}

/// Handle for driving the orchestrator from the outside
#[derive(Clone)]
pub struct OrchestratorHandle {
    command_tx: Sender<OrchestratorCommand>,
    state: SharedPipelineState,
}

impl OrchestratorHandle {
    /// Send a command to the orchestrator
    pub fn send_command(&self, command: OrchestratorCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| WayfinderError::ChannelError(format!("Failed to send command: {e}")))
    }

    /// Submit a transcript for classification
    pub fn submit_transcript(&self, transcript: impl Into<String>) -> Result<()> {
        self.send_command(OrchestratorCommand::SubmitTranscript(transcript.into()))
    }

    /// Start scanning for accessories
    pub fn start_scanning(&self) -> Result<()> {
        self.send_command(OrchestratorCommand::StartScanning)
    }

    /// Stop an active scan
    pub fn stop_scanning(&self) -> Result<()> {
        self.send_command(OrchestratorCommand::StopScanning)
    }

    /// Connect to a discovered accessory
    pub fn connect(&self, id: AccessoryId) -> Result<()> {
        self.send_command(OrchestratorCommand::Connect(id))
    }

    /// Tear down the current connection
    pub fn disconnect(&self) -> Result<()> {
        self.send_command(OrchestratorCommand::Disconnect)
    }

    /// Forward a radio stack event
    pub fn report_radio_event(&self, event: RadioEvent) -> Result<()> {
        self.send_command(OrchestratorCommand::Radio(event))
    }

    /// Forward a ranging session event
    pub fn report_session_event(&self, event: SessionEvent) -> Result<()> {
        self.send_command(OrchestratorCommand::Session(event))
    }

    /// Request a graceful shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.send_command(OrchestratorCommand::Shutdown)
    }

    /// The shared pipeline state
    pub fn state(&self) -> &SharedPipelineState {
        &self.state
    }

    /// Snapshot of the current pipeline state
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.state.snapshot()
    }
}

/// Coordinates the intent, ranging and speech subsystems
pub struct Orchestrator<C: ChatApi + Send + 'static> {
    config: OrchestratorConfig,
    command_rx: Receiver<OrchestratorCommand>,
    state: SharedPipelineState,
    intent: IntentProcessor,
    intent_worker: Option<IntentWorker<C>>,
    ranging: RangingProcessor,
    ranging_worker: Option<RangingWorker>,
    speech: SpeechManager,
}

impl Orchestrator<OpenRouterClient> {
    /// Create an orchestrator backed by the configured chat endpoint
    pub fn new(
        config: OrchestratorConfig,
        radio: Box<dyn RadioLink>,
        engine: Box<dyn RangingEngine>,
        speech_backend: Box<dyn SpeechBackend>,
    ) -> Result<(Self, OrchestratorHandle)> {
        config.validate().map_err(WayfinderError::ConfigError)?;
        let api = OpenRouterClient::new(config.chat.clone())
            .map_err(|e| WayfinderError::ConfigError(format!("Failed to build chat client: {e}")))?;
        Ok(Self::with_chat_api(config, api, radio, engine, speech_backend))
    }
}

impl<C: ChatApi + Send + 'static> Orchestrator<C> {
    /// Create an orchestrator with an explicit chat API implementation
    pub fn with_chat_api(
        config: OrchestratorConfig,
        api: C,
        radio: Box<dyn RadioLink>,
        engine: Box<dyn RangingEngine>,
        speech_backend: Box<dyn SpeechBackend>,
    ) -> (Self, OrchestratorHandle) {
        let (command_tx, command_rx) = bounded(CHANNEL_CAPACITY);
        let state = SharedPipelineState::new();

        let router = IntentRouter::with_api(api, config.env_path.clone());
        let (intent, intent_worker) = IntentProcessor::new(router);

        let manager = AccessoryRangingManager::new(radio, engine);
        // Surface the construction-time capability probe right away
        if let Some(message) = manager.error_message() {
            state.write().set_error(message.to_string());
        }
        let (ranging, ranging_worker) = RangingProcessor::new(manager);

        let speech = SpeechManager::new(speech_backend, config.speech.clone());

        let handle = OrchestratorHandle {
            command_tx,
            state: state.clone(),
        };

        let orchestrator = Self {
            config,
            command_rx,
            state,
            intent,
            intent_worker: Some(intent_worker),
            ranging,
            ranging_worker: Some(ranging_worker),
            speech,
        };

        (orchestrator, handle)
    }

    /// Start all workers and the orchestrator loop.
    ///
    /// Consumes the orchestrator; the returned handles join once shutdown
    /// completes.
    pub fn start(mut self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if let Some(worker) = self.intent_worker.take() {
            handles.push(worker.start());
            info!("Intent worker started");
        }
        if let Some(worker) = self.ranging_worker.take() {
            handles.push(worker.start());
            info!("Ranging worker started");
        }

        handles.push(thread::spawn(move || self.run()));
        handles
    }

    /// Main orchestrator loop
    fn run(mut self) {
        info!("Orchestrator started");

        let commands = self.command_rx.clone();
        let intent_events = self.intent.event_receiver();
        let ranging_events = self.ranging.event_receiver();

        loop {
            select! {
                recv(commands) -> command => match command {
                    Ok(OrchestratorCommand::Shutdown) => {
                        info!("Orchestrator shutdown requested");
                        self.shutdown_workers();
                        break;
                    }
                    Ok(command) => self.handle_command(command),
                    Err(_) => {
                        warn!("Command channel disconnected");
                        self.shutdown_workers();
                        break;
                    }
                },
                recv(intent_events) -> event => match event {
                    Ok(event) => self.handle_intent_event(event),
                    Err(_) => {
                        warn!("Intent event channel disconnected");
                        break;
                    }
                },
                recv(ranging_events) -> event => match event {
                    Ok(event) => self.handle_ranging_event(event),
                    Err(_) => {
                        warn!("Ranging event channel disconnected");
                        break;
                    }
                },
            }
        }

        info!("Orchestrator stopped");
    }

    fn handle_command(&mut self, command: OrchestratorCommand) {
        match command {
            OrchestratorCommand::SubmitTranscript(text) => match self.intent.classify(text) {
                Ok(request_id) => debug!("Transcript queued as request {}", request_id),
                Err(e) => {
                    warn!("Failed to queue transcript: {}", e);
                    self.state.write().set_error(e.to_string());
                }
            },
            OrchestratorCommand::StartScanning => {
                if let Err(e) = self.ranging.start_scanning() {
                    warn!("Failed to forward scan start: {}", e);
                }
            }
            OrchestratorCommand::StopScanning => {
                if let Err(e) = self.ranging.stop_scanning() {
                    warn!("Failed to forward scan stop: {}", e);
                }
            }
            OrchestratorCommand::Connect(id) => {
                if let Err(e) = self.ranging.connect(id) {
                    warn!("Failed to forward connect request: {}", e);
                }
            }
            OrchestratorCommand::Disconnect => {
                if let Err(e) = self.ranging.disconnect() {
                    warn!("Failed to forward disconnect request: {}", e);
                }
            }
            OrchestratorCommand::Radio(event) => {
                if let Err(e) = self.ranging.report_radio_event(event) {
                    warn!("Failed to forward radio event: {}", e);
                }
            }
            OrchestratorCommand::Session(event) => {
                if let Err(e) = self.ranging.report_session_event(event) {
                    warn!("Failed to forward session event: {}", e);
                }
            }
            // Handled in the run loop
            OrchestratorCommand::Shutdown => {}
        }
    }

    fn handle_intent_event(&mut self, event: IntentEvent) {
        match event {
            IntentEvent::Started { request_id } => {
                debug!("Classifying request {}", request_id);
                self.state.write().begin_classification();
            }
            IntentEvent::Classified(record) => {
                info!(
                    "Classified \"{}\" as {}",
                    record.transcript, record.result.intent
                );
                self.speech.speak(&record.feedback);
                self.state.write().finish_classification(record);
            }
            IntentEvent::Shutdown => debug!("Intent worker shut down"),
        }
    }

    fn handle_ranging_event(&mut self, event: RangingEvent) {
        match event {
            RangingEvent::Shutdown => debug!("Ranging worker shut down"),
            event => self.state.write().apply_ranging_event(&event),
        }
    }

    /// Ask both workers to stop and drain their final events.
    ///
    /// Waits up to the configured timeout for each worker's Shutdown event
    /// so late classifications still reach the shared state.
    fn shutdown_workers(&mut self) {
        if let Err(e) = self.intent.shutdown() {
            warn!("Failed to request intent worker shutdown: {}", e);
        }
        if let Err(e) = self.ranging.shutdown() {
            warn!("Failed to request ranging worker shutdown: {}", e);
        }

        let deadline = Instant::now() + self.config.shutdown_timeout;
        let mut intent_done = false;
        let mut ranging_done = false;

        while !(intent_done && ranging_done) {
            if Instant::now() >= deadline {
                warn!("Worker shutdown timed out");
                break;
            }

            if !intent_done {
                while let Some(event) = self.intent.try_recv_event() {
                    let done = matches!(event, IntentEvent::Shutdown);
                    self.handle_intent_event(event);
                    if done {
                        intent_done = true;
                        break;
                    }
                }
            }
            if !ranging_done {
                while let Some(event) = self.ranging.try_recv_event() {
                    let done = matches!(event, RangingEvent::Shutdown);
                    self.handle_ranging_event(event);
                    if done {
                        ranging_done = true;
                        break;
                    }
                }
            }

            if !(intent_done && ranging_done) {
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeChatApi;
    use crate::ranging::{RecordingRadio, SimulatedEngine};
    use crate::speech::RecordingSpeech;
    use std::fs;
    use std::path::PathBuf;
    use uuid::Uuid;

    struct TempEnv {
        path: PathBuf,
    }

    impl TempEnv {
        fn with_key() -> Self {
            let path = std::env::temp_dir().join(format!("wayfinder-env-{}", Uuid::new_v4()));
            fs::write(&path, "OPENROUTER_API_KEY=sk-or-test\n").unwrap();
            Self { path }
        }
    }

    impl Drop for TempEnv {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    fn fake_orchestrator(
        env: &TempEnv,
        answer: &str,
    ) -> (Orchestrator<FakeChatApi>, OrchestratorHandle) {
        let config = OrchestratorConfig::default().with_env_path(&env.path);
        let (radio, _requests) = RecordingRadio::new();
        let (speech, _utterances) = RecordingSpeech::new();
        Orchestrator::with_chat_api(
            config,
            FakeChatApi::always(answer),
            Box::new(radio),
            Box::new(SimulatedEngine::new()),
            Box::new(speech),
        )
    }

    #[test]
    fn test_creation_yields_idle_state() {
        let env = TempEnv::with_key();
        let (_orchestrator, handle) = fake_orchestrator(&env, r#"{"intent": "unknown"}"#);

        let snapshot = handle.snapshot();
        assert!(snapshot.classification.is_none());
        assert_eq!(snapshot.classifications_in_flight, 0);
        assert!(snapshot.ranging_status.is_disconnected());
        assert!(snapshot.last_error.is_none());
    }

    #[test]
    fn test_unsupported_engine_error_is_visible_immediately() {
        let env = TempEnv::with_key();
        let config = OrchestratorConfig::default().with_env_path(&env.path);
        let (radio, _requests) = RecordingRadio::new();
        let (speech, _utterances) = RecordingSpeech::new();

        let (_orchestrator, handle) = Orchestrator::with_chat_api(
            config,
            FakeChatApi::new(),
            Box::new(radio),
            Box::new(SimulatedEngine::unsupported()),
            Box::new(speech),
        );

        assert_eq!(
            handle.snapshot().last_error.as_deref(),
            Some(crate::ranging::RANGING_UNSUPPORTED)
        );
    }

    #[test]
    fn test_start_and_shutdown_join_cleanly() {
        let env = TempEnv::with_key();
        let (orchestrator, handle) = fake_orchestrator(&env, r#"{"intent": "unknown"}"#);

        let handles = orchestrator.start();
        handle.shutdown().unwrap();

        for join_handle in handles {
            join_handle.join().unwrap();
        }
    }
}
