//! Intent classification processor
//!
//! Handler/worker split around [`IntentRouter`]: the processor half sends
//! commands and receives events, the worker half runs on its own thread
//! with a private tokio runtime for the network call. Blank transcripts
//! are filtered here so the router always sees real input.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::llm::ChatApi;
use crate::{Result, WayfinderError};

use super::feedback::spoken_feedback;
use super::router::{IntentResult, IntentRouter};

/// Channel capacity for commands and events
const CHANNEL_CAPACITY: usize = 100;

/// One fully classified transcript
#[derive(Clone, Debug, Serialize)]
pub struct ClassifiedTranscript {
    /// Request id handed out when the transcript was submitted
    pub request_id: Uuid,
    /// The transcript as classified
    pub transcript: String,
    /// Structured classification outcome
    pub result: IntentResult,
    /// Spoken confirmation rendered from the result
    pub feedback: String,
    /// Completion time, used for latest-wins ordering downstream
    pub classified_at: DateTime<Utc>,
}

/// Commands accepted by the intent worker
#[derive(Debug)]
pub enum IntentCommand {
    /// Classify a transcript
    Classify {
        transcript: String,
        request_id: Uuid,
    },
    /// Shut the worker down
    Shutdown,
}

/// Events emitted by the intent worker
#[derive(Clone, Debug)]
pub enum IntentEvent {
    /// Classification started for a request
    Started { request_id: Uuid },
    /// Classification finished
    Classified(ClassifiedTranscript),
    /// Worker has shut down
    Shutdown,
}

/// Handle for submitting transcripts and receiving classification events
pub struct IntentProcessor {
    command_tx: Sender<IntentCommand>,
    event_rx: Receiver<IntentEvent>,
}

impl IntentProcessor {
    /// Create the processor and its worker.
    ///
    /// The worker owns the router; start it on a dedicated thread with
    /// [`IntentWorker::start`].
    pub fn new<C: ChatApi>(router: IntentRouter<C>) -> (Self, IntentWorker<C>) {
        let (command_tx, command_rx) = bounded(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = bounded(CHANNEL_CAPACITY);

        let processor = Self {
            command_tx,
            event_rx,
        };

        let worker = IntentWorker {
            router,
            command_rx,
            event_tx,
        };

        (processor, worker)
    }

    /// Submit a transcript for classification, returning its request id
    pub fn classify(&self, transcript: impl Into<String>) -> Result<Uuid> {
        let request_id = Uuid::new_v4();
        self.command_tx
            .send(IntentCommand::Classify {
                transcript: transcript.into(),
                request_id,
            })
            .map_err(|e| WayfinderError::ChannelError(format!("Failed to send transcript: {e}")))?;
        Ok(request_id)
    }

    /// Request shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(IntentCommand::Shutdown)
            .map_err(|e| WayfinderError::ChannelError(format!("Failed to send shutdown: {e}")))
    }

    /// Get a receiver for events
    pub fn event_receiver(&self) -> Receiver<IntentEvent> {
        self.event_rx.clone()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<IntentEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> Result<IntentEvent> {
        self.event_rx
            .recv()
            .map_err(|e| WayfinderError::ChannelError(format!("Failed to receive event: {e}")))
    }
}

/// Worker that classifies transcripts on a dedicated thread
pub struct IntentWorker<C: ChatApi> {
    router: IntentRouter<C>,
    command_rx: Receiver<IntentCommand>,
    event_tx: Sender<IntentEvent>,
}

impl<C: ChatApi + Send + 'static> IntentWorker<C> {
    /// Start the worker thread
    pub fn start(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    /// Main worker loop
    fn run(self) {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to create intent worker runtime: {}", e);
                return;
            }
        };

        info!("Intent worker starting");

        loop {
            match self.command_rx.recv() {
                Ok(IntentCommand::Classify {
                    transcript,
                    request_id,
                }) => {
                    if transcript.trim().is_empty() {
                        warn!("Empty transcript received, ignoring");
                        continue;
                    }

                    debug!("Classifying request {}: '{}'", request_id, transcript);
                    if self
                        .event_tx
                        .send(IntentEvent::Started { request_id })
                        .is_err()
                    {
                        error!("Event channel closed, stopping intent worker");
                        break;
                    }

                    let result = runtime.block_on(self.router.classify(&transcript));
                    let feedback = spoken_feedback(&result);
                    info!(
                        "Classified request {} as '{}' (confidence {})",
                        request_id, result.intent, result.confidence
                    );

                    let record = ClassifiedTranscript {
                        request_id,
                        transcript,
                        result,
                        feedback,
                        classified_at: Utc::now(),
                    };

                    if self.event_tx.send(IntentEvent::Classified(record)).is_err() {
                        error!("Event channel closed, stopping intent worker");
                        break;
                    }
                }

                Ok(IntentCommand::Shutdown) => {
                    info!("Intent worker received shutdown command");
                    let _ = self.event_tx.send(IntentEvent::Shutdown);
                    break;
                }

                Err(e) => {
                    error!("Intent command channel error: {}", e);
                    break;
                }
            }
        }

        info!("Intent worker stopped");
    }
}
