//! Ranging processor
//!
//! Handler/worker split around [`AccessoryRangingManager`]: the processor
//! half carries commands and hardware events in, the worker half applies
//! them on a dedicated thread and emits only the observable differences
//! (status, discoveries, measurement, error message) as events.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

use crate::{Result, WayfinderError};

use super::events::{RadioEvent, SessionEvent};
use super::manager::AccessoryRangingManager;
use super::types::{AccessoryId, AccessoryInfo, ConnectionStatus, RangingMeasurement};

/// Channel capacity for commands and events
const CHANNEL_CAPACITY: usize = 100;

/// Commands accepted by the ranging worker
#[derive(Debug)]
pub enum RangingCommand {
    /// Start scanning for accessories
    StartScanning,
    /// Stop an active scan
    StopScanning,
    /// Connect to a discovered accessory
    Connect(AccessoryId),
    /// Drop the connection and ranging session
    Disconnect,
    /// An event reported by the radio stack
    Radio(RadioEvent),
    /// An event reported by the ranging engine
    Session(SessionEvent),
    /// Shut the worker down
    Shutdown,
}

/// State changes emitted by the ranging worker
#[derive(Clone, Debug)]
pub enum RangingEvent {
    /// Connection status moved to a new value
    StatusChanged(ConnectionStatus),
    /// A new accessory entered the discovered list
    AccessoryDiscovered(AccessoryInfo),
    /// Distance/direction reading changed
    MeasurementChanged(RangingMeasurement),
    /// A new error message was recorded
    ErrorMessage(String),
    /// Worker has shut down
    Shutdown,
}

/// Handle for driving the ranging state machine and receiving its events
pub struct RangingProcessor {
    command_tx: Sender<RangingCommand>,
    event_rx: Receiver<RangingEvent>,
}

impl RangingProcessor {
    /// Create the processor and its worker.
    ///
    /// The worker owns the manager; start it on a dedicated thread with
    /// [`RangingWorker::start`].
    pub fn new(manager: AccessoryRangingManager) -> (Self, RangingWorker) {
        let (command_tx, command_rx) = bounded(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = bounded(CHANNEL_CAPACITY);

        let processor = Self {
            command_tx,
            event_rx,
        };

        let worker = RangingWorker {
            manager,
            command_rx,
            event_tx,
        };

        (processor, worker)
    }

    pub fn start_scanning(&self) -> Result<()> {
        self.send(RangingCommand::StartScanning)
    }

    pub fn stop_scanning(&self) -> Result<()> {
        self.send(RangingCommand::StopScanning)
    }

    pub fn connect(&self, id: AccessoryId) -> Result<()> {
        self.send(RangingCommand::Connect(id))
    }

    pub fn disconnect(&self) -> Result<()> {
        self.send(RangingCommand::Disconnect)
    }

    /// Forward an event from the radio stack
    pub fn report_radio_event(&self, event: RadioEvent) -> Result<()> {
        self.send(RangingCommand::Radio(event))
    }

    /// Forward an event from the ranging engine
    pub fn report_session_event(&self, event: SessionEvent) -> Result<()> {
        self.send(RangingCommand::Session(event))
    }

    /// Request shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.send(RangingCommand::Shutdown)
    }

    fn send(&self, command: RangingCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| WayfinderError::ChannelError(format!("Failed to send command: {e}")))
    }

    /// Get a receiver for events
    pub fn event_receiver(&self) -> Receiver<RangingEvent> {
        self.event_rx.clone()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<RangingEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> Result<RangingEvent> {
        self.event_rx
            .recv()
            .map_err(|e| WayfinderError::ChannelError(format!("Failed to receive event: {e}")))
    }
}

/// Worker that drives the state machine on a dedicated thread
pub struct RangingWorker {
    manager: AccessoryRangingManager,
    command_rx: Receiver<RangingCommand>,
    event_tx: Sender<RangingEvent>,
}

impl RangingWorker {
    /// Start the worker thread
    pub fn start(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    /// Main worker loop
    fn run(mut self) {
        info!("Ranging worker starting");

        loop {
            match self.command_rx.recv() {
                Ok(RangingCommand::Shutdown) => {
                    info!("Ranging worker received shutdown command");
                    let _ = self.event_tx.send(RangingEvent::Shutdown);
                    break;
                }

                Ok(command) => {
                    if !self.apply(command) {
                        break;
                    }
                }

                Err(e) => {
                    error!("Ranging command channel error: {}", e);
                    break;
                }
            }
        }

        info!("Ranging worker stopped");
    }

    /// Apply one command and emit the resulting observable differences.
    fn apply(&mut self, command: RangingCommand) -> bool {
        let status_before = self.manager.status().clone();
        let measurement_before = self.manager.measurement();
        let discovered_before = self.manager.discovered().len();
        let error_before = self.manager.error_message().map(str::to_string);

        match command {
            RangingCommand::StartScanning => self.manager.start_scanning(),
            RangingCommand::StopScanning => self.manager.stop_scanning(),
            RangingCommand::Connect(id) => self.manager.connect(id),
            RangingCommand::Disconnect => self.manager.disconnect(),
            RangingCommand::Radio(event) => self.manager.handle_radio_event(event),
            RangingCommand::Session(event) => self.manager.handle_session_event(event),
            // Handled in the run loop
            RangingCommand::Shutdown => {}
        }

        let mut events = Vec::new();

        if *self.manager.status() != status_before {
            events.push(RangingEvent::StatusChanged(self.manager.status().clone()));
        }
        // A cleared list (scan restart) only shrinks; new entries only append
        for accessory in self.manager.discovered().iter().skip(discovered_before) {
            events.push(RangingEvent::AccessoryDiscovered(accessory.clone()));
        }
        if self.manager.measurement() != measurement_before {
            events.push(RangingEvent::MeasurementChanged(self.manager.measurement()));
        }
        let error_now = self.manager.error_message().map(str::to_string);
        if error_now != error_before {
            if let Some(message) = error_now {
                events.push(RangingEvent::ErrorMessage(message));
            }
        }

        for event in events {
            if self.event_tx.send(event).is_err() {
                error!("Event channel closed, stopping ranging worker");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranging::events::ObjectUpdate;
    use crate::ranging::simulated::{sample_config_blob, RecordingRadio, SimulatedEngine};
    use crate::ranging::types::{
        RadioState, CONFIG_CHARACTERISTIC, CONFIG_DATA_CHARACTERISTIC, RANGING_SERVICE,
    };
    use std::time::Duration;

    fn powered_processor() -> (RangingProcessor, JoinHandle<()>) {
        let (radio, _log) = RecordingRadio::new();
        let manager =
            AccessoryRangingManager::new(Box::new(radio), Box::new(SimulatedEngine::new()));
        let (processor, worker) = RangingProcessor::new(manager);
        let handle = worker.start();
        processor
            .report_radio_event(RadioEvent::PowerStateChanged(RadioState::PoweredOn))
            .unwrap();
        (processor, handle)
    }

    fn next_event(processor: &RangingProcessor) -> RangingEvent {
        processor
            .event_receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap()
    }

    #[test]
    fn test_scan_emits_status_then_discovery() {
        let (processor, handle) = powered_processor();

        processor.start_scanning().unwrap();
        processor
            .report_radio_event(RadioEvent::AccessoryDiscovered {
                id: AccessoryId::new(),
                name: Some("Beacon".to_string()),
                rssi: -48,
            })
            .unwrap();

        match next_event(&processor) {
            RangingEvent::StatusChanged(status) => assert!(status.is_scanning()),
            other => panic!("Expected StatusChanged, got {other:?}"),
        }
        match next_event(&processor) {
            RangingEvent::AccessoryDiscovered(accessory) => assert_eq!(accessory.name, "Beacon"),
            other => panic!("Expected AccessoryDiscovered, got {other:?}"),
        }

        processor.shutdown().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_connect_failure_emits_status_then_error() {
        let (processor, handle) = powered_processor();
        processor.start_scanning().unwrap();

        let id = AccessoryId::new();
        processor
            .report_radio_event(RadioEvent::AccessoryDiscovered {
                id,
                name: Some("Beacon".to_string()),
                rssi: -48,
            })
            .unwrap();
        processor.connect(id).unwrap();
        processor
            .report_radio_event(RadioEvent::ConnectFailed {
                id,
                reason: Some("refused".to_string()),
            })
            .unwrap();

        // Scanning, discovery, connecting, then the failure pair
        assert!(matches!(next_event(&processor), RangingEvent::StatusChanged(_)));
        assert!(matches!(
            next_event(&processor),
            RangingEvent::AccessoryDiscovered(_)
        ));
        match next_event(&processor) {
            RangingEvent::StatusChanged(status) => assert!(status.is_connecting()),
            other => panic!("Expected StatusChanged, got {other:?}"),
        }
        match next_event(&processor) {
            RangingEvent::StatusChanged(status) => {
                assert_eq!(status.error_text(), Some("Failed to connect: refused"));
            }
            other => panic!("Expected StatusChanged, got {other:?}"),
        }
        match next_event(&processor) {
            RangingEvent::ErrorMessage(message) => {
                assert_eq!(message, "Failed to connect: refused");
            }
            other => panic!("Expected ErrorMessage, got {other:?}"),
        }

        processor.shutdown().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_measurement_updates_flow_through() {
        let (processor, handle) = powered_processor();
        processor.start_scanning().unwrap();

        let id = AccessoryId::new();
        processor
            .report_radio_event(RadioEvent::AccessoryDiscovered {
                id,
                name: None,
                rssi: -60,
            })
            .unwrap();
        processor.connect(id).unwrap();
        processor
            .report_radio_event(RadioEvent::ConnectSucceeded { id })
            .unwrap();
        processor
            .report_radio_event(RadioEvent::CharacteristicsDiscovered {
                id,
                service: RANGING_SERVICE,
                characteristics: vec![CONFIG_CHARACTERISTIC, CONFIG_DATA_CHARACTERISTIC],
            })
            .unwrap();
        processor
            .report_radio_event(RadioEvent::CharacteristicRead {
                id,
                characteristic: CONFIG_DATA_CHARACTERISTIC,
                value: sample_config_blob(),
            })
            .unwrap();
        processor
            .report_session_event(SessionEvent::ObjectsUpdated(vec![ObjectUpdate {
                distance: Some(2.5),
                direction: None,
            }]))
            .unwrap();

        // Skip ahead to the ranging transition
        loop {
            match next_event(&processor) {
                RangingEvent::StatusChanged(status) if status.is_ranging() => break,
                RangingEvent::Shutdown => panic!("Worker shut down early"),
                _ => {}
            }
        }
        match next_event(&processor) {
            RangingEvent::MeasurementChanged(measurement) => {
                assert_eq!(measurement.distance, Some(2.5));
            }
            other => panic!("Expected MeasurementChanged, got {other:?}"),
        }

        processor.shutdown().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_no_op_commands_emit_nothing() {
        let (processor, handle) = powered_processor();

        // Stopping an inactive scan changes nothing observable
        processor.stop_scanning().unwrap();
        processor.shutdown().unwrap();

        assert!(matches!(next_event(&processor), RangingEvent::Shutdown));
        handle.join().unwrap();
    }

    #[test]
    fn test_shutdown_emits_event_and_stops_worker() {
        let (processor, handle) = powered_processor();

        processor.shutdown().unwrap();

        assert!(matches!(next_event(&processor), RangingEvent::Shutdown));
        handle.join().unwrap();
    }
}
