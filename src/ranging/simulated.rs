//! In-process radio and engine stand-ins
//!
//! `RecordingRadio` and `SimulatedEngine` let the accessory state machine
//! and the ranging worker run without any hardware attached. The radio
//! records every outbound request so tests can assert on the exact command
//! sequence; the engine hands out sessions that accept any plausible
//! configuration blob.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::radio::{RadioLink, RadioRequest};
use super::session::{AccessorySession, RangingEngine, SessionError};
use super::types::{AccessoryId, CharacteristicId, ServiceId};

/// Shared log of requests issued through a [`RecordingRadio`].
pub type RadioRequestLog = Arc<Mutex<Vec<RadioRequest>>>;

/// Shortest configuration blob a simulated session will accept.
const MIN_CONFIG_LEN: usize = 4;

/// A [`RadioLink`] that records requests instead of touching hardware.
pub struct RecordingRadio {
    log: RadioRequestLog,
}

impl RecordingRadio {
    /// Create the radio together with a handle to its request log.
    pub fn new() -> (Self, RadioRequestLog) {
        let log: RadioRequestLog = Arc::new(Mutex::new(Vec::new()));
        (Self { log: Arc::clone(&log) }, log)
    }

    fn record(&self, request: RadioRequest) {
        debug!("Radio request: {:?}", request);
        self.log.lock().push(request);
    }
}

impl RadioLink for RecordingRadio {
    fn start_scan(&mut self, service: ServiceId) {
        self.record(RadioRequest::StartScan { service });
    }

    fn stop_scan(&mut self) {
        self.record(RadioRequest::StopScan);
    }

    fn connect(&mut self, id: AccessoryId) {
        self.record(RadioRequest::Connect { id });
    }

    fn cancel_connection(&mut self, id: AccessoryId) {
        self.record(RadioRequest::CancelConnection { id });
    }

    fn discover_services(&mut self, id: AccessoryId, services: &[ServiceId]) {
        self.record(RadioRequest::DiscoverServices {
            id,
            services: services.to_vec(),
        });
    }

    fn discover_characteristics(
        &mut self,
        id: AccessoryId,
        service: ServiceId,
        characteristics: &[CharacteristicId],
    ) {
        self.record(RadioRequest::DiscoverCharacteristics {
            id,
            service,
            characteristics: characteristics.to_vec(),
        });
    }

    fn read_characteristic(&mut self, id: AccessoryId, characteristic: CharacteristicId) {
        self.record(RadioRequest::ReadCharacteristic { id, characteristic });
    }

    fn write_characteristic(
        &mut self,
        id: AccessoryId,
        characteristic: CharacteristicId,
        value: &[u8],
    ) {
        self.record(RadioRequest::WriteCharacteristic {
            id,
            characteristic,
            value: value.to_vec(),
        });
    }
}

/// A [`RangingEngine`] whose sessions validate blobs in memory.
pub struct SimulatedEngine {
    supported: bool,
    created: Arc<AtomicUsize>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            supported: true,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An engine that reports ranging as unavailable on this device.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter incremented each time a session is created.
    pub fn created_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.created)
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RangingEngine for SimulatedEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create_session(&mut self) -> Box<dyn AccessorySession> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(SimulatedSession { running: false })
    }
}

/// Session produced by [`SimulatedEngine`].
struct SimulatedSession {
    running: bool,
}

impl AccessorySession for SimulatedSession {
    fn run(&mut self, config: &[u8]) -> Result<(), SessionError> {
        if config.is_empty() {
            return Err(SessionError::EmptyConfiguration);
        }
        if config.len() < MIN_CONFIG_LEN {
            return Err(SessionError::TruncatedConfiguration(config.len()));
        }
        self.running = true;
        Ok(())
    }

    fn invalidate(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// A configuration blob the simulated session accepts.
pub fn sample_config_blob() -> Vec<u8> {
    vec![
        0x01, 0x00, 0x9b, 0xa8, 0x0f, 0x4e, 0x21, 0x63, //
        0x5d, 0x9e, 0x42, 0x17, 0x70, 0x86, 0x3c, 0xaa,
    ]
}
