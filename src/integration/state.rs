//! Unified pipeline state
//!
//! Single source of truth shared between the orchestrator (writer) and
//! its callers (readers): the latest classification, the mirrored ranging
//! status, discoveries and measurement, and the most recent error from
//! either subsystem. Wrapped in [`SharedPipelineState`] for cross-thread
//! access; readers usually take a [`PipelineSnapshot`] instead of holding
//! the lock.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::intent::ClassifiedTranscript;
use crate::ranging::{AccessoryInfo, ConnectionStatus, RangingEvent, RangingMeasurement};

/// Observable state of the whole pipeline
#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    /// Most recent completed classification
    pub classification: Option<ClassifiedTranscript>,
    /// Classifications submitted but not yet finished
    pub classifications_in_flight: usize,
    /// Connection status mirrored from the ranging worker
    pub ranging_status: ConnectionStatus,
    /// Discovered accessories, in discovery order
    pub discovered: Vec<AccessoryInfo>,
    /// Latest distance/direction reading
    pub measurement: RangingMeasurement,
    /// Most recent error message from either subsystem
    pub last_error: Option<String>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an immutable snapshot for lock-free reads
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            classification: self.classification.clone(),
            classifications_in_flight: self.classifications_in_flight,
            ranging_status: self.ranging_status.clone(),
            ranging_status_text: self.ranging_status.to_string(),
            discovered: self.discovered.clone(),
            measurement: self.measurement,
            formatted_distance: self.measurement.formatted_distance(),
            last_error: self.last_error.clone(),
        }
    }

    /// Whether no classification is pending
    pub fn is_idle(&self) -> bool {
        self.classifications_in_flight == 0
    }

    /// Record an error message
    pub fn set_error(&mut self, error: String) {
        self.last_error = Some(error);
    }

    /// Clear the current error
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    // === State transitions ===

    /// A classification request entered the worker
    pub fn begin_classification(&mut self) {
        self.classifications_in_flight += 1;
    }

    /// A classification finished.
    ///
    /// Concurrent requests may finish out of order; the completion
    /// timestamp decides which result is "latest", so a slow early request
    /// never overwrites a fresher answer.
    pub fn finish_classification(&mut self, record: ClassifiedTranscript) {
        self.classifications_in_flight = self.classifications_in_flight.saturating_sub(1);
        let newer = self
            .classification
            .as_ref()
            .map_or(true, |current| record.classified_at >= current.classified_at);
        if newer {
            if let Some(reason) = record.result.error() {
                self.last_error = Some(reason.to_string());
            }
            self.classification = Some(record);
        }
    }

    /// Mirror one ranging worker event into the shared state
    pub fn apply_ranging_event(&mut self, event: &RangingEvent) {
        match event {
            RangingEvent::StatusChanged(status) => {
                // The manager clears its list on scan start; mirror that
                if status.is_scanning() {
                    self.discovered.clear();
                }
                if let Some(message) = status.error_text() {
                    self.last_error = Some(message.to_string());
                }
                self.ranging_status = status.clone();
            }
            RangingEvent::AccessoryDiscovered(accessory) => {
                if !self.discovered.iter().any(|a| a.id == accessory.id) {
                    self.discovered.push(accessory.clone());
                }
            }
            RangingEvent::MeasurementChanged(measurement) => {
                self.measurement = *measurement;
            }
            RangingEvent::ErrorMessage(message) => {
                self.last_error = Some(message.clone());
            }
            RangingEvent::Shutdown => {}
        }
    }
}

/// Immutable snapshot of [`PipelineState`], plus display renditions
#[derive(Clone, Debug, Serialize)]
pub struct PipelineSnapshot {
    pub classification: Option<ClassifiedTranscript>,
    pub classifications_in_flight: usize,
    pub ranging_status: ConnectionStatus,
    /// Display text for the status, e.g. `"Ranging Active"`
    pub ranging_status_text: String,
    pub discovered: Vec<AccessoryInfo>,
    pub measurement: RangingMeasurement,
    /// Display text for the distance, e.g. `"2.50 m"`
    pub formatted_distance: Option<String>,
    pub last_error: Option<String>,
}

/// Thread-safe shared pipeline state
#[derive(Clone)]
pub struct SharedPipelineState {
    inner: Arc<RwLock<PipelineState>>,
}

impl Default for SharedPipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedPipelineState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(PipelineState::new())),
        }
    }

    /// Get a read lock on the state
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, PipelineState> {
        self.inner.read()
    }

    /// Get a write lock on the state
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, PipelineState> {
        self.inner.write()
    }

    /// Get a snapshot of the current state (no lock held after return)
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.inner.read().snapshot()
    }
}
