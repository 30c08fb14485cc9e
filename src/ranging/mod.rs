//! Accessory ranging subsystem
//!
//! Discovery, connection, and configuration exchange with a nearby UWB
//! ranging accessory over a short-range radio link. The
//! [`AccessoryRangingManager`] is a synchronous state machine driven by
//! [`RadioEvent`]/[`SessionEvent`] enums; hardware effects go through the
//! [`RadioLink`] and [`RangingEngine`] capability traits, and the
//! [`RangingProcessor`] worker serializes everything onto one thread.

pub mod events;
pub mod manager;
pub mod radio;
pub mod session;
pub mod simulated;
pub mod types;
pub mod worker;

pub use events::{ObjectUpdate, RadioEvent, RemovalReason, SessionEvent};
pub use manager::{AccessoryRangingManager, RANGING_UNSUPPORTED};
pub use radio::{RadioLink, RadioRequest};
pub use session::{AccessorySession, RangingEngine, SessionError};
pub use simulated::{sample_config_blob, RadioRequestLog, RecordingRadio, SimulatedEngine};
pub use types::{
    AccessoryId, AccessoryInfo, CharacteristicId, ConnectionStatus, DirectionVector, Proximity,
    RadioState, RangingMeasurement, ServiceId, CONFIG_CHARACTERISTIC, CONFIG_DATA_CHARACTERISTIC,
    RANGING_SERVICE, UNKNOWN_ACCESSORY_NAME,
};
pub use worker::{RangingCommand, RangingEvent, RangingProcessor, RangingWorker};
