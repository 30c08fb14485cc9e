//! Hardware events consumed by the session manager
//!
//! Platform radio and ranging-engine callbacks are delivered to the
//! manager as plain enums, so every transition is reproducible in tests
//! without hardware. Failure reasons travel as strings; the manager turns
//! them into user-facing messages.

use std::fmt;

use super::types::{AccessoryId, CharacteristicId, DirectionVector, RadioState, ServiceId};

/// Events reported by the radio stack
#[derive(Debug, Clone)]
pub enum RadioEvent {
    /// Power/authorization state of the adapter changed
    PowerStateChanged(RadioState),

    /// An advertisement matching the scan filter was seen
    AccessoryDiscovered {
        id: AccessoryId,
        /// Advertised name, when the advertisement carries one
        name: Option<String>,
        rssi: i16,
    },

    /// A requested connection is established
    ConnectSucceeded { id: AccessoryId },

    /// A requested connection could not be established
    ConnectFailed {
        id: AccessoryId,
        reason: Option<String>,
    },

    /// An established connection ended
    Disconnected {
        id: AccessoryId,
        /// Present when the link dropped abnormally
        reason: Option<String>,
    },

    /// Service discovery finished
    ServicesDiscovered {
        id: AccessoryId,
        services: Vec<ServiceId>,
    },

    /// Service discovery failed
    ServiceDiscoveryFailed { id: AccessoryId, reason: String },

    /// Characteristic discovery finished for a service
    CharacteristicsDiscovered {
        id: AccessoryId,
        service: ServiceId,
        characteristics: Vec<CharacteristicId>,
    },

    /// Characteristic discovery failed
    CharacteristicDiscoveryFailed { id: AccessoryId, reason: String },

    /// A characteristic read completed
    CharacteristicRead {
        id: AccessoryId,
        characteristic: CharacteristicId,
        value: Vec<u8>,
    },

    /// A characteristic read failed
    CharacteristicReadFailed {
        id: AccessoryId,
        characteristic: CharacteristicId,
        reason: Option<String>,
    },
}

/// One tracked object in a measurement update.
///
/// Either field may be absent; absent fields leave the previous
/// measurement value in place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObjectUpdate {
    pub distance: Option<f32>,
    pub direction: Option<DirectionVector>,
}

/// Why the engine stopped tracking the accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// No measurements for too long
    Timeout,
    /// The accessory ended its side of the session
    PeerEnded,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Timeout => write!(f, "timeout"),
            RemovalReason::PeerEnded => write!(f, "peer ended"),
        }
    }
}

/// Events reported by the ranging engine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The engine produced configuration bytes for the accessory; they are
    /// written back over the radio link
    ShareableConfigReady(Vec<u8>),

    /// New measurements for the tracked objects (first one wins)
    ObjectsUpdated(Vec<ObjectUpdate>),

    /// The tracked objects were removed
    ObjectsRemoved(RemovalReason),

    /// The session was suspended by the platform
    Suspended,

    /// A suspension ended; ranging resumes without re-exchange
    SuspensionEnded,

    /// The session became unusable
    Invalidated { reason: String },
}
