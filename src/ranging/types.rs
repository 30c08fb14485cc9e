//! Core types for the ranging subsystem

use std::fmt;

use serde::Serialize;
use uuid::{uuid, Uuid};

/// GATT service identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceId(pub Uuid);

/// GATT characteristic identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CharacteristicId(pub Uuid);

/// Identifies a discovered accessory.
///
/// This doubles as the non-owning peripheral handle: the radio stack owns
/// the peripheral, and all requests reference it by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AccessoryId(pub Uuid);

impl AccessoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccessoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccessoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CharacteristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ranging service advertised by compatible accessories
pub const RANGING_SERVICE: ServiceId = ServiceId(uuid!("48FE3E40-0817-4BB2-8633-3073689C2DBA"));

/// Characteristic the shareable configuration is written to
pub const CONFIG_CHARACTERISTIC: CharacteristicId =
    CharacteristicId(uuid!("48FE3E42-0817-4BB2-8633-3073689C2DBA"));

/// Characteristic the accessory configuration blob is read from
pub const CONFIG_DATA_CHARACTERISTIC: CharacteristicId =
    CharacteristicId(uuid!("48FE3E43-0817-4BB2-8633-3073689C2DBA"));

/// Name used when an advertisement carries none
pub const UNKNOWN_ACCESSORY_NAME: &str = "Unknown UWB Device";

/// Power/authorization state of the radio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl RadioState {
    pub fn is_powered_on(&self) -> bool {
        matches!(self, RadioState::PoweredOn)
    }
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RadioState::Unknown => "unknown",
            RadioState::Resetting => "resetting",
            RadioState::Unsupported => "unsupported",
            RadioState::Unauthorized => "unauthorized",
            RadioState::PoweredOff => "powered off",
            RadioState::PoweredOn => "powered on",
        };
        write!(f, "{text}")
    }
}

/// A discovered ranging accessory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessoryInfo {
    pub id: AccessoryId,
    pub name: String,
    /// Received signal strength in dBm
    pub rssi: i16,
}

/// 3D direction vector toward the accessory
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionVector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl DirectionVector {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for DirectionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Proximity bucket derived from the measured distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    /// Under one meter
    Near,
    /// Under three meters
    Mid,
    /// Three meters or more
    Far,
}

/// Distance used as full scale for progress displays
const MAX_DISPLAY_DISTANCE: f32 = 10.0;

/// Latest distance/direction toward the connected accessory.
///
/// Either field may be present alone; a partial update leaves the other
/// field's previous value in place. Both are cleared when the tracked
/// object is removed or the connection resets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RangingMeasurement {
    /// Distance in meters
    pub distance: Option<f32>,
    pub direction: Option<DirectionVector>,
}

impl RangingMeasurement {
    pub fn is_empty(&self) -> bool {
        self.distance.is_none() && self.direction.is_none()
    }

    pub fn clear(&mut self) {
        self.distance = None;
        self.direction = None;
    }

    /// Distance formatted for display, e.g. `"3.25 m"`
    pub fn formatted_distance(&self) -> Option<String> {
        self.distance.map(|d| format!("{d:.2} m"))
    }

    pub fn proximity(&self) -> Option<Proximity> {
        self.distance.map(|d| {
            if d < 1.0 {
                Proximity::Near
            } else if d < 3.0 {
                Proximity::Mid
            } else {
                Proximity::Far
            }
        })
    }

    /// Closeness fraction for progress displays: 1.0 at zero distance,
    /// 0.0 at ten meters or more
    pub fn closeness(&self) -> Option<f32> {
        self.distance
            .map(|d| 1.0 - d.min(MAX_DISPLAY_DISTANCE) / MAX_DISPLAY_DISTANCE)
    }
}

/// Connection/session state of the ranging subsystem.
///
/// `Error` compares by message, so re-entering the same failure is a
/// no-change transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Scanning,
    Connecting,
    ExchangingConfig,
    Ranging,
    Error(String),
}

impl ConnectionStatus {
    pub fn is_disconnected(&self) -> bool {
        matches!(self, ConnectionStatus::Disconnected)
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, ConnectionStatus::Scanning)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting)
    }

    pub fn is_exchanging_config(&self) -> bool {
        matches!(self, ConnectionStatus::ExchangingConfig)
    }

    pub fn is_ranging(&self) -> bool {
        matches!(self, ConnectionStatus::Ranging)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionStatus::Error(_))
    }

    /// The error message, when in the error state
    pub fn error_text(&self) -> Option<&str> {
        match self {
            ConnectionStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        ConnectionStatus::Disconnected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Scanning => write!(f, "Scanning for UWB devices..."),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::ExchangingConfig => write!(f, "Exchanging configuration..."),
            ConnectionStatus::Ranging => write!(f, "Ranging Active"),
            ConnectionStatus::Error(message) => write!(f, "Error: {message}"),
        }
    }
}
