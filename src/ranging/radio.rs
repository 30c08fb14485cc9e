//! Radio link capability
//!
//! Requests are fire-and-forget: the radio stack answers asynchronously
//! with [`RadioEvent`](super::events::RadioEvent)s delivered to the session
//! manager. Implementations adapt a platform stack; tests use
//! [`RecordingRadio`](super::simulated::RecordingRadio).

use super::types::{AccessoryId, CharacteristicId, ServiceId};

/// Requests the session manager issues to the radio stack
pub trait RadioLink: Send {
    /// Start scanning for accessories advertising the given service
    fn start_scan(&mut self, service: ServiceId);

    /// Stop an active scan
    fn stop_scan(&mut self);

    /// Connect to a previously discovered accessory
    fn connect(&mut self, id: AccessoryId);

    /// Cancel an established or pending connection
    fn cancel_connection(&mut self, id: AccessoryId);

    /// Discover the given services on a connected accessory
    fn discover_services(&mut self, id: AccessoryId, services: &[ServiceId]);

    /// Discover the given characteristics of a service
    fn discover_characteristics(
        &mut self,
        id: AccessoryId,
        service: ServiceId,
        characteristics: &[CharacteristicId],
    );

    /// Read a characteristic value
    fn read_characteristic(&mut self, id: AccessoryId, characteristic: CharacteristicId);

    /// Write a characteristic value (with response)
    fn write_characteristic(
        &mut self,
        id: AccessoryId,
        characteristic: CharacteristicId,
        value: &[u8],
    );
}

/// Owned mirror of one [`RadioLink`] call, for request logs and assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioRequest {
    StartScan {
        service: ServiceId,
    },
    StopScan,
    Connect {
        id: AccessoryId,
    },
    CancelConnection {
        id: AccessoryId,
    },
    DiscoverServices {
        id: AccessoryId,
        services: Vec<ServiceId>,
    },
    DiscoverCharacteristics {
        id: AccessoryId,
        service: ServiceId,
        characteristics: Vec<CharacteristicId>,
    },
    ReadCharacteristic {
        id: AccessoryId,
        characteristic: CharacteristicId,
    },
    WriteCharacteristic {
        id: AccessoryId,
        characteristic: CharacteristicId,
        value: Vec<u8>,
    },
}
