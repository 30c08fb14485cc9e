//! Accessory ranging session manager
//!
//! A state machine over [`ConnectionStatus`] that reconciles radio and
//! ranging-engine events into one coherent status plus the latest
//! distance/direction measurement. All hardware effects go through the
//! injected [`RadioLink`] and [`RangingEngine`] capabilities, so every
//! transition can be driven synchronously in tests.
//!
//! The ranging handshake with an accessory:
//! 1. scan for the ranging service, collect advertisements
//! 2. connect to a chosen accessory, discover the ranging service
//! 3. discover the two configuration characteristics
//! 4. read the accessory configuration blob, start a ranging session on it
//! 5. relay the session's shareable configuration bytes back over the link
//! 6. consume measurement updates until removal, suspension or disconnect

use tracing::{debug, info, warn};

use super::events::{RadioEvent, SessionEvent};
use super::radio::RadioLink;
use super::session::{AccessorySession, RangingEngine};
use super::types::{
    AccessoryId, AccessoryInfo, CharacteristicId, ConnectionStatus, RadioState,
    RangingMeasurement, ServiceId, CONFIG_CHARACTERISTIC, CONFIG_DATA_CHARACTERISTIC,
    RANGING_SERVICE, UNKNOWN_ACCESSORY_NAME,
};

/// Message recorded when the engine reports no ranging capability
pub const RANGING_UNSUPPORTED: &str = "Nearby ranging is not supported on this device";

pub struct AccessoryRangingManager {
    radio: Box<dyn RadioLink>,
    engine: Box<dyn RangingEngine>,
    /// None when the engine is unsupported; otherwise a session that is
    /// fresh or running, never invalidated
    session: Option<Box<dyn AccessorySession>>,
    radio_state: RadioState,
    status: ConnectionStatus,
    error_message: Option<String>,
    discovered: Vec<AccessoryInfo>,
    connected_accessory: Option<AccessoryInfo>,
    connected_peripheral: Option<AccessoryId>,
    config_characteristic: Option<CharacteristicId>,
    config_data_characteristic: Option<CharacteristicId>,
    measurement: RangingMeasurement,
    is_scanning: bool,
}

impl AccessoryRangingManager {
    pub fn new(radio: Box<dyn RadioLink>, mut engine: Box<dyn RangingEngine>) -> Self {
        let (session, error_message) = if engine.is_supported() {
            (Some(engine.create_session()), None)
        } else {
            warn!("Ranging engine reports no support on this device");
            (None, Some(RANGING_UNSUPPORTED.to_string()))
        };

        Self {
            radio,
            engine,
            session,
            radio_state: RadioState::default(),
            status: ConnectionStatus::default(),
            error_message,
            discovered: Vec::new(),
            connected_accessory: None,
            connected_peripheral: None,
            config_characteristic: None,
            config_data_characteristic: None,
            measurement: RangingMeasurement::default(),
            is_scanning: false,
        }
    }

    // ===== Commands =====

    /// Start scanning for accessories advertising the ranging service.
    ///
    /// Requires the radio to be powered on; otherwise only `error_message`
    /// is set and the status stays where it was.
    pub fn start_scanning(&mut self) {
        if !self.radio_state.is_powered_on() {
            warn!("Scan refused, radio state is {}", self.radio_state);
            self.error_message = Some("Bluetooth is not available".to_string());
            return;
        }

        self.discovered.clear();
        self.is_scanning = true;
        self.status = ConnectionStatus::Scanning;
        self.radio.start_scan(RANGING_SERVICE);
        info!("Scanning for ranging accessories");
    }

    /// Stop scanning. Only moves the status back to disconnected when it
    /// was `scanning`; stopping from any other state leaves it alone.
    pub fn stop_scanning(&mut self) {
        self.radio.stop_scan();
        self.is_scanning = false;
        if self.status.is_scanning() {
            self.status = ConnectionStatus::Disconnected;
        }
    }

    /// Connect to a previously discovered accessory.
    ///
    /// Ids that never appeared in a discovery event are refused, so a
    /// connection always starts from a concrete advertisement.
    pub fn connect(&mut self, id: AccessoryId) {
        let Some(accessory) = self.discovered.iter().find(|a| a.id == id).cloned() else {
            warn!("Connect refused, accessory {} was never discovered", id);
            self.error_message = Some(format!("Unknown accessory: {id}"));
            return;
        };

        self.stop_scanning();
        self.status = ConnectionStatus::Connecting;
        info!("Connecting to accessory '{}' ({})", accessory.name, id);
        self.connected_accessory = Some(accessory);
        self.radio.connect(id);
    }

    /// Drop the current connection and ranging session.
    ///
    /// The invalidated session is replaced with a fresh one so a later
    /// connect can enter `ranging` again.
    pub fn disconnect(&mut self) {
        if let Some(id) = self.connected_peripheral {
            self.radio.cancel_connection(id);
        }
        if let Some(session) = self.session.as_mut() {
            session.invalidate();
        }
        self.fresh_session();
        self.reset_connection();
        info!("Disconnected from accessory");
    }

    // ===== Radio events =====

    pub fn handle_radio_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::PowerStateChanged(state) => self.on_power_state(state),
            RadioEvent::AccessoryDiscovered { id, name, rssi } => {
                self.on_accessory_discovered(id, name, rssi)
            }
            RadioEvent::ConnectSucceeded { id } => self.on_connect_succeeded(id),
            RadioEvent::ConnectFailed { id, reason } => self.on_connect_failed(id, reason),
            RadioEvent::Disconnected { id, reason } => self.on_disconnected(id, reason),
            RadioEvent::ServicesDiscovered { id, services } => {
                self.on_services_discovered(id, &services)
            }
            RadioEvent::ServiceDiscoveryFailed { reason, .. } => {
                self.error_message = Some(format!("Service discovery failed: {reason}"));
            }
            RadioEvent::CharacteristicsDiscovered {
                id,
                characteristics,
                ..
            } => self.on_characteristics_discovered(id, &characteristics),
            RadioEvent::CharacteristicDiscoveryFailed { reason, .. } => {
                self.error_message = Some(format!("Characteristic discovery failed: {reason}"));
            }
            RadioEvent::CharacteristicRead {
                characteristic,
                value,
                ..
            } => {
                if characteristic == CONFIG_DATA_CHARACTERISTIC {
                    self.apply_accessory_configuration(&value);
                }
            }
            RadioEvent::CharacteristicReadFailed { reason, .. } => {
                self.error_message = Some(format!(
                    "Failed to read characteristic: {}",
                    reason.as_deref().unwrap_or("Unknown")
                ));
            }
        }
    }

    /// Power changes are a side channel: they update `error_message` for
    /// off/unauthorized/unsupported but never move the connection status.
    fn on_power_state(&mut self, state: RadioState) {
        self.radio_state = state;
        match state {
            RadioState::PoweredOn => info!("Radio powered on and ready"),
            RadioState::PoweredOff => {
                self.error_message = Some("Please turn on Bluetooth".to_string());
            }
            RadioState::Unauthorized => {
                self.error_message = Some("Bluetooth permission denied".to_string());
            }
            RadioState::Unsupported => {
                self.error_message = Some("Bluetooth is not supported on this device".to_string());
            }
            _ => {}
        }
    }

    fn on_accessory_discovered(&mut self, id: AccessoryId, name: Option<String>, rssi: i16) {
        if !self.is_scanning {
            debug!("Discovery event for {} ignored, not scanning", id);
            return;
        }

        let name = name.unwrap_or_else(|| UNKNOWN_ACCESSORY_NAME.to_string());
        if let Some(existing) = self.discovered.iter_mut().find(|a| a.id == id) {
            existing.name = name;
            existing.rssi = rssi;
        } else {
            info!("Discovered accessory '{}' ({}) at {} dBm", name, id, rssi);
            self.discovered.push(AccessoryInfo { id, name, rssi });
        }
    }

    fn on_connect_succeeded(&mut self, id: AccessoryId) {
        info!("Connected to accessory {}", id);
        self.connected_peripheral = Some(id);
        self.status = ConnectionStatus::ExchangingConfig;
        self.radio.discover_services(id, &[RANGING_SERVICE]);
    }

    /// Connect failure clears every connection field but leaves the status
    /// at `error` so the failure stays visible, unlike the other resets.
    fn on_connect_failed(&mut self, id: AccessoryId, reason: Option<String>) {
        let message = format!(
            "Failed to connect: {}",
            reason.as_deref().unwrap_or("Unknown error")
        );
        warn!("Connection to {} failed: {}", id, message);
        self.error_message = Some(message.clone());
        self.clear_connection_fields();
        self.status = ConnectionStatus::Error(message);
    }

    fn on_disconnected(&mut self, id: AccessoryId, reason: Option<String>) {
        if let Some(reason) = reason {
            self.error_message = Some(format!("Disconnected with error: {reason}"));
        }
        info!("Accessory {} disconnected", id);
        self.reset_connection();
    }

    fn on_services_discovered(&mut self, id: AccessoryId, services: &[ServiceId]) {
        if services.contains(&RANGING_SERVICE) {
            self.radio.discover_characteristics(
                id,
                RANGING_SERVICE,
                &[CONFIG_CHARACTERISTIC, CONFIG_DATA_CHARACTERISTIC],
            );
        } else {
            debug!("Ranging service not present on {}", id);
        }
    }

    fn on_characteristics_discovered(
        &mut self,
        id: AccessoryId,
        characteristics: &[CharacteristicId],
    ) {
        for &characteristic in characteristics {
            if characteristic == CONFIG_CHARACTERISTIC {
                self.config_characteristic = Some(characteristic);
            } else if characteristic == CONFIG_DATA_CHARACTERISTIC {
                self.config_data_characteristic = Some(characteristic);
                self.radio.read_characteristic(id, characteristic);
            }
        }
    }

    /// Interpret the read bytes as an accessory configuration blob and
    /// start the ranging session on it.
    fn apply_accessory_configuration(&mut self, config: &[u8]) {
        let Some(session) = self.session.as_mut() else {
            warn!("Configuration received but ranging is unsupported");
            self.status = ConnectionStatus::Error(RANGING_UNSUPPORTED.to_string());
            return;
        };

        match session.run(config) {
            Ok(()) => {
                info!("Ranging session started ({} byte configuration)", config.len());
                self.status = ConnectionStatus::Ranging;
            }
            Err(e) => {
                let message = format!("Failed to apply accessory configuration: {e}");
                warn!("{}", message);
                self.error_message = Some(message.clone());
                self.status = ConnectionStatus::Error(message);
            }
        }
    }

    // ===== Session events =====

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ShareableConfigReady(data) => self.on_shareable_config(&data),
            SessionEvent::ObjectsUpdated(updates) => {
                // Single-accessory sessions: only the first object counts
                let Some(first) = updates.first() else {
                    return;
                };
                if let Some(distance) = first.distance {
                    self.measurement.distance = Some(distance);
                }
                if let Some(direction) = first.direction {
                    self.measurement.direction = Some(direction);
                }
            }
            SessionEvent::ObjectsRemoved(reason) => {
                debug!("Tracked object removed ({})", reason);
                self.measurement.clear();
            }
            SessionEvent::Suspended => {
                warn!("Ranging session suspended");
                self.status = ConnectionStatus::Error("Session suspended".to_string());
            }
            SessionEvent::SuspensionEnded => {
                info!("Ranging session resumed");
                self.status = ConnectionStatus::Ranging;
            }
            SessionEvent::Invalidated { reason } => {
                let message = format!("Session invalidated: {reason}");
                warn!("{}", message);
                self.error_message = Some(message.clone());
                self.status = ConnectionStatus::Error(message);
                self.fresh_session();
            }
        }
    }

    fn on_shareable_config(&mut self, data: &[u8]) {
        let (Some(id), Some(characteristic)) =
            (self.connected_peripheral, self.config_characteristic)
        else {
            warn!("Shareable configuration dropped, no peripheral or characteristic");
            return;
        };
        debug!("Relaying {} bytes of shareable configuration", data.len());
        self.radio.write_characteristic(id, characteristic, data);
    }

    // ===== Internal state management =====

    fn clear_connection_fields(&mut self) {
        self.connected_peripheral = None;
        self.connected_accessory = None;
        self.config_characteristic = None;
        self.config_data_characteristic = None;
        self.measurement.clear();
    }

    fn reset_connection(&mut self) {
        self.clear_connection_fields();
        self.status = ConnectionStatus::Disconnected;
    }

    /// Replace an invalidated session so ranging can start again later.
    fn fresh_session(&mut self) {
        if self.engine.is_supported() {
            self.session = Some(self.engine.create_session());
        }
    }

    // ===== Accessors =====

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn radio_state(&self) -> RadioState {
        self.radio_state
    }

    pub fn discovered(&self) -> &[AccessoryInfo] {
        &self.discovered
    }

    pub fn connected_accessory(&self) -> Option<&AccessoryInfo> {
        self.connected_accessory.as_ref()
    }

    pub fn measurement(&self) -> RangingMeasurement {
        self.measurement
    }

    pub fn is_scanning(&self) -> bool {
        self.is_scanning
    }

    /// Whether the underlying ranging session is live
    pub fn session_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_running())
    }
}
