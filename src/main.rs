use std::io::{self, BufRead};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wayfinder::integration::{Orchestrator, OrchestratorConfig, OrchestratorHandle};
use wayfinder::ranging::{
    sample_config_blob, AccessoryId, ObjectUpdate, RadioEvent, RadioState, RecordingRadio,
    SessionEvent, SimulatedEngine, CONFIG_CHARACTERISTIC, CONFIG_DATA_CHARACTERISTIC,
    RANGING_SERVICE,
};
use wayfinder::speech::TracingSpeech;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfinder=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wayfinder console");

    let config = OrchestratorConfig::default();
    let (radio, _radio_requests) = RecordingRadio::new();
    let (orchestrator, handle) = Orchestrator::new(
        config,
        Box::new(radio),
        Box::new(SimulatedEngine::new()),
        Box::new(TracingSpeech::default()),
    )?;
    let workers = orchestrator.start();

    // The simulated adapter comes up powered so scanning works right away
    handle.report_radio_event(RadioEvent::PowerStateChanged(RadioState::PoweredOn))?;

    println!("wayfinder console. Commands:");
    println!("  scan | stop | found <name> | connect <n> | handshake | range <meters>");
    println!("  disconnect | status | quit");
    println!("Anything else is submitted as a transcript for intent classification.");

    let stdin = io::stdin();
    let mut connected: Option<AccessoryId> = None;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.splitn(2, ' ');
        let command = parts.next().unwrap_or("");
        let argument = parts.next().map(str::trim);

        match command {
            "quit" | "exit" => break,
            "scan" => handle.start_scanning()?,
            "stop" => handle.stop_scanning()?,
            "found" => {
                handle.report_radio_event(RadioEvent::AccessoryDiscovered {
                    id: AccessoryId::new(),
                    name: argument.map(str::to_string),
                    rssi: -48,
                })?;
            }
            "connect" => {
                let index: usize = argument.and_then(|a| a.parse().ok()).unwrap_or(0);
                match handle.snapshot().discovered.get(index).map(|a| a.id) {
                    Some(id) => {
                        connected = Some(id);
                        handle.connect(id)?;
                    }
                    None => println!("No discovered accessory at index {index}"),
                }
            }
            "handshake" => match connected {
                Some(id) => drive_handshake(&handle, id)?,
                None => println!("Nothing to handshake; connect first"),
            },
            "range" => {
                let distance = argument.and_then(|a| a.parse().ok());
                handle.report_session_event(SessionEvent::ObjectsUpdated(vec![ObjectUpdate {
                    distance,
                    direction: None,
                }]))?;
            }
            "disconnect" => {
                connected = None;
                handle.disconnect()?;
            }
            "status" => print_snapshot(&handle)?,
            _ => handle.submit_transcript(input)?,
        }
    }

    handle.shutdown()?;
    for worker in workers {
        if worker.join().is_err() {
            warn!("A worker thread panicked during shutdown");
        }
    }

    info!("wayfinder console stopped");
    Ok(())
}

/// Replay the radio events a real accessory would produce after connect,
/// ending in a configuration read that starts the simulated session
fn drive_handshake(handle: &OrchestratorHandle, id: AccessoryId) -> Result<()> {
    handle.report_radio_event(RadioEvent::ConnectSucceeded { id })?;
    handle.report_radio_event(RadioEvent::ServicesDiscovered {
        id,
        services: vec![RANGING_SERVICE],
    })?;
    handle.report_radio_event(RadioEvent::CharacteristicsDiscovered {
        id,
        service: RANGING_SERVICE,
        characteristics: vec![CONFIG_CHARACTERISTIC, CONFIG_DATA_CHARACTERISTIC],
    })?;
    handle.report_radio_event(RadioEvent::CharacteristicRead {
        id,
        characteristic: CONFIG_DATA_CHARACTERISTIC,
        value: sample_config_blob(),
    })?;
    Ok(())
}

fn print_snapshot(handle: &OrchestratorHandle) -> Result<()> {
    let snapshot = handle.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
