//! Watch a few hosts from the command line.
//!
//! ```text
//! cargo run -p wol-sdk-monitor --example live_monitor -- 192.168.1.20 192.168.1.30=AA:BB:CC:DD:EE:FF
//! ```
//!
//! Each argument is `address[=hardware-address]`. Set `WOL_LOG_MODE=development`
//! to see probe and polling logs alongside the events.

use std::collections::HashMap;

use wol_monitor::{Coordinator, Host, HostId, MonitorConfig, MonitorEvent, Sensor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    wol_monitor::logging::init_logging_from_env()?;

    let hosts: Vec<Host> = std::env::args()
        .skip(1)
        .map(|arg| {
            let (address, mac) = match arg.split_once('=') {
                Some((address, mac)) => (address.to_string(), Some(mac.to_string())),
                None => (arg.clone(), None),
            };
            let mut host = Host::new(address.clone())
                .with_address(address)
                .with_sensor(Sensor::cpu_temperature("CPU"));
            host.hardware_address = mac;
            host
        })
        .collect();

    if hosts.is_empty() {
        println!("Usage: live_monitor <address[=hardware-address]>...");
        return Ok(());
    }

    let names: HashMap<HostId, String> = hosts
        .iter()
        .map(|h| (h.id, h.name.clone().unwrap_or_default()))
        .collect();

    println!("Monitoring {} hosts (Ctrl-C to stop)", hosts.len());
    let monitor = Coordinator::new(MonitorConfig::default(), hosts).spawn()?;
    let mut events = monitor.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(MonitorEvent::StatusChanged { host_id, status }) => {
                    let name = names.get(&host_id).map(String::as_str).unwrap_or("?");
                    println!("{name:<20} {:<20} ({})", status.label(), status.color_name());
                }
                Ok(MonitorEvent::SensorValue { host_id, value, .. }) => {
                    let name = names.get(&host_id).map(String::as_str).unwrap_or("?");
                    println!("{name:<20} CPU {value:.1} ºC");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    println!("(skipped {missed} events)");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    println!("\nFinal state:");
    for host in monitor.snapshot().await? {
        let reading = host
            .sensors
            .iter()
            .find_map(|s| s.display_value())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:<20} {}",
            host.name.as_deref().unwrap_or("?"),
            host.status_text(),
            reading
        );
    }

    monitor.shutdown().await?;
    Ok(())
}
