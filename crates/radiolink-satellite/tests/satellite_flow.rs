//! Integration test for the satellite flow over loopback UDP.
//!
//! A host session runs next to the satellite in the same process.  The
//! satellite waits for the pairing acknowledgment on the blocking pool, then
//! receives the host's greeting through the forwarding channel.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use radiolink_core::radio::udp::{UdpRadio, UdpRadioConfig};
use radiolink_core::{ConnectionStatus, DeviceConfig, PairingSession, Radio, RadioMode, SessionTiming};
use radiolink_satellite::application::await_pairing::wait_for_host;
use radiolink_satellite::application::receive_log::{format_frame, forward_frames};
use radiolink_satellite::infrastructure::storage::config::SatelliteConfig;
use tokio::sync::mpsc;

fn loopback(air: SocketAddr) -> UdpRadioConfig {
    UdpRadioConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        air_addr: air,
        scan_window: Duration::from_millis(200),
        beacon_interval: Duration::from_millis(50),
        local_address: None,
    }
}

#[tokio::test]
async fn test_satellite_pairs_and_logs_greeting() {
    // Arrange: host radio first, its socket is the satellite's air address.
    let mut host_radio = UdpRadio::new(loopback("127.0.0.1:9".parse().unwrap()));
    host_radio.init(&RadioMode::Station).expect("host radio");
    let air = host_radio.bound_addr().expect("host bound");
    let mut host = PairingSession::with_timing(
        DeviceConfig::host(["uMind"], 1),
        host_radio,
        SessionTiming {
            scan_interval: Duration::from_millis(20),
            settle_delay: Duration::ZERO,
        },
    )
    .expect("host config");

    let mut cfg: SatelliteConfig =
        toml::from_str("[satellite]\ndevice_name = \"uMind-05\"\n").expect("satellite toml");
    cfg.radio.beacon_interval_ms = 50;
    let mut radio_cfg = cfg.radio_config();
    radio_cfg.bind_addr = SocketAddr::from(([127, 0, 0, 1], 0));
    radio_cfg.air_addr = air;
    let mut satellite =
        PairingSession::new(cfg.device_config(), UdpRadio::new(radio_cfg)).expect("satellite");
    let (tx, mut rx) = mpsc::unbounded_channel();
    satellite
        .transport()
        .register_receive_callback(forward_frames(tx));

    // Act
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let waiter = tokio::task::spawn_blocking(move || {
        let status = wait_for_host(&mut satellite, Duration::from_millis(10), &flag);
        (satellite, status)
    });

    let host = tokio::task::spawn_blocking(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        while host.poll() == ConnectionStatus::Unconnected && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        host
    })
    .await
    .expect("host task");
    assert!(host.is_paired(), "host must pair with the satellite");

    let (satellite, status) = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("satellite must see the acknowledgment")
        .expect("satellite task");
    host.transport().print_to(0, "Hello World").expect("greeting");

    // Assert
    assert_eq!(status, ConnectionStatus::Connected);
    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("frame in time")
        .expect("channel open");
    assert_eq!(
        format_frame(&frame.from, &frame.data),
        format!("[{}]: Hello World", host.local_address())
    );
    assert_eq!(frame.from, host.local_address());
    drop(satellite);
}
