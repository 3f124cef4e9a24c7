//! Integration tests for UDP acquisition
//!
//! These tests bind fixed localhost ports, so they run one at a time.

mod common;

use common::builders::ConfigBuilder;
use common::{assert_float_eq, wait_until};
use scope_rs::acquisition::Acquisition;
use scope_rs::frontend::ScopeView;
use serial_test::serial;
use std::net::UdpSocket;

const PORT: u16 = 39_517;

fn send(records: &[&str]) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    for record in records {
        socket
            .send_to(record.as_bytes(), ("127.0.0.1", PORT))
            .unwrap();
    }
}

#[test]
#[serial]
fn test_datagrams_become_samples() {
    let config = ConfigBuilder::udp(PORT).channels(2).depth(3).build();
    let acquisition = Acquisition::start(&config).unwrap();

    send(&["1;2", "3;4", "5;6"]);

    let buffer = acquisition.buffer();
    assert!(wait_until(|| buffer.generation() == 3));
    assert_eq!(acquisition.snapshot(0).unwrap(), vec![1.0, 3.0, 5.0]);
    assert_eq!(acquisition.snapshot(1).unwrap(), vec![2.0, 4.0, 6.0]);

    acquisition.shutdown().unwrap();
}

#[test]
#[serial]
fn test_bad_datagrams_leave_buffer_unchanged() {
    let config = ConfigBuilder::udp(PORT).channels(2).depth(2).build();
    let acquisition = Acquisition::start(&config).unwrap();
    let buffer = acquisition.buffer();

    send(&["1;2;3", "x;y", "9;10"]);
    assert!(wait_until(|| buffer.generation() == 1));
    assert_eq!(buffer.latest(), vec![9.0, 10.0]);

    let stats = acquisition.shutdown().unwrap();
    assert_eq!(stats.samples_appended, 1);
    assert_eq!(stats.dropped_records(), stats.records_received - 1);
}

#[test]
#[serial]
fn test_view_follows_udp_stream() {
    let config = ConfigBuilder::udp(PORT).channels(1).depth(4).build();
    let acquisition = Acquisition::start(&config).unwrap();
    let mut view = ScopeView::from_config(acquisition.buffer(), &config);

    send(&["-4.5"]);
    assert!(wait_until(|| {
        view.refresh().unwrap();
        view.frame().generation == 1
    }));
    let summary = &view.summaries()[0];
    assert_eq!(summary.label, "ch0 (V)");
    assert_float_eq(summary.last, -4.5, 1e-9);
    assert_float_eq(summary.min, -4.5, 1e-9);

    acquisition.shutdown().unwrap();
}

#[test]
#[serial]
fn test_port_in_use_fails_at_start() {
    let _holder = UdpSocket::bind(("127.0.0.1", PORT)).unwrap();
    let config = ConfigBuilder::udp(PORT).build();
    assert!(Acquisition::start(&config).is_err());
}
