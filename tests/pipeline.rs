//! Integration tests for nodeline.
//!
//! These exercise the full pipeline over a loopback UDP socket: datagram
//! bytes through framing, decoding, the background pump, normalization and
//! grouping.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::json;

use nodeline::group::group_by_sender;
use nodeline::pump::PumpConfig;
use nodeline::{BackgroundPump, FrameReader, Message, Normalizer, PollStatus, UdpTransport};

const POLL: Duration = Duration::from_secs(2);

fn fast_config() -> PumpConfig {
    PumpConfig {
        poll_timeout: Duration::from_millis(50),
        wait_interval: Duration::from_millis(10),
        shutdown_grace: Duration::from_millis(500),
    }
}

async fn bound_reader() -> (FrameReader<UdpTransport>, SocketAddr, std::net::UdpSocket) {
    let transport = UdpTransport::bind("127.0.0.1", 0).await.unwrap();
    let addr = transport.local_addr().unwrap();
    let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let reader = FrameReader::new(transport).with_backoff(Duration::from_millis(5));
    (reader, addr, sender)
}

fn sender_ids(messages: &[Message]) -> Vec<i64> {
    messages
        .iter()
        .map(|m| m.get("sender_node_id").and_then(|v| v.as_i64()).unwrap())
        .collect()
}

/// Frames split across datagrams at arbitrary points reassemble losslessly.
#[tokio::test]
async fn udp_framing_reassembles_split_datagrams() {
    let (mut reader, addr, sender) = bound_reader().await;

    // One frame split mid-JSON across two datagrams, then two complete
    // frames sharing a third datagram.
    sender.send_to(b"{\"sender_node_id\": 1, \"s", addr).unwrap();
    sender.send_to(b"pl\": 61.2}\n", addr).unwrap();
    sender
        .send_to(b"{\"sender_node_id\": 2}\n{\"sender_node_id\": 3}\n", addr)
        .unwrap();

    let mut messages = Vec::new();
    while messages.len() < 3 {
        let status = reader.poll(POLL).await.unwrap();
        assert_ne!(status, PollStatus::Closed);
        messages.extend(reader.drain_messages());
        if status == PollStatus::TimedOut {
            break;
        }
    }

    assert_eq!(sender_ids(&messages), vec![1, 2, 3]);
}

/// Malformed lines are dropped without disturbing surrounding frames.
#[tokio::test]
async fn udp_decode_failures_are_not_fatal() {
    let (mut reader, addr, sender) = bound_reader().await;

    sender
        .send_to(b"{\"sender_node_id\": 1}\ngarbage{{\n{\"sender_node_id\": 2}\n", addr)
        .unwrap();

    let mut messages = Vec::new();
    for _ in 0..20 {
        reader.poll(POLL).await.unwrap();
        messages.extend(reader.drain_messages());
        if messages.len() >= 2 {
            break;
        }
    }

    assert_eq!(sender_ids(&messages), vec![1, 2]);
}

/// Repeated drains of a pumped stream concatenate to the producer order.
#[tokio::test]
async fn pump_preserves_arrival_order_across_drains() {
    let (reader, addr, sender) = bound_reader().await;
    let mut pump = BackgroundPump::with_config(reader, fast_config());
    pump.open();

    for i in 0..20 {
        sender
            .send_to(format!("{{\"sender_node_id\": {}}}\n", i).as_bytes(), addr)
            .unwrap();
    }

    let mut all = Vec::new();
    for _ in 0..200 {
        all.extend(pump.drain());
        if all.len() >= 20 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(sender_ids(&all), (0..20).collect::<Vec<i64>>());
    pump.close().await.unwrap();
}

/// `wait` gathers a minimum batch, and `get` pops in FIFO order.
#[tokio::test]
async fn pump_wait_and_get() {
    let (reader, addr, sender) = bound_reader().await;
    let mut pump = BackgroundPump::with_config(reader, fast_config());
    pump.open();

    sender.send_to(b"{\"sender_node_id\": 5}\n", addr).unwrap();
    sender.send_to(b"{\"sender_node_id\": 9}\n", addr).unwrap();

    pump.wait(Some(POLL), 2).await.unwrap();

    let first = pump.get(false).await.unwrap().unwrap();
    let second = pump.get(false).await.unwrap().unwrap();
    assert_eq!(sender_ids(&[first, second]), vec![5, 9]);

    pump.close().await.unwrap();
}

/// Closing an open pump always returns with the producer stopped, even while
/// the producer is blocked mid-poll on an idle socket.
#[tokio::test]
async fn pump_close_is_bounded_while_blocked() {
    let (reader, _addr, _sender) = bound_reader().await;
    let mut pump = BackgroundPump::with_config(reader, fast_config());
    pump.open();

    let started = std::time::Instant::now();
    pump.close().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!pump.is_open());
}

/// The full shape transformation from the wire to a canonical record.
#[tokio::test]
async fn end_to_end_normalized_record_shape() {
    let (mut reader, addr, sender) = bound_reader().await;

    sender
        .send_to(
            b"{\"sender_node_id\": 7, \"spl\": 61.2, \"sender_battery\": [1,2,3,4]}\n",
            addr,
        )
        .unwrap();

    let mut messages = Vec::new();
    for _ in 0..20 {
        reader.poll(POLL).await.unwrap();
        messages.extend(reader.drain_messages());
        if !messages.is_empty() {
            break;
        }
    }

    let records = Normalizer::standard().normalize_batch(messages);
    assert_eq!(records.len(), 1);
    let record = &records[0];

    assert_eq!(record.get("laeq"), Some(&json!(61.2)));
    assert_eq!(record.get("battery_total"), Some(&json!(1)));
    assert_eq!(record.get("battery_cell0"), Some(&json!(2)));
    assert_eq!(record.get("battery_cell1"), Some(&json!(3)));
    assert_eq!(record.get("battery_cell2"), Some(&json!(4)));
    assert!(record.get("spl").is_none());
    assert!(record.get("sender_battery").is_none());
    assert_eq!(record.get("sender_node_id"), Some(&json!(7)));
}

/// Two senders partition into two groups keyed by their own ids.
#[tokio::test]
async fn end_to_end_grouping_by_sender() {
    let (reader, addr, sender) = bound_reader().await;
    let mut pump = BackgroundPump::with_config(reader, fast_config());
    pump.open();

    sender.send_to(b"{\"sender_node_id\": 5}\n", addr).unwrap();
    sender.send_to(b"{\"sender_node_id\": 9}\n", addr).unwrap();

    pump.wait(Some(POLL), 2).await.unwrap();
    let groups = group_by_sender(pump.drain());

    assert_eq!(groups.len(), 2);
    assert_eq!(groups.get(&json!(5)).unwrap().len(), 1);
    assert_eq!(groups.get(&json!(9)).unwrap().len(), 1);

    pump.close().await.unwrap();
}
