//! Drives the agent's bootstrap, sampler and control loop against a fake hub.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use fleettop_agent::wire::{IntervalData, Message};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

struct FakeHub {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl FakeHub {
    async fn recv(&mut self) -> Message {
        let line = timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for agent message")
            .expect("read")
            .expect("agent closed the connection");
        Message::decode(&line).expect("decode")
    }

    async fn recv_kind(&mut self, kind: &str) -> Message {
        loop {
            let msg = self.recv().await;
            if msg.kind == kind {
                return msg;
            }
        }
    }

    async fn send_line(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.expect("write");
    }
}

async fn start_agent(id: &str) -> FakeHub {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let stream = TcpStream::connect(addr).await.expect("connect");
    let _handle = fleettop_agent::start(stream, id).await.expect("start agent");

    let (socket, _) = listener.accept().await.expect("accept");
    let (read_half, write_half) = socket.into_split();
    FakeHub {
        lines: BufReader::new(read_half).lines(),
        writer: write_half,
    }
}

#[tokio::test]
async fn bootstrap_sequence_is_handshake_general_interval() {
    let mut hub = start_agent("test-agent").await;

    let hs = hub.recv().await;
    assert_eq!(hs.kind, "handshake");
    assert_eq!(hs.data["client_id"], "test-agent");
    assert_eq!(hs.data["role"], "client");

    let general = hub.recv().await;
    assert_eq!(general.kind, "general_data");
    assert!(general.data["cores"].as_i64().unwrap() > 0);

    let interval = hub.recv().await;
    assert_eq!(interval.kind, "interval_update");
    let interval: IntervalData = interval.parse_data().unwrap();
    assert_eq!(interval.interval_ms, 5000);
}

#[tokio::test]
async fn first_tick_reports_all_metric_families() {
    let mut hub = start_agent("test-agent").await;

    let mut seen_cpu = false;
    let mut seen_memory = false;
    let mut seen_disk = false;
    let mut seen_processes = false;
    while !(seen_cpu && seen_memory && seen_disk && seen_processes) {
        match hub.recv().await.kind.as_str() {
            "cpu_usage" => seen_cpu = true,
            "memory_usage" => seen_memory = true,
            "disk_usage" => seen_disk = true,
            "process_usage" => seen_processes = true,
            _ => {}
        }
    }
}

#[tokio::test]
async fn set_interval_is_acknowledged_and_applied() {
    let mut hub = start_agent("test-agent").await;

    // skip bootstrap up to the advertised cadence
    hub.recv_kind("interval_update").await;

    hub.send_line("{\"type\":\"set_interval\",\"data\":{\"interval_ms\":200}}\n")
        .await;

    let ack = hub.recv_kind("interval_update").await;
    let ack: IntervalData = ack.parse_data().unwrap();
    assert_eq!(ack.interval_ms, 200);

    // at 200ms cadence a couple of cpu reports arrive well inside the timeout
    hub.recv_kind("cpu_usage").await;
    hub.recv_kind("cpu_usage").await;
    hub.recv_kind("cpu_usage").await;
}

#[tokio::test]
async fn invalid_set_interval_is_ignored() {
    let mut hub = start_agent("test-agent").await;
    hub.recv_kind("interval_update").await;

    hub.send_line("{\"type\":\"set_interval\",\"data\":{\"interval_ms\":0}}\n")
        .await;
    hub.send_line("not even json\n").await;
    hub.send_line("{\"type\":\"set_interval\",\"data\":{\"interval_ms\":250}}\n")
        .await;

    // only the valid command is acknowledged
    let ack = hub.recv_kind("interval_update").await;
    let ack: IntervalData = ack.parse_data().unwrap();
    assert_eq!(ack.interval_ms, 250);
}
