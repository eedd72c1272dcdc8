//! Types that mirror the hub's JSON wire schema, plus the framed line writer.

use std::io;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;

pub const PROTOCOL_VERSION: &str = "1.0.0";
pub const ROLE_CLIENT: &str = "client";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    pub fn decode(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end_matches(['\r', '\n']))
    }

    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HandshakeData {
    pub client_id: String,
    pub version: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuUsageData {
    pub usage: f64,
    pub cores_usage: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsageData {
    pub total: u64,
    pub used: u64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskUsageData {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneralData {
    pub model_name: String,
    pub cores: i32,
    pub mhz: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessUsageData {
    pub processes: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub pid: i32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub memory_percent: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalData {
    pub interval_ms: i64,
}

/// Write side of the hub connection. Clones share one lock, so the sampler
/// task, the control task and the input loop interleave whole frames only.
#[derive(Clone)]
pub struct HubWriter {
    inner: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
}

impl HubWriter {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(writer)),
        }
    }

    pub async fn send<T: Serialize>(&self, kind: &str, data: &T) -> io::Result<()> {
        let msg = serde_json::json!({"type": kind, "data": data});
        let mut line = msg.to_string();
        line.push('\n');
        let mut writer = self.inner.lock().await;
        writer.write_all(line.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_interval_decodes_from_hub_line() {
        let msg = Message::decode("{\"type\":\"set_interval\",\"data\":{\"interval_ms\":2000}}\r\n")
            .unwrap();
        assert_eq!(msg.kind, "set_interval");
        let data: IntervalData = msg.parse_data().unwrap();
        assert_eq!(data.interval_ms, 2000);
    }

    #[test]
    fn handshake_serializes_expected_fields() {
        let hs = HandshakeData {
            client_id: "host-1".into(),
            version: PROTOCOL_VERSION.into(),
            role: ROLE_CLIENT.into(),
        };
        let value = serde_json::to_value(&hs).unwrap();
        assert_eq!(value["client_id"], "host-1");
        assert_eq!(value["role"], "client");
        assert_eq!(value["version"], "1.0.0");
    }
}
