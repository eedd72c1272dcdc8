//! Wire protocol: framed `{type, data}` JSON lines and the typed payloads.
//!
//! Every unit on the wire is one JSON object per line. The envelope's `data`
//! field stays a generic [`Value`] until the `type` is recognized, so the
//! dispatcher can branch on `type` without pre-registering every payload and
//! unknown types pass through harmlessly.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ROLE_CLIENT: &str = "client";
pub const ROLE_MONITOR: &str = "monitor";

/// One framed protocol message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    pub fn new<T: Serialize>(kind: &str, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: kind.to_string(),
            data: serde_json::to_value(data)?,
        })
    }

    /// Second decode step: re-interpret the generic `data` as a typed payload.
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    /// Decodes one line. Trailing `\r` from `\r\n` framing is tolerated.
    pub fn decode(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end_matches(['\r', '\n']))
    }

    /// Encodes to exactly `json + "\n"`. The encoder never pretty-prints, so
    /// the payload cannot contain an interior newline.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandshakeData {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuUsageData {
    #[serde(default)]
    pub usage: f64,
    #[serde(default)]
    pub cores_usage: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryUsageData {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub used_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskUsageData {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub free: u64,
    #[serde(default)]
    pub used_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralData {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub cores: i32,
    #[serde(default)]
    pub mhz: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessUsageData {
    #[serde(default)]
    pub processes: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessInfo {
    #[serde(default)]
    pub pid: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_mb: f64,
    #[serde(default)]
    pub memory_percent: f32,
}

/// Shared by `interval_update`, `interval_set_request` and `set_interval`.
/// Only `interval_set_request` carries a `client_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntervalData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default)]
    pub interval_ms: i64,
}

/// Stable projection of an agent record sent to observers. Each metric family
/// is independently optional; an agent may not have reported all of them yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStateSummary {
    pub remote_addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake: Option<HandshakeData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuUsageData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsageData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskUsageData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processes: Option<ProcessUsageData>,
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub stats_interval_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsStateData {
    pub clients: Vec<ClientStateSummary>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientUpdateData {
    pub client: ClientStateSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRemovedData {
    pub client_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_tolerates_crlf_and_unknown_fields() {
        let msg =
            Message::decode("{\"type\":\"cpu_usage\",\"data\":{\"usage\":12.5,\"extra\":1}}\r\n")
                .unwrap();
        assert_eq!(msg.kind, "cpu_usage");
        let cpu: CpuUsageData = msg.parse_data().unwrap();
        assert_eq!(cpu.usage, 12.5);
        assert!(cpu.cores_usage.is_empty());
    }

    #[test]
    fn decode_accepts_missing_data() {
        let msg = Message::decode("{\"type\":\"clients_request\"}").unwrap();
        assert_eq!(msg.kind, "clients_request");
        assert!(msg.data.is_null());
    }

    #[test]
    fn encode_is_one_terminated_line() {
        let msg = Message::new(
            "set_interval",
            &IntervalData {
                client_id: String::new(),
                interval_ms: 2000,
            },
        )
        .unwrap();
        let line = msg.encode().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        // client_id is omitted on the wire when empty
        assert!(!line.contains("client_id"));
    }

    #[test]
    fn summary_round_trips_with_absent_families() {
        let summary = ClientStateSummary {
            remote_addr: "127.0.0.1:4242".into(),
            handshake: Some(HandshakeData {
                client_id: "a1".into(),
                version: "1.0.0".into(),
                role: ROLE_CLIENT.into(),
            }),
            cpu: None,
            memory: None,
            disk: None,
            general: None,
            processes: None,
            last_update: Utc::now(),
            stats_interval_ms: 5000,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("cpu").is_none());
        let back: ClientStateSummary = serde_json::from_value(value).unwrap();
        assert_eq!(back.handshake.unwrap().client_id, "a1");
        assert_eq!(back.stats_interval_ms, 5000);
    }

    #[test]
    fn interval_request_parses_both_fields() {
        let msg = Message::new(
            "interval_set_request",
            &json!({"client_id": "a1", "interval_ms": 2000}),
        )
        .unwrap();
        let req: IntervalData = msg.parse_data().unwrap();
        assert_eq!(req.client_id, "a1");
        assert_eq!(req.interval_ms, 2000);
    }
}
