//! Types that mirror the hub's JSON schema for observer-bound messages.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: &str = "1.0.0";

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

#[derive(Debug, Clone, Deserialize)]
pub struct HandshakeData {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CpuUsageData {
    #[serde(default)]
    pub usage: f64,
    #[serde(default)]
    pub cores_usage: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryUsageData {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub used_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
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

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralData {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub cores: i32,
    #[serde(default)]
    pub mhz: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessUsageData {
    #[serde(default)]
    pub processes: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, Deserialize)]
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

#[derive(Debug, Clone, Deserialize)]
pub struct ClientStateSummary {
    #[serde(default)]
    pub remote_addr: String,
    #[serde(default)]
    pub handshake: Option<HandshakeData>,
    #[serde(default)]
    pub cpu: Option<CpuUsageData>,
    #[serde(default)]
    pub memory: Option<MemoryUsageData>,
    #[serde(default)]
    pub disk: Option<DiskUsageData>,
    #[serde(default)]
    pub general: Option<GeneralData>,
    #[serde(default)]
    pub processes: Option<ProcessUsageData>,
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub stats_interval_ms: i64,
}

impl ClientStateSummary {
    /// Identifier shown in the UI and used to address the agent: the
    /// handshake ID when present, the remote address otherwise.
    pub fn display_name(&self) -> &str {
        match &self.handshake {
            Some(hs) if !hs.client_id.is_empty() => &hs.client_id,
            _ => &self.remote_addr,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientsStateData {
    pub clients: Vec<ClientStateSummary>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientUpdateData {
    pub client: ClientStateSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientRemovedData {
    #[serde(default)]
    pub client_id: String,
}
