//! fleettop observer: a terminal dashboard subscribed to the hub's live
//! stream of agent updates, able to steer each agent's reporting cadence.

pub mod app;
pub mod history;
pub mod net;
pub mod state;
pub mod types;
pub mod ui;
