//! # Network State
//!
//! Connectivity as reported by the platform observer.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One connectivity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NetworkState {
    pub is_connected: bool,

    /// None while the platform has not probed reachability yet.
    #[serde(default)]
    pub is_internet_reachable: Option<bool>,
}

impl NetworkState {
    pub fn online() -> Self {
        NetworkState {
            is_connected: true,
            is_internet_reachable: Some(true),
        }
    }

    pub fn offline() -> Self {
        NetworkState {
            is_connected: false,
            is_internet_reachable: Some(false),
        }
    }

    /// Connected, and reachability not known to be false.
    pub fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable != Some(false)
    }
}
