//! Dashboard settings abstraction.
//!
//! Zones and unit defaults are supplied by an external settings
//! collaborator. This module defines the shared settings types and a
//! storage trait so the backing mechanism (file, in-memory, embedded
//! flash) stays pluggable. All methods are synchronous.

use crate::model::Zone;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings not found: {0}")]
    NotFound(String),

    #[error("Read error: {0}")]
    ReadError(String),

    #[error("Write error: {0}")]
    WriteError(String),

    #[error("Invalid settings data: {0}")]
    InvalidData(String),
}

/// Externally supplied dashboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSettings {
    /// Configured alarm zones, keyed by the paths they name.
    #[serde(default)]
    pub zones: Vec<Zone>,

    /// Preferred display unit per path (e.g. `"navigation.speedOverGround"`
    /// → `"kn"`). Conversion math itself is an external collaborator.
    #[serde(default)]
    pub unit_defaults: HashMap<String, String>,
}

/// Abstract settings storage.
pub trait SettingsStore: Send + Sync {
    /// Load the current dashboard settings.
    fn load(&self) -> Result<DashboardSettings, SettingsError>;

    /// Persist new dashboard settings.
    fn save(&self, settings: &DashboardSettings) -> Result<(), SettingsError>;

    /// Whether any settings have been persisted.
    fn exists(&self) -> bool;
}
