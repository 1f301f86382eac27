//! Zone evaluation and the alarm lifecycle.
//!
//! After every store mutation, the updated value is classified against
//! the configured zones for its path. Transitions between
//! classifications are edge-triggered: an alarm opens once when a path
//! leaves normal, updates in place when its severity changes, and closes
//! once when it returns to normal.

use chrono::Utc;
use pelorus_core::{AlarmAction, AlarmEvent, PrimitiveValue, Severity, Zone};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Unit conversion failure.
#[derive(Debug, Error)]
#[error("cannot convert from {from:?} to {to}")]
pub struct ConversionError {
    pub from: Option<String>,
    pub to: String,
}

/// Unit conversion seam.
///
/// Conversion math is an external collaborator; the evaluator only needs
/// a way to express a raw value in a zone's declared unit. A failed
/// conversion skips just the zone that needed it.
pub trait UnitConverter: Send + Sync {
    fn convert(&self, value: f64, from: Option<&str>, to: &str) -> Result<f64, ConversionError>;
}

/// Converter that treats every unit as the base unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl UnitConverter for IdentityConverter {
    fn convert(&self, value: f64, _from: Option<&str>, _to: &str) -> Result<f64, ConversionError> {
        Ok(value)
    }
}

/// The outcome of classifying one value: the severity it landed on and
/// the message of the zone that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub severity: Severity,
    pub message: Option<String>,
}

/// Classifies values against configured zones.
pub struct ZoneEvaluator {
    zones: Vec<Zone>,
    converter: Arc<dyn UnitConverter>,
}

impl ZoneEvaluator {
    pub fn new(converter: Arc<dyn UnitConverter>) -> Self {
        Self {
            zones: Vec::new(),
            converter,
        }
    }

    /// Replace the zone configuration.
    ///
    /// Takes effect on the next value update per path; existing states
    /// are not retroactively recomputed.
    pub fn set_zones(&mut self, zones: Vec<Zone>) {
        self.zones = zones;
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Classify a value on a path.
    ///
    /// Only zones whose `path` matches exactly are considered (no
    /// wildcards). When several zones contain the value, the highest
    /// severity wins; the resulting message is the winning zone's, so it
    /// always belongs to a zone the value actually sits in. Non-numeric
    /// values and conversion failures classify as normal / skip the
    /// affected zone respectively.
    pub fn classify(
        &self,
        path: &str,
        value: &PrimitiveValue,
        base_unit: Option<&str>,
    ) -> Classification {
        let Some(raw) = value.as_f64() else {
            return Classification::default();
        };

        let mut result = Classification::default();
        for zone in self.zones.iter().filter(|z| z.path == path) {
            let converted = match zone.unit.as_deref() {
                Some(unit) => match self.converter.convert(raw, base_unit, unit) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!(path, %e, "skipping zone with failed unit conversion");
                        continue;
                    }
                },
                None => raw,
            };
            if zone.contains(converted) && zone.severity > result.severity {
                result = Classification {
                    severity: zone.severity,
                    message: zone.message.clone(),
                };
            }
        }
        result
    }

    /// Compute the edge-triggered alarm transition, if any.
    ///
    /// Returns at most one event: raised on normal→abnormal, cleared on
    /// abnormal→normal, updated on an abnormal severity change. Equal
    /// states produce nothing.
    pub fn transition(
        &self,
        path: &str,
        old: Severity,
        new: &Classification,
    ) -> Option<AlarmEvent> {
        let action = match (old == Severity::Normal, new.severity == Severity::Normal) {
            (true, false) => AlarmAction::Raised,
            (false, true) => AlarmAction::Cleared,
            (false, false) if old != new.severity => AlarmAction::Updated,
            _ => return None,
        };

        Some(AlarmEvent {
            path: path.to_string(),
            severity: new.severity,
            message: match action {
                AlarmAction::Cleared => None,
                _ => new.message.clone(),
            },
            timestamp: Utc::now(),
            action,
            methods: new.severity.methods(),
        })
    }
}
