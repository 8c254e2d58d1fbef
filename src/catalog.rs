//! Static catalog of the telemetry metrics emitted by the plant.
//!
//! The set is closed: every per-metric structure in the crate is keyed by
//! [`MetricKind`], and nothing extends it at runtime.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fixed-precision rendering hint for a metric's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHint {
    pub decimals: usize,
}

impl FormatHint {
    #[must_use]
    pub fn format(self, value: f64) -> String {
        format!("{:.*}", self.decimals, value)
    }
}

/// Display metadata attached to a metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricInfo {
    pub kind: MetricKind,
    pub wire_id: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub hint: FormatHint,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
pub enum MetricKind {
    #[value(alias = "PowerInput")]
    PowerInput,
    #[value(alias = "WaterFlowRate")]
    WaterFlowRate,
    #[value(alias = "Temperature")]
    Temperature,
    #[value(alias = "HydrogenProductionRate")]
    HydrogenProductionRate,
    #[value(alias = "Efficiency")]
    Efficiency,
}

static POWER_INPUT: MetricInfo = MetricInfo {
    kind: MetricKind::PowerInput,
    wire_id: "PowerInput",
    label: "Power Input",
    unit: "kW",
    hint: FormatHint { decimals: 1 },
};

static WATER_FLOW_RATE: MetricInfo = MetricInfo {
    kind: MetricKind::WaterFlowRate,
    wire_id: "WaterFlowRate",
    label: "Water Flow Rate",
    unit: "L/min",
    hint: FormatHint { decimals: 2 },
};

static TEMPERATURE: MetricInfo = MetricInfo {
    kind: MetricKind::Temperature,
    wire_id: "Temperature",
    label: "Temperature",
    unit: "°C",
    hint: FormatHint { decimals: 1 },
};

static HYDROGEN_PRODUCTION_RATE: MetricInfo = MetricInfo {
    kind: MetricKind::HydrogenProductionRate,
    wire_id: "HydrogenProductionRate",
    label: "Hydrogen Production Rate",
    unit: "kg/h",
    hint: FormatHint { decimals: 2 },
};

static EFFICIENCY: MetricInfo = MetricInfo {
    kind: MetricKind::Efficiency,
    wire_id: "Efficiency",
    label: "Efficiency",
    unit: "%",
    hint: FormatHint { decimals: 2 },
};

static CATALOG: [&MetricInfo; 5] = [
    &POWER_INPUT,
    &WATER_FLOW_RATE,
    &TEMPERATURE,
    &HYDROGEN_PRODUCTION_RATE,
    &EFFICIENCY,
];

impl MetricKind {
    /// All kinds in catalog order.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::PowerInput,
        MetricKind::WaterFlowRate,
        MetricKind::Temperature,
        MetricKind::HydrogenProductionRate,
        MetricKind::Efficiency,
    ];

    #[must_use]
    pub fn info(self) -> &'static MetricInfo {
        match self {
            MetricKind::PowerInput => &POWER_INPUT,
            MetricKind::WaterFlowRate => &WATER_FLOW_RATE,
            MetricKind::Temperature => &TEMPERATURE,
            MetricKind::HydrogenProductionRate => &HYDROGEN_PRODUCTION_RATE,
            MetricKind::Efficiency => &EFFICIENCY,
        }
    }

    /// Identifier used in the `type` field on the wire and in query strings.
    #[must_use]
    pub fn wire_id(self) -> &'static str {
        self.info().wire_id
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        self.info().label
    }

    #[must_use]
    pub fn unit(self) -> &'static str {
        self.info().unit
    }

    #[must_use]
    pub fn hint(self) -> FormatHint {
        self.info().hint
    }

    /// Label with unit, e.g. `Power Input (kW)`.
    #[must_use]
    pub fn display_label(self) -> String {
        format!("{} ({})", self.label(), self.unit())
    }

    /// Exact lookup by wire identifier.
    #[must_use]
    pub fn from_wire_id(value: &str) -> Option<Self> {
        CATALOG
            .iter()
            .find(|info| info.wire_id == value)
            .map(|info| info.kind)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_id())
    }
}

impl std::str::FromStr for MetricKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(kind) = MetricKind::from_wire_id(trimmed) {
            return Ok(kind);
        }
        <MetricKind as ValueEnum>::from_str(trimmed, true).map_err(|_err| {
            ValidationError::UnknownMetricKind {
                value: s.to_owned(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_ids_round_trip() -> Result<(), String> {
        for kind in MetricKind::ALL {
            let parsed = MetricKind::from_wire_id(kind.wire_id())
                .ok_or_else(|| format!("Missing wire id for {:?}", kind))?;
            if parsed != kind {
                return Err(format!("Expected {:?}, got {:?}", kind, parsed));
            }
        }
        Ok(())
    }

    #[test]
    fn catalog_entries_match_their_kind() -> Result<(), String> {
        for kind in MetricKind::ALL {
            if kind.info().kind != kind {
                return Err(format!("Catalog entry mismatch for {:?}", kind));
            }
        }
        Ok(())
    }

    #[test]
    fn from_str_accepts_cli_and_wire_names() -> Result<(), String> {
        let cli: MetricKind = "hydrogen-production-rate"
            .parse()
            .map_err(|err| format!("parse failed: {}", err))?;
        let wire: MetricKind = "HydrogenProductionRate"
            .parse()
            .map_err(|err| format!("parse failed: {}", err))?;
        if cli != MetricKind::HydrogenProductionRate || wire != cli {
            return Err("Unexpected kind".to_owned());
        }
        Ok(())
    }

    #[test]
    fn from_str_rejects_unknown_kind() -> Result<(), String> {
        match "Pressure".parse::<MetricKind>() {
            Err(ValidationError::UnknownMetricKind { value }) if value == "Pressure" => Ok(()),
            other => Err(format!("Unexpected result: {:?}", other)),
        }
    }

    #[test]
    fn wire_lookup_is_case_sensitive() -> Result<(), String> {
        if MetricKind::from_wire_id("powerinput").is_some() {
            return Err("Wire lookup must be exact".to_owned());
        }
        Ok(())
    }

    #[test]
    fn format_hint_uses_fixed_decimals() -> Result<(), String> {
        let rendered = MetricKind::PowerInput.hint().format(1234.56);
        if rendered != "1234.6" {
            return Err(format!("Unexpected rendering: {}", rendered));
        }
        if MetricKind::Efficiency.display_label() != "Efficiency (%)" {
            return Err("Unexpected display label".to_owned());
        }
        Ok(())
    }
}
