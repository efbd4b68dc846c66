//! Enumeration types for the biosurvey backend.
//!
//! Database columns store these as lowercase text (or the IUCN code for
//! [`ConservationStatus`]); [`core::str::FromStr`] and `as_str` convert in
//! both directions. Query-string parameters that have a documented fallback
//! ([`Interval`], [`Metric`]) expose `parse_or_default` instead of failing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a stored or submitted string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl core::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

/// Generates `as_str`, `Display`, and `FromStr` for a unit-only enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The canonical string form used in storage and query strings.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Users and projects
// ---------------------------------------------------------------------------

/// Role of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Full access to every project and user.
    Admin,
    /// Manages indicators and reports for projects they belong to.
    Researcher,
    /// Logs observations in projects they belong to.
    #[default]
    Observer,
}

string_enum!(Role, "role", {
    Admin => "admin",
    Researcher => "researcher",
    Observer => "observer",
});

/// Lifecycle status of a monitoring project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ProjectStatus {
    /// Observations are being collected.
    #[default]
    Active,
    /// Fieldwork has finished.
    Completed,
    /// Temporarily suspended.
    Paused,
    /// Abandoned before completion.
    Cancelled,
}

string_enum!(ProjectStatus, "project status", {
    Active => "active",
    Completed => "completed",
    Paused => "paused",
    Cancelled => "cancelled",
});

// ---------------------------------------------------------------------------
// Species
// ---------------------------------------------------------------------------

/// IUCN Red List category of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ConservationStatus {
    /// Least Concern.
    #[serde(rename = "LC")]
    LeastConcern,
    /// Near Threatened.
    #[serde(rename = "NT")]
    NearThreatened,
    /// Vulnerable.
    #[serde(rename = "VU")]
    Vulnerable,
    /// Endangered.
    #[serde(rename = "EN")]
    Endangered,
    /// Critically Endangered.
    #[serde(rename = "CR")]
    CriticallyEndangered,
    /// Extinct in the Wild.
    #[serde(rename = "EW")]
    ExtinctInTheWild,
    /// Extinct.
    #[serde(rename = "EX")]
    Extinct,
    /// Data Deficient.
    #[serde(rename = "DD")]
    DataDeficient,
    /// Not Evaluated.
    #[serde(rename = "NE")]
    NotEvaluated,
}

impl ConservationStatus {
    /// The two-letter IUCN code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::LeastConcern => "LC",
            Self::NearThreatened => "NT",
            Self::Vulnerable => "VU",
            Self::Endangered => "EN",
            Self::CriticallyEndangered => "CR",
            Self::ExtinctInTheWild => "EW",
            Self::Extinct => "EX",
            Self::DataDeficient => "DD",
            Self::NotEvaluated => "NE",
        }
    }
}

impl core::fmt::Display for ConservationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl core::str::FromStr for ConservationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LC" => Ok(Self::LeastConcern),
            "NT" => Ok(Self::NearThreatened),
            "VU" => Ok(Self::Vulnerable),
            "EN" => Ok(Self::Endangered),
            "CR" => Ok(Self::CriticallyEndangered),
            "EW" => Ok(Self::ExtinctInTheWild),
            "EX" => Ok(Self::Extinct),
            "DD" => Ok(Self::DataDeficient),
            "NE" => Ok(Self::NotEvaluated),
            _ => Err(ParseEnumError {
                kind: "conservation status",
                value: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Kind of value a stored indicator holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum IndicatorMetricType {
    /// Number of observation records.
    Count,
    /// Observations per unit of area.
    Density,
    /// A diversity index (richness, Shannon, Simpson, evenness).
    Diversity,
    /// Number of individuals.
    Abundance,
    /// Share of samples in which a species occurs.
    Frequency,
}

string_enum!(IndicatorMetricType, "indicator metric type", {
    Count => "count",
    Density => "density",
    Diversity => "diversity",
    Abundance => "abundance",
    Frequency => "frequency",
});

/// Time bucket width for temporal aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Interval {
    /// One bucket per calendar day (`YYYY-MM-DD`).
    Daily,
    /// One bucket per ISO week, keyed by its Monday (`YYYY-MM-DD`).
    Weekly,
    /// One bucket per calendar month (`YYYY-MM`).
    #[default]
    Monthly,
    /// One bucket per calendar year (`YYYY`).
    Yearly,
}

string_enum!(Interval, "interval", {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Yearly => "yearly",
});

impl Interval {
    /// Parse an interval, falling back to [`Interval::Monthly`] for
    /// missing or unrecognized input.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

/// What a time bucket accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Metric {
    /// +1 per observation record.
    #[default]
    Count,
    /// +`count` per observation record (individuals).
    Abundance,
}

string_enum!(Metric, "metric", {
    Count => "count",
    Abundance => "abundance",
});

impl Metric {
    /// Parse a metric, falling back to [`Metric::Count`] for missing or
    /// unrecognized input.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

/// File format for observation exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ExportFormat {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
    /// A JSON array of row objects.
    Json,
}

string_enum!(ExportFormat, "export format", {
    Csv => "csv",
    Json => "json",
});

impl ExportFormat {
    /// File extension (without the dot).
    pub const fn extension(self) -> &'static str {
        self.as_str()
    }
}
