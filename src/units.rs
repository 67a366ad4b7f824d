//! Unit parsing (spec.md §4.2).
//!
//! Maps a free-form RESP unit token (e.g. `M/S`, `NM/S**2`, `COUNTS`) to a
//! [`Unit`] category and an MKS scale factor. A `DEFAULT` sentinel pins
//! input unit to output unit and bypasses categorization entirely.

use crate::error::{Result, RespError};

/// Physical quantity a response stage's input/output is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    Undefined,
    Displacement,
    Velocity,
    Acceleration,
    Counts,
    Volts,
    Default,
    Pressure,
    Tesla,
    Centigrade,
}

/// A parsed unit: category, MKS scale factor, and the original token.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedUnit {
    pub unit: Unit,
    /// Multiplier to convert a value in this unit's prefix to its base (M, COUNTS, V, ...).
    pub scale: f64,
    /// Original token as it appeared in the RESP text, retained for display.
    pub raw: String,
}

impl ParsedUnit {
    /// The `DEFAULT` sentinel: "do not convert; input equals output".
    pub fn default_sentinel(raw: impl Into<String>) -> Self {
        ParsedUnit {
            unit: Unit::Default,
            scale: 1.0,
            raw: raw.into(),
        }
    }
}

/// Recognized length-unit prefixes and their MKS scale factor (relative to metres).
const LENGTH_PREFIXES: &[(&str, f64)] = &[
    ("NM", 1e-9),
    ("UM", 1e-6),
    ("MM", 1e-3),
    ("CM", 1e-2),
    ("M", 1.0),
];

/// Parse a unit token (the first whitespace-delimited field after `Units:`)
/// into a [`ParsedUnit`]. Unrecognized tokens surface as [`RespError::UnrecognizedUnits`].
pub fn parse_unit(token: &str) -> Result<ParsedUnit> {
    let raw = token.trim();
    if raw.is_empty() {
        return Err(RespError::UnrecognizedUnits(raw.to_string()));
    }
    let upper = raw.to_ascii_uppercase();

    if upper == "COUNTS" || upper == "COUNT" {
        return Ok(ParsedUnit {
            unit: Unit::Counts,
            scale: 1.0,
            raw: raw.to_string(),
        });
    }
    if upper == "V" || upper == "VOLTS" {
        return Ok(ParsedUnit {
            unit: Unit::Volts,
            scale: 1.0,
            raw: raw.to_string(),
        });
    }
    if upper == "PA" {
        return Ok(ParsedUnit {
            unit: Unit::Pressure,
            scale: 1.0,
            raw: raw.to_string(),
        });
    }
    if upper == "T" || upper == "TESLA" {
        return Ok(ParsedUnit {
            unit: Unit::Tesla,
            scale: 1.0,
            raw: raw.to_string(),
        });
    }
    if upper == "C" || upper == "CENTIGRADE" {
        return Ok(ParsedUnit {
            unit: Unit::Centigrade,
            scale: 1.0,
            raw: raw.to_string(),
        });
    }

    // Length-derived units: M, M/S, M/S**2 (also M/S2), with optional metric prefix.
    if let Some((numer, denom)) = upper.split_once('/') {
        if let Some((prefix, scale)) = LENGTH_PREFIXES
            .iter()
            .find(|(p, _)| *p == numer)
            .copied()
        {
            let unit = match denom {
                "S" => Unit::Velocity,
                "S**2" | "S2" => Unit::Acceleration,
                _ => return Err(RespError::UnrecognizedUnits(raw.to_string())),
            };
            let _ = prefix;
            return Ok(ParsedUnit {
                unit,
                scale,
                raw: raw.to_string(),
            });
        }
        return Err(RespError::UnrecognizedUnits(raw.to_string()));
    }

    if let Some((prefix, scale)) = LENGTH_PREFIXES.iter().find(|(p, _)| *p == upper).copied() {
        let _ = prefix;
        return Ok(ParsedUnit {
            unit: Unit::Displacement,
            scale,
            raw: raw.to_string(),
        });
    }

    Err(RespError::UnrecognizedUnits(raw.to_string()))
}
