// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes quantity conversion.
//!
//! Converts CPU and memory quantities to canonical integer units (millicores and bytes)
//! and back to the quantity strings used in `ResourceQuota` objects. Also resolves
//! percent-or-absolute values such as a rolling update's `maxSurge`.
//!
//! Unparseable values are a hard [`QuantityError`] rather than a `NaN` that would
//! silently corrupt an aggregate.
//!
//! # Example
//!
//! ```rust
//! use k8s_constructs::units::{bytes_to_memory, cpu_to_millicores, memory_to_bytes};
//!
//! assert_eq!(cpu_to_millicores("250m").unwrap(), 250);
//! assert_eq!(cpu_to_millicores("1.5").unwrap(), 1500);
//! assert_eq!(memory_to_bytes("1Gi").unwrap(), 1 << 30);
//! assert_eq!(bytes_to_memory(1 << 30).0, "1024Mi");
//! ```

use k8s_openapi::apimachinery::pkg::{api::resource::Quantity, util::intstr::IntOrString};

use crate::constants::{BYTES_PER_MEBIBYTE, MILLICORES_PER_CORE, RESOURCE_CPU, RESOURCE_MEMORY};
use crate::errors::QuantityError;

/// Memory suffixes and their multipliers, checked in this order.
///
/// Binary suffixes come first so `Mi` is never read as `M` followed by garbage.
const MEMORY_SUFFIXES: [(&str, u64); 6] = [
    ("Gi", 1 << 30),
    ("Mi", 1 << 20),
    ("Ki", 1 << 10),
    ("G", 1_000_000_000),
    ("M", 1_000_000),
    ("K", 1_000),
];

/// A quantity as written in a manifest: either a raw number or a unit-suffixed string.
#[derive(Clone, Debug, PartialEq)]
pub enum QuantityValue {
    /// Bare number in base units (cores for CPU, bytes for memory)
    Number(f64),
    /// String such as `"100m"`, `"1Gi"` or `"2"`
    Text(String),
}

impl From<&Quantity> for QuantityValue {
    fn from(quantity: &Quantity) -> Self {
        Self::Text(quantity.0.clone())
    }
}

impl From<&str> for QuantityValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QuantityValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for QuantityValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for QuantityValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl std::fmt::Display for QuantityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Rounding direction for percent-or-absolute resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// Round towards positive infinity
    Ceil,
    /// Round towards negative infinity
    Floor,
}

impl Rounding {
    fn apply(self, value: f64) -> f64 {
        match self {
            Self::Ceil => value.ceil(),
            Self::Floor => value.floor(),
        }
    }
}

/// Converts a CPU quantity to millicores.
///
/// A string ending in `m` is already in millicores; anything else is whole cores.
///
/// # Errors
///
/// Returns [`QuantityError::Invalid`] if the numeric part is malformed, negative, not finite
/// or too large for a `u64`.
pub fn cpu_to_millicores(value: impl Into<QuantityValue>) -> Result<u64, QuantityError> {
    let value = value.into();
    let millicores = match &value {
        QuantityValue::Number(cores) => cores * to_f64(MILLICORES_PER_CORE),
        QuantityValue::Text(text) => match text.strip_suffix('m') {
            Some(prefix) => parse_number(RESOURCE_CPU, text, prefix)?,
            None => parse_number(RESOURCE_CPU, text, text)? * to_f64(MILLICORES_PER_CORE),
        },
    };
    to_unsigned(RESOURCE_CPU, &value, millicores)
}

/// Converts a memory quantity to bytes.
///
/// Suffixes are checked in the order `Gi`, `Mi`, `Ki` (powers of 1024) then `G`, `M`, `K`
/// (powers of 1000). A value without a suffix is a byte count.
///
/// # Errors
///
/// Returns [`QuantityError::Invalid`] if the numeric part is malformed, negative, not finite,
/// too large for a `u64`, or carries a suffix outside the supported set.
pub fn memory_to_bytes(value: impl Into<QuantityValue>) -> Result<u64, QuantityError> {
    let value = value.into();
    let bytes = match &value {
        QuantityValue::Number(bytes) => *bytes,
        QuantityValue::Text(text) => {
            let suffixed = MEMORY_SUFFIXES.iter().find_map(|(suffix, multiplier)| {
                text.strip_suffix(suffix).map(|prefix| (prefix, *multiplier))
            });
            match suffixed {
                Some((prefix, multiplier)) => {
                    parse_number(RESOURCE_MEMORY, text, prefix)? * to_f64(multiplier)
                }
                None => parse_number(RESOURCE_MEMORY, text, text)?,
            }
        }
    };
    to_unsigned(RESOURCE_MEMORY, &value, bytes)
}

/// Formats millicores as a CPU quantity (`"<N>m"`).
#[must_use]
pub fn millicores_to_cpu(millicores: u64) -> Quantity {
    Quantity(format!("{millicores}m"))
}

/// Formats bytes as a memory quantity in whole mebibytes, rounding up (`"<N>Mi"`).
///
/// Sub-mebibyte precision is dropped on purpose: quota output overestimates rather than
/// underestimates.
#[must_use]
pub fn bytes_to_memory(bytes: u64) -> Quantity {
    Quantity(format!("{}Mi", bytes.div_ceil(BYTES_PER_MEBIBYTE)))
}

/// Resolves an integer-or-percentage value against a total.
///
/// Integers are returned as-is. Percentage strings (`"25%"`) resolve to
/// `percentage / 100 * total`, rounded in the requested direction. Strings holding a plain
/// integer are accepted as absolute values.
///
/// # Errors
///
/// Returns [`QuantityError::InvalidIntOrPercent`] for any other string.
pub fn resolve_int_or_percent(
    value: &IntOrString,
    total: i32,
    rounding: Rounding,
) -> Result<i32, QuantityError> {
    let text = match value {
        IntOrString::Int(n) => return Ok(*n),
        IntOrString::String(s) => s.trim(),
    };

    let invalid = || QuantityError::InvalidIntOrPercent {
        value: text.to_string(),
    };

    if let Some(percent) = text.strip_suffix('%') {
        let percent: f64 = percent.trim().parse().map_err(|_| invalid())?;
        if !percent.is_finite() {
            return Err(invalid());
        }
        let resolved = rounding.apply(percent / 100.0 * f64::from(total));
        #[allow(clippy::cast_possible_truncation)]
        return Ok(resolved as i32);
    }

    text.parse::<i32>().map_err(|_| invalid())
}

fn parse_number(resource: &str, value: &str, number: &str) -> Result<f64, QuantityError> {
    let invalid = |reason: &str| QuantityError::Invalid {
        resource: resource.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let number = number.trim();
    if number.is_empty() {
        return Err(invalid("missing numeric value"));
    }
    // Rust accepts "NaN" and "inf"; quantities never do.
    if !number
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return Err(invalid("unrecognized unit suffix"));
    }
    number
        .parse::<f64>()
        .map_err(|_| invalid("malformed numeric value"))
}

fn to_unsigned(resource: &str, value: &QuantityValue, amount: f64) -> Result<u64, QuantityError> {
    let invalid = |reason: &str| QuantityError::Invalid {
        resource: resource.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if !amount.is_finite() {
        return Err(invalid("value is not finite"));
    }
    if amount < 0.0 {
        return Err(invalid("value is negative"));
    }
    let amount = amount.round();
    if amount >= to_f64(u64::MAX) {
        return Err(invalid("value is out of range"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(amount as u64)
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: u64) -> f64 {
    value as f64
}

#[cfg(test)]
#[path = "units_tests.rs"]
mod units_tests;
