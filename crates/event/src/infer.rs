//! Field type inference for learned templates

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Unix seconds for 2000-01-01T00:00:00Z; epoch values before this are
/// treated as plain integers.
const EPOCH_PLAUSIBLE_MIN: i64 = 946_684_800;

/// Unix seconds for 2100-01-01T00:00:00Z
const EPOCH_PLAUSIBLE_MAX: i64 = 4_102_444_800;

/// Inferred type of a template field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    Timestamp,
}

/// Infer the type of a field value.
///
/// Timestamps are recognized before plain integers so that epoch-second
/// values in a plausible range (2000..2100) classify as timestamps.
pub fn infer_kind(value: &str) -> FieldKind {
    let value = value.trim();

    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return FieldKind::Bool;
    }

    if is_timestamp(value) {
        return FieldKind::Timestamp;
    }

    if is_int(value) {
        return FieldKind::Int;
    }

    if is_float(value) {
        return FieldKind::Float;
    }

    FieldKind::String
}

fn is_timestamp(value: &str) -> bool {
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return true;
    }

    if let Ok(epoch) = value.parse::<i64>() {
        return (EPOCH_PLAUSIBLE_MIN..EPOCH_PLAUSIBLE_MAX).contains(&epoch);
    }

    false
}

fn is_int(value: &str) -> bool {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float(value: &str) -> bool {
    let rest = value.strip_prefix(['-', '+']).unwrap_or(value);

    // Mantissa: digits '.' digits
    let Some((int_part, frac)) = rest.split_once('.') else {
        return false;
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    // Optional exponent after the fraction digits
    let (frac_part, exp) = match frac.split_once(['e', 'E']) {
        Some((f, e)) => (f, Some(e)),
        None => (frac, None),
    };
    if frac_part.is_empty() || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    match exp {
        None => true,
        Some(e) => {
            let e = e.strip_prefix(['-', '+']).unwrap_or(e);
            !e.is_empty() && e.bytes().all(|b| b.is_ascii_digit())
        }
    }
}
