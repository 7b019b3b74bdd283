//! # Validation Module
//!
//! Input checks and loose-input coercion.
//!
//! The pages post whatever their form fields hold, so numbers frequently
//! arrive as strings, empty strings or garbage. The rules below decide what
//! that means once, so every surface agrees:
//!
//! | input            | barcode         | quantity          | timeout      |
//! |------------------|-----------------|-------------------|--------------|
//! | missing / null   | missing id      | keep stored value | 0            |
//! | `"  12  "`       | `"12"`          | 12.0              | 12           |
//! | `"abc"`          | `"abc"`         | 0.0               | 0            |
//! | `-5`             | `"-5"`          | rejected          | 0            |
//! | `9999`           | `"9999"`        | 9999.0            | 480          |

use serde_json::Value;

use crate::error::ValidationError;
use crate::MAX_SESSION_TIMEOUT_MINUTES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Barcode
// =============================================================================

/// Trims a barcode and rejects it if nothing is left.
///
/// The format is externally issued and deliberately not checked beyond
/// "non-empty": shops stick their own codes on loose goods.
///
/// ## Example
/// ```rust
/// use tagger_core::validation::normalize_barcode;
///
/// assert_eq!(normalize_barcode(" 4006381333931 ").unwrap(), "4006381333931");
/// assert!(normalize_barcode("   ").is_err());
/// ```
pub fn normalize_barcode(raw: &str) -> ValidationResult<String> {
    let ean = raw.trim();

    if ean.is_empty() {
        return Err(ValidationError::missing_identifier());
    }

    Ok(ean.to_string())
}

/// Trims a display name. Empty is allowed.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_string()
}

// =============================================================================
// Numbers
// =============================================================================

/// Reads a JSON value as an integer the way a form field is usually meant.
///
/// Floats are truncated, strings are trimmed and parsed as integers.
fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Coerces a quantity field.
///
/// - missing or `null` → `None` (the stored quantity is kept)
/// - non-numeric → `Some(0.0)`
/// - negative → rejected
pub fn coerce_quantity(value: Option<&Value>) -> ValidationResult<Option<f64>> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    let qty = value_as_f64(value).unwrap_or(0.0);
    validate_quantity(qty)?;
    Ok(Some(qty))
}

/// Rejects negative and non-finite quantities.
pub fn validate_quantity(qty: f64) -> ValidationResult<()> {
    if !qty.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "qty".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if qty < 0.0 {
        return Err(ValidationError::Negative {
            field: "qty".to_string(),
        });
    }

    Ok(())
}

/// Coerces a shop reference. Anything that is not an integer means "no shop".
pub fn coerce_shop_id(value: Option<&Value>) -> Option<i64> {
    value.and_then(value_as_i64)
}

// =============================================================================
// Session Timeout
// =============================================================================

/// Clamps a timeout to `[0, MAX_SESSION_TIMEOUT_MINUTES]`.
pub fn clamp_timeout_minutes(minutes: i64) -> u32 {
    minutes.clamp(0, MAX_SESSION_TIMEOUT_MINUTES as i64) as u32
}

/// Coerces a timeout field; anything non-numeric becomes 0.
///
/// ## Example
/// ```rust
/// use serde_json::json;
/// use tagger_core::validation::coerce_timeout_minutes;
///
/// assert_eq!(coerce_timeout_minutes(&json!(-5)), 0);
/// assert_eq!(coerce_timeout_minutes(&json!("abc")), 0);
/// assert_eq!(coerce_timeout_minutes(&json!(9999)), 480);
/// ```
pub fn coerce_timeout_minutes(value: &Value) -> u32 {
    value_as_i64(value).map(clamp_timeout_minutes).unwrap_or(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_barcode() {
        assert_eq!(normalize_barcode("4006381333931").unwrap(), "4006381333931");
        assert_eq!(normalize_barcode("  123 ").unwrap(), "123");

        assert_eq!(
            normalize_barcode(""),
            Err(ValidationError::missing_identifier())
        );
        assert!(normalize_barcode(" \t ").is_err());
    }

    #[test]
    fn test_normalize_barcode_accepts_any_non_empty_code() {
        let long = "1".repeat(65);
        assert_eq!(normalize_barcode(&long).unwrap(), long);
        assert_eq!(normalize_barcode("12\n34").unwrap(), "12\n34");
        assert_eq!(normalize_barcode("LOOSE-apples/3").unwrap(), "LOOSE-apples/3");
    }

    #[test]
    fn test_coerce_quantity() {
        assert_eq!(coerce_quantity(None).unwrap(), None);
        assert_eq!(coerce_quantity(Some(&Value::Null)).unwrap(), None);
        assert_eq!(coerce_quantity(Some(&json!(3))).unwrap(), Some(3.0));
        assert_eq!(coerce_quantity(Some(&json!("2.5"))).unwrap(), Some(2.5));
        assert_eq!(coerce_quantity(Some(&json!("abc"))).unwrap(), Some(0.0));
        assert_eq!(coerce_quantity(Some(&json!([1]))).unwrap(), Some(0.0));
        assert!(coerce_quantity(Some(&json!(-1))).is_err());
    }

    #[test]
    fn test_coerce_shop_id() {
        assert_eq!(coerce_shop_id(Some(&json!(4))), Some(4));
        assert_eq!(coerce_shop_id(Some(&json!("7"))), Some(7));
        assert_eq!(coerce_shop_id(Some(&json!("x"))), None);
        assert_eq!(coerce_shop_id(None), None);
    }

    #[test]
    fn test_timeout_clamp() {
        assert_eq!(coerce_timeout_minutes(&json!(-5)), 0);
        assert_eq!(coerce_timeout_minutes(&json!("abc")), 0);
        assert_eq!(coerce_timeout_minutes(&json!(9999)), 480);
        assert_eq!(coerce_timeout_minutes(&json!("45")), 45);
        assert_eq!(coerce_timeout_minutes(&json!(12.9)), 12);
        assert_eq!(coerce_timeout_minutes(&Value::Null), 0);
        assert_eq!(clamp_timeout_minutes(480), 480);
        assert_eq!(clamp_timeout_minutes(0), 0);
    }
}
