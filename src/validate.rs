//! Field-level validation helpers used by entity `validate` impls.

use crate::error::ValidationError;

pub fn max_len(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("Ensure this field has no more than {} characters (it has {}).", max, len),
        ));
    }
    Ok(())
}

pub fn max_len_opt(field: &str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

/// Required text: non-blank and within `max` characters.
pub fn text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    not_blank(field, value)?;
    max_len(field, value, max)
}

pub fn not_blank(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "This field may not be blank."));
    }
    Ok(())
}

/// Foreign keys are stored as record ids and must be present.
pub fn reference(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "This field is required."));
    }
    Ok(())
}

pub fn min_digits(
    field: &str,
    value: u32,
    min: usize,
    message: &str,
) -> Result<(), ValidationError> {
    if value.to_string().len() < min {
        return Err(ValidationError::new(field, message));
    }
    Ok(())
}

pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if !allowed.contains(&value) {
        return Err(ValidationError::new(
            field,
            format!("\"{}\" is not a valid choice. Expected one of: {}", value, allowed.join(", ")),
        ));
    }
    Ok(())
}

/// Decimal degrees within `[-limit, limit]`.
pub fn coordinate(field: &str, value: &str, limit: f64) -> Result<(), ValidationError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::new(field, format!("\"{}\" is not a decimal number.", value)))?;
    if !parsed.is_finite() || parsed.abs() > limit {
        return Err(ValidationError::new(
            field,
            format!("{} must be between -{} and {}.", parsed, limit, limit),
        ));
    }
    Ok(())
}
