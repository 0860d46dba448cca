//! Automatic record codes.
//!
//! Sequence codes come from the `code_sequences` table, one counter per
//! entity, bumped inside the caller's transaction so a rolled-back insert
//! does not consume a number. Facility codes are random draws checked
//! against the codes already in use.
//!
//! A code the caller leaves empty (`None`, a blank string, or `0` for
//! sequence codes) is generated; anything else is kept as given.

use rand::Rng;
use sqlx::SqliteConnection;

use crate::config::CodesConfig;
use crate::error::{RegistryError, RegistryResult};

/// Returns the next value of the named counter, starting at 1.
pub async fn next_in_sequence(conn: &mut SqliteConnection, name: &str) -> RegistryResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO code_sequences (name, last_value) VALUES (?, 1)
        ON CONFLICT(name) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(value)
}

/// True when a text code was not supplied.
pub fn is_unset(code: &Option<String>) -> bool {
    code.as_deref().map_or(true, |c| c.trim().is_empty())
}

/// Fills `code` from the named sequence when the caller left it empty.
pub async fn fill_sequence(
    conn: &mut SqliteConnection,
    name: &str,
    code: &mut Option<i64>,
) -> RegistryResult<()> {
    if matches!(code, None | Some(0)) {
        *code = Some(next_in_sequence(conn, name).await?);
    }
    Ok(())
}

/// `<prefix><n>` where `n` comes from the named sequence, at most
/// `max_len` characters long.
pub async fn prefixed(
    conn: &mut SqliteConnection,
    name: &str,
    prefix: &str,
    max_len: usize,
) -> RegistryResult<String> {
    let n = next_in_sequence(conn, name).await?;
    Ok(bounded(prefix, n, max_len))
}

/// Joins `prefix` and `n`, cutting the prefix so the number always fits.
fn bounded(prefix: &str, n: i64, max_len: usize) -> String {
    let number = n.to_string();
    let keep = max_len.saturating_sub(number.len());
    let head: String = prefix.chars().take(keep).collect();
    format!("{}{}", head, number)
}

/// Draws random facility codes until one is unused.
pub async fn random_facility_code(
    conn: &mut SqliteConnection,
    codes: &CodesConfig,
) -> RegistryResult<String> {
    for _ in 0..codes.max_attempts {
        let candidate = rand::rng()
            .random_range(codes.facility_min..=codes.facility_max)
            .to_string();

        let taken: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM facilities WHERE code = ?")
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;

        if !taken {
            return Ok(candidate);
        }
        tracing::debug!(code = %candidate, "facility code already taken, drawing again");
    }

    Err(RegistryError::Conflict(format!(
        "no free facility code found after {} attempts",
        codes.max_attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_codes_are_unset() {
        assert!(is_unset(&None));
        assert!(is_unset(&Some(String::new())));
        assert!(is_unset(&Some("  ".to_string())));
        assert!(!is_unset(&Some("FBO".to_string())));
    }

    #[test]
    fn test_bounded_keeps_short_prefix() {
        assert_eq!(bounded("OWNER", 12, 100), "OWNER12");
    }

    #[test]
    fn test_bounded_cuts_long_prefix() {
        let code = bounded(&"x".repeat(150), 123, 100);
        assert_eq!(code.chars().count(), 100);
        assert!(code.ends_with("x123"));

        // multi-byte prefixes are cut on character boundaries
        let code = bounded("Murang'á", 7, 8);
        assert_eq!(code, "Murang'7");
    }
}
