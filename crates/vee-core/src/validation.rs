//! # Client-side Validation
//!
//! Checks that run before any remote call. Each returns the normalized
//! value or an `AppError::ValidationError` carrying the user-facing message.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::query::Filter;
use crate::traits::{records, RecordStore};

pub const MAX_CONTENT_CHARS: usize = 500;
pub const MAX_FULL_NAME_CHARS: usize = 50;
pub const MAX_BIO_CHARS: usize = 250;
pub const MIN_PASSWORD_CHARS: usize = 8;

static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]{3,20}$").expect("valid regex"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// Trims and lowercases, then checks the handle pattern.
pub fn username(raw: &str) -> Result<String> {
    let normalized = raw.trim().to_lowercase();
    if USERNAME.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(AppError::validation("Must be 3-20 lowercase letters, numbers, or underscores."))
    }
}

pub fn full_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || raw.chars().count() > MAX_FULL_NAME_CHARS {
        return Err(AppError::validation("Full name is required (max 50 characters)."));
    }
    Ok(trimmed.to_string())
}

pub fn bio(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MAX_BIO_CHARS {
        return Err(AppError::validation("Bio must be at most 250 characters."));
    }
    Ok(trimmed.to_string())
}

pub fn password(password: &str, confirm: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::validation("Password must be at least 8 characters long."));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(AppError::validation(
            "Password must contain at least one letter and one number.",
        ));
    }
    if password != confirm {
        return Err(AppError::validation("Passwords do not match."));
    }
    Ok(())
}

pub fn email(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if EMAIL.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(AppError::validation("Please enter a valid email address."))
    }
}

/// Post or comment body: 1 to 500 characters.
pub fn content(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(AppError::validation("Content cannot be empty."));
    }
    repost_comment(raw)
}

/// A repost's attached comment may be empty but not overlong.
pub fn repost_comment(raw: &str) -> Result<String> {
    if raw.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::validation("Content must be at most 500 characters."));
    }
    Ok(raw.to_string())
}

/// Validates the handle and checks no user has it yet. A `NotFound` from
/// the store means the name is free.
pub async fn username_available(store: &dyn RecordStore, raw: &str) -> Result<String> {
    let name = username(raw)?;
    match records::<User>(store).find_first(&Filter::eq("username", name.as_str())).await? {
        Some(_) => Err(AppError::validation("Username is already taken.")),
        None => Ok(name),
    }
}

/// Validates the address and checks no account uses it yet.
pub async fn email_available(store: &dyn RecordStore, raw: &str) -> Result<String> {
    let address = email(raw)?;
    match records::<User>(store).find_first(&Filter::eq("email", address.as_str())).await? {
        Some(_) => Err(AppError::validation("This email address is already in use.")),
        None => Ok(address),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockRecordStore;
    use serde_json::json;

    #[test]
    fn test_username_rules() {
        assert_eq!(username("  Ada_L ").unwrap(), "ada_l");
        assert!(username("ab").is_err());
        assert!(username("has space").is_err());
        assert!(username(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(password("short1", "short1").is_err());
        assert!(password("lettersonly", "lettersonly").is_err());
        assert!(password("12345678", "12345678").is_err());
        assert_eq!(
            password("letters123", "letters124").unwrap_err(),
            AppError::validation("Passwords do not match.")
        );
        assert!(password("letters123", "letters123").is_ok());
    }

    #[test]
    fn test_content_bounds() {
        assert!(content("   ").is_err());
        assert!(content(&"a".repeat(500)).is_ok());
        assert!(content(&"a".repeat(501)).is_err());
        assert_eq!(repost_comment("").unwrap(), "");
    }

    #[test]
    fn test_email_and_profile_fields() {
        assert!(email("ada@example.org").is_ok());
        assert!(email("ada@example").is_err());
        assert!(full_name(" ").is_err());
        assert!(bio(&"b".repeat(251)).is_err());
    }

    #[tokio::test]
    async fn test_username_taken() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .returning(|_, _| Ok(json!({ "id": "u9", "username": "ada" })));
        assert_eq!(
            username_available(&store, "ada").await.unwrap_err(),
            AppError::validation("Username is already taken.")
        );
    }

    #[tokio::test]
    async fn test_email_in_use() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .withf(|_, filter| filter.to_string() == r#"email = "ada@example.org""#)
            .returning(|_, _| Ok(json!({ "id": "u9", "username": "ada" })));
        assert_eq!(
            email_available(&store, " ada@example.org ").await.unwrap_err(),
            AppError::validation("This email address is already in use.")
        );
    }

    #[tokio::test]
    async fn test_username_free_on_not_found() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .returning(|_, _| Err(AppError::not_found("users", "username")));
        assert_eq!(username_available(&store, "Grace").await.unwrap(), "grace");
    }
}
