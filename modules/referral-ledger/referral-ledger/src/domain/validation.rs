use referral_ledger_sdk::UserProfile;
use rust_decimal::Decimal;

use super::error::DomainError;

pub const MAX_NAMESPACE_LENGTH: usize = 128;
/// Telegram caps display names at 64 characters.
pub const MAX_PROFILE_FIELD_LENGTH: usize = 64;

/// Settings namespaces are short identifiers such as `bot.rewards` or `admin_roles`.
pub fn validate_namespace(namespace: &str) -> Result<(), DomainError> {
    if namespace.is_empty() {
        return Err(DomainError::validation("namespace", "must not be empty"));
    }
    if namespace.len() > MAX_NAMESPACE_LENGTH {
        return Err(DomainError::validation(
            "namespace",
            format!("exceeds maximum length of {MAX_NAMESPACE_LENGTH}"),
        ));
    }
    if let Some(bad) = namespace
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '/' | '-')))
    {
        return Err(DomainError::validation(
            "namespace",
            format!("contains unsupported character '{bad}'"),
        ));
    }
    Ok(())
}

/// Ledger amounts are strictly positive.
pub fn validate_amount(amount: Decimal) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::InvalidAmount { amount });
    }
    Ok(())
}

/// Display fields are optional but bounded.
pub fn validate_profile(profile: &UserProfile) -> Result<(), DomainError> {
    let fields = [
        ("username", &profile.username),
        ("first_name", &profile.first_name),
        ("last_name", &profile.last_name),
    ];
    for (field, value) in fields {
        if let Some(value) = value
            && value.chars().count() > MAX_PROFILE_FIELD_LENGTH
        {
            return Err(DomainError::validation(
                field,
                format!("exceeds maximum length of {MAX_PROFILE_FIELD_LENGTH}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dotted_and_slashed_namespaces() {
        for ns in ["bot.rewards", "admin_roles", "payouts/v2", "tier:gold", "a-b"] {
            assert_eq!(validate_namespace(ns), Ok(()), "{ns}");
        }
    }

    #[test]
    fn rejects_empty_long_and_spaced_namespaces() {
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace(&"n".repeat(MAX_NAMESPACE_LENGTH + 1)).is_err());
        assert!(validate_namespace("has space").is_err());
    }

    #[test]
    fn profile_fields_are_bounded() {
        let mut profile = UserProfile {
            username: Some("alice".to_owned()),
            first_name: Some("\u{410}".repeat(MAX_PROFILE_FIELD_LENGTH)),
            last_name: None,
        };
        assert_eq!(validate_profile(&profile), Ok(()));

        profile.last_name = Some("x".repeat(MAX_PROFILE_FIELD_LENGTH + 1));
        assert!(matches!(
            validate_profile(&profile),
            Err(DomainError::Validation { ref field, .. }) if field == "last_name"
        ));
    }

    #[test]
    fn amount_must_be_positive() {
        assert_eq!(validate_amount(Decimal::new(1, 2)), Ok(()));
        assert_eq!(
            validate_amount(Decimal::ZERO),
            Err(DomainError::InvalidAmount {
                amount: Decimal::ZERO
            })
        );
        assert!(validate_amount(Decimal::new(-5, 0)).is_err());
    }
}
