use std::collections::HashMap;
use std::sync::LazyLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::errors::AppError;

const MAX_IDENTITY_LEN: usize = 254;
const MAX_CREDENTIAL_LEN: usize = 128;

static IDENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s\p{Cc}]+$").expect("identity pattern compiles"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,
    pub error_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: HashMap<String, ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: HashMap::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str, error_type: &str) {
        self.is_valid = false;
        self.errors.insert(
            field.to_string(),
            ValidationError {
                message: message.to_string(),
                error_type: error_type.to_string(),
            },
        );
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
            self.errors.extend(other.errors);
        }
    }

    pub fn to_app_error(&self) -> AppError {
        if self.errors.is_empty() {
            return AppError::validation("Unknown validation error");
        }

        let mut messages: Vec<&str> = self.errors.values().map(|e| e.message.as_str()).collect();
        messages.sort_unstable();
        AppError::validation(messages.join(", "))
    }

    /// `Ok(())` when valid, otherwise the collected messages as an `AppError`.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.to_app_error())
        }
    }
}

pub struct PrincipalValidator;

impl PrincipalValidator {
    pub fn validate_identity(identity: &str) -> ValidationResult {
        let mut result = ValidationResult::new();

        if identity.is_empty() {
            result.add_error("identity", "Identity is required", "required");
            return result;
        }

        if identity.chars().count() > MAX_IDENTITY_LEN {
            result.add_error("identity", "Identity must not exceed 254 characters", "max_length");
        }

        if !IDENTITY_REGEX.is_match(identity) {
            result.add_error(
                "identity",
                "Identity must not contain whitespace or control characters",
                "invalid_format",
            );
        }

        result
    }

    pub fn validate_credential(credential: &str) -> ValidationResult {
        let mut result = ValidationResult::new();

        if credential.is_empty() {
            result.add_error("credential", "Credential is required", "required");
            return result;
        }

        if credential.chars().count() > MAX_CREDENTIAL_LEN {
            result.add_error("credential", "Credential must not exceed 128 characters", "max_length");
        }

        result
    }

    pub fn validate_registration(identity: &str, credential: &str) -> ValidationResult {
        let mut result = Self::validate_identity(identity);
        result.merge(Self::validate_credential(credential));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_validation() {
        assert!(PrincipalValidator::validate_identity("alice").is_valid);
        assert!(PrincipalValidator::validate_identity("alice@example.com").is_valid);

        let result = PrincipalValidator::validate_identity("");
        assert!(!result.is_valid);
        assert_eq!(result.errors["identity"].error_type, "required");

        let result = PrincipalValidator::validate_identity("al ice");
        assert_eq!(result.errors["identity"].error_type, "invalid_format");

        let result = PrincipalValidator::validate_identity("bad\u{0007}bell");
        assert_eq!(result.errors["identity"].error_type, "invalid_format");

        let result = PrincipalValidator::validate_identity(&"a".repeat(255));
        assert_eq!(result.errors["identity"].error_type, "max_length");
    }

    #[test]
    fn test_credential_validation() {
        // Short credentials are accepted; strength policy is not enforced here
        assert!(PrincipalValidator::validate_credential("pw1").is_valid);

        let result = PrincipalValidator::validate_credential("");
        assert_eq!(result.errors["credential"].error_type, "required");

        let result = PrincipalValidator::validate_credential(&"x".repeat(129));
        assert_eq!(result.errors["credential"].error_type, "max_length");
    }

    #[test]
    fn test_registration_merges_fields() {
        let result = PrincipalValidator::validate_registration("", "");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert!(matches!(result.into_result(), Err(AppError::ValidationError(_))));
    }
}
