//! Field rules shared by the CRM wizards

use once_cell::sync::Lazy;
use regex::Regex;

use crate::form::{FieldIssue, FormData};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Digits with the usual phone formatting characters; see [`is_phone`]
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9().\-\s]{7,20}$").unwrap());

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap());

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// At least this many digits besides the formatting
const MIN_PHONE_DIGITS: usize = 7;

pub fn is_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
        && value.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}

pub fn is_url(value: &str) -> bool {
    URL_RE.is_match(value)
}

/// Collects errors and warnings for one step
#[derive(Debug, Default)]
pub struct Issues {
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
}

impl Issues {
    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldIssue::new(field, message));
    }

    pub fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(FieldIssue::new(field, message));
    }

    /// Error unless `field` holds a non-blank string
    pub fn require(&mut self, data: &FormData, field: &str, label: &str) -> Option<String> {
        match data.get_str(field).filter(|v| !v.is_empty()) {
            Some(value) => Some(value.to_string()),
            None => {
                self.error(field, format!("{label} is required"));
                None
            }
        }
    }

    /// Error if `field` is set but isn't one of `allowed`
    pub fn one_of(&mut self, data: &FormData, field: &str, label: &str, allowed: &[&str]) {
        if let Some(value) = data.get_str(field).filter(|v| !v.is_empty()) {
            if !allowed.contains(&value) {
                self.error(
                    field,
                    format!("{label} must be one of: {}", allowed.join(", ")),
                );
            }
        }
    }

    pub fn max_len(&mut self, data: &FormData, field: &str, label: &str, max: usize) {
        if data
            .get_str(field)
            .is_some_and(|v| v.chars().count() > max)
        {
            self.error(field, format!("{label} must be at most {max} characters"));
        }
    }

    pub fn email(&mut self, data: &FormData, field: &str) {
        if let Some(value) = data.get_str(field).filter(|v| !v.is_empty()) {
            if !is_email(value) {
                self.error(field, "Invalid email address");
            }
        }
    }

    pub fn phone(&mut self, data: &FormData, field: &str) {
        if let Some(value) = data.get_str(field).filter(|v| !v.is_empty()) {
            if !is_phone(value) {
                self.error(field, "Invalid phone number");
            }
        }
    }

    pub fn into_parts(self) -> (Vec<FieldIssue>, Vec<FieldIssue>) {
        (self.errors, self.warnings)
    }
}

/// Whether a boolean field is set to `true`
pub fn flag(data: &FormData, field: &str) -> bool {
    data.get(field)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email() {
        assert!(is_email("buyer@sysco.com"));
        assert!(!is_email("buyer@sysco"));
        assert!(!is_email("buyer sysco.com"));
    }

    #[test]
    fn test_phone() {
        assert!(is_phone("(512) 555-0134"));
        assert!(is_phone("+1 512.555.0134"));
        assert!(!is_phone("555"));
        assert!(!is_phone("call me maybe"));
        // Formatting alone isn't a number
        assert!(!is_phone("-------"));
        assert!(!is_phone("(  ) ..."));
        assert!(!is_phone("+(12) 3-4.5"));
        assert!(is_phone("5125550134"));
    }

    #[test]
    fn test_url() {
        assert!(is_url("https://www.gulfcoastproduce.com"));
        assert!(!is_url("www.gulfcoastproduce.com"));
    }

    #[test]
    fn test_require_trims_whitespace() {
        let mut data = FormData::new();
        data.set("name", json!("   "));
        let mut issues = Issues::default();
        assert_eq!(issues.require(&data, "name", "Name"), None);
        assert_eq!(issues.errors[0].message, "Name is required");
    }

    #[test]
    fn test_one_of_ignores_missing() {
        let mut data = FormData::new();
        let mut issues = Issues::default();
        issues.one_of(&data, "priority", "Priority", &["A", "B"]);
        assert!(issues.errors.is_empty());

        data.set("priority", json!("Z"));
        issues.one_of(&data, "priority", "Priority", &["A", "B"]);
        assert_eq!(issues.errors[0].message, "Priority must be one of: A, B");
    }

    #[test]
    fn test_flag() {
        let mut data = FormData::new();
        assert!(!flag(&data, "is_principal"));
        data.set("is_principal", json!(true));
        assert!(flag(&data, "is_principal"));
        data.set("is_principal", json!("yes"));
        assert!(!flag(&data, "is_principal"));
    }
}
