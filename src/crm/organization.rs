//! Organization onboarding wizard.
//!
//! Organizations are the customers, principals and distributors the
//! brokerage works with.

use anyhow::Result;
use async_trait::async_trait;

use super::fields::{flag, is_url, Issues};
use crate::form::{FormData, FormStep, StepValidationResult, StepValidator};

/// Account priority tiers, A being the most important
pub const PRIORITIES: &[&str] = &["A", "B", "C", "D"];

const NAME_MAX: usize = 255;
const NOTES_SOFT_MAX: usize = 500;

struct BasicInfo;

#[async_trait]
impl StepValidator for BasicInfo {
    async fn validate(&self, data: &FormData) -> Result<StepValidationResult> {
        let mut issues = Issues::default();
        issues.require(data, "name", "Organization name");
        issues.max_len(data, "name", "Organization name", NAME_MAX);
        if issues.require(data, "priority", "Priority").is_some() {
            issues.one_of(data, "priority", "Priority", PRIORITIES);
        }
        issues.require(data, "segment", "Segment");

        let (errors, warnings) = issues.into_parts();
        Ok(StepValidationResult::from_issues(errors, warnings))
    }
}

struct ContactDetails;

#[async_trait]
impl StepValidator for ContactDetails {
    async fn validate(&self, data: &FormData) -> Result<StepValidationResult> {
        let mut issues = Issues::default();
        issues.email(data, "email");
        issues.phone(data, "phone");
        if let Some(website) = data.get_str("website").filter(|w| !w.is_empty()) {
            if !is_url(website) {
                issues.warn("website", "Website should start with http:// or https://");
            }
        }

        let (errors, warnings) = issues.into_parts();
        Ok(StepValidationResult::from_issues(errors, warnings))
    }
}

struct BusinessDetails;

#[async_trait]
impl StepValidator for BusinessDetails {
    async fn validate(&self, data: &FormData) -> Result<StepValidationResult> {
        let mut issues = Issues::default();
        if flag(data, "is_principal") && flag(data, "is_distributor") {
            issues.error(
                "is_distributor",
                "An organization cannot be both a principal and a distributor",
            );
        }
        if data
            .get_str("notes")
            .is_some_and(|n| n.chars().count() > NOTES_SOFT_MAX)
        {
            issues.warn(
                "notes",
                format!("Notes are longer than {NOTES_SOFT_MAX} characters"),
            );
        }

        let (errors, warnings) = issues.into_parts();
        Ok(StepValidationResult::from_issues(errors, warnings))
    }
}

pub fn steps() -> Vec<FormStep> {
    vec![
        FormStep::new("basic", "Basic Information")
            .description("Name, priority and market segment")
            .icon("building")
            .required(true)
            .watch(["name", "priority", "segment"])
            .validator(BasicInfo),
        FormStep::new("contact", "Contact Details")
            .description("How to reach the organization")
            .icon("phone")
            .required(true)
            .watch(["email", "phone", "website"])
            .validator(ContactDetails),
        FormStep::new("business", "Business Details")
            .description("Address, relationship type and notes")
            .icon("briefcase")
            .watch(["address", "notes", "is_principal", "is_distributor"])
            .validator(BusinessDetails),
    ]
}
