//! Contact creation wizard

use anyhow::Result;
use async_trait::async_trait;

use super::fields::Issues;
use crate::form::{FormData, FormStep, StepValidationResult, StepValidator};

pub const PURCHASE_INFLUENCE: &[&str] = &["High", "Medium", "Low", "Unknown"];

pub const DECISION_AUTHORITY: &[&str] =
    &["Decision Maker", "Influencer", "End User", "Gatekeeper"];

struct Identity;

#[async_trait]
impl StepValidator for Identity {
    async fn validate(&self, data: &FormData) -> Result<StepValidationResult> {
        let mut issues = Issues::default();
        issues.require(data, "first_name", "First name");
        issues.require(data, "last_name", "Last name");
        let (errors, warnings) = issues.into_parts();
        Ok(StepValidationResult::from_issues(errors, warnings))
    }
}

struct Reach;

#[async_trait]
impl StepValidator for Reach {
    async fn validate(&self, data: &FormData) -> Result<StepValidationResult> {
        let mut issues = Issues::default();
        let has_email = data.get_str("email").is_some_and(|v| !v.is_empty());
        let has_phone = data.get_str("phone").is_some_and(|v| !v.is_empty());
        if !has_email && !has_phone {
            issues.error("email", "Provide an email address or a phone number");
        }
        issues.email(data, "email");
        issues.phone(data, "phone");
        let (errors, warnings) = issues.into_parts();
        Ok(StepValidationResult::from_issues(errors, warnings))
    }
}

struct Role;

#[async_trait]
impl StepValidator for Role {
    async fn validate(&self, data: &FormData) -> Result<StepValidationResult> {
        let mut issues = Issues::default();
        issues.one_of(
            data,
            "purchase_influence",
            "Purchase influence",
            PURCHASE_INFLUENCE,
        );
        issues.one_of(
            data,
            "decision_authority",
            "Decision authority",
            DECISION_AUTHORITY,
        );
        if data.get_str("organization_id").is_none_or(str::is_empty) {
            issues.warn("organization_id", "Contact is not linked to an organization");
        }
        let (errors, warnings) = issues.into_parts();
        Ok(StepValidationResult::from_issues(errors, warnings))
    }
}

pub fn steps() -> Vec<FormStep> {
    vec![
        FormStep::new("identity", "Identity")
            .description("Who the contact is")
            .icon("user")
            .required(true)
            .watch(["first_name", "last_name"])
            .validator(Identity),
        FormStep::new("reach", "Reach")
            .description("Email and phone")
            .icon("mail")
            .required(true)
            .watch(["email", "phone"])
            .validator(Reach),
        FormStep::new("role", "Role")
            .description("Organization, position and buying influence")
            .icon("badge")
            .watch([
                "organization_id",
                "position",
                "purchase_influence",
                "decision_authority",
            ])
            .validator(Role),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_reach_needs_email_or_phone() {
        let result = Reach.validate(&FormData::new()).await.unwrap();
        assert!(!result.is_valid);

        let mut data = FormData::new();
        data.set("phone", json!("512-555-0188"));
        assert!(Reach.validate(&data).await.unwrap().is_valid);
    }

    #[tokio::test]
    async fn test_role_warns_without_organization() {
        let mut data = FormData::new();
        data.set("purchase_influence", json!("High"));
        let result = Role.validate(&data).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.warnings[0].field, "organization_id");

        data.set("decision_authority", json!("Boss"));
        assert!(!Role.validate(&data).await.unwrap().is_valid);
    }

    #[tokio::test]
    async fn test_identity() {
        let mut data = FormData::new();
        data.set("first_name", json!("Maria"));
        let result = Identity.validate(&data).await.unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Last name is required");
    }
}
