//! Built-in wizards for the brokerage CRM resources

pub mod contact;
pub mod fields;
pub mod organization;

use crate::form::FormStep;

/// Names accepted by [`wizard`]
pub const WIZARDS: &[&str] = &["organization", "contact"];

/// Step registry for a built-in wizard
pub fn wizard(name: &str) -> Option<Vec<FormStep>> {
    match name {
        "organization" => Some(organization::steps()),
        "contact" => Some(contact::steps()),
        _ => None,
    }
}
