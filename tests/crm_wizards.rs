//! End-to-end runs of the built-in CRM wizards

use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::json;

use crm_forms::crm;
use crm_forms::form::{save_fn, FormData, FormOptions, MultiStepForm, SubmitOutcome};

#[derive(Debug, Deserialize, PartialEq)]
struct Organization {
    name: String,
    priority: String,
    segment: String,
    email: Option<String>,
    is_principal: Option<bool>,
}

#[tokio::test]
async fn test_organization_wizard_end_to_end() {
    let saved = Arc::new(Mutex::new(None));
    let sink = saved.clone();
    let on_save = save_fn(move |data: FormData| {
        let sink = sink.clone();
        async move {
            *sink.lock().unwrap() = Some(data.to_typed::<Organization>()?);
            Ok(())
        }
    });

    let form = MultiStepForm::new(
        crm::wizard("organization").unwrap(),
        FormData::new(),
        on_save,
        FormOptions::default(),
    )
    .unwrap();

    // Step 1 with a bad priority
    form.set_field("name", json!("Gulf Coast Produce"));
    form.set_field("priority", json!("E"));
    form.set_field("segment", json!("Produce"));
    assert!(!form.validate_step(0).await);
    assert!(form.validation_errors().contains_key("priority"));

    form.set_field("priority", json!("A"));
    assert!(form.validate_step(0).await);
    assert!(form.next_step());

    // Step 2: a bad email blocks, a scheme-less website only warns
    form.set_field("email", json!("orders@gulfcoast"));
    form.set_field("website", json!("gulfcoastproduce.com"));
    assert!(!form.validate_step(1).await);

    form.set_field("email", json!("orders@gulfcoastproduce.com"));
    assert!(form.validate_step(1).await);
    let contact = form.step_state(1).unwrap();
    assert_eq!(contact.warning_count, 1);
    assert!(contact.completed);

    // Optional step 3 untouched: still submittable
    form.set_field("is_principal", json!(true));
    assert_eq!(form.submit_form().await.unwrap(), SubmitOutcome::Saved);

    let saved = saved.lock().unwrap();
    assert_eq!(
        saved.as_ref().unwrap(),
        &Organization {
            name: "Gulf Coast Produce".into(),
            priority: "A".into(),
            segment: "Produce".into(),
            email: Some("orders@gulfcoastproduce.com".into()),
            is_principal: Some(true),
        }
    );
}

#[tokio::test]
async fn test_contact_wizard_requires_reach() {
    let form = MultiStepForm::new(
        crm::wizard("contact").unwrap(),
        FormData::new(),
        crm_forms::form::DiscardSave,
        FormOptions::default(),
    )
    .unwrap();

    form.update_form_data(
        serde_json::from_value(json!({"first_name": "Maria", "last_name": "Lopez"})).unwrap(),
    );
    assert!(!form.validate_all_steps().await);
    assert!(!form.step_state(1).unwrap().is_valid);
    assert_eq!(form.submit_form().await.unwrap(), SubmitOutcome::Blocked);

    form.set_field("phone", json!("(713) 555-0100"));
    assert!(form.validate_all_steps().await);
    // Role step warns about the missing organization link but doesn't block
    assert_eq!(form.step_state(2).unwrap().warning_count, 1);
    assert_eq!(form.submit_form().await.unwrap(), SubmitOutcome::Saved);
}
