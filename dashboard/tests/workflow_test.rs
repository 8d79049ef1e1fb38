//! End-to-end ticket workflows against the in-memory API

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;
use tour_desk::forms::{ContactField, ContactFormState, PolicyFormState};
use tour_desk::{
    Config, LinkBackend, PanelView, SetupMode, SetupPhase, TicketWorkflow, TourDeskApp,
};
use tour_desk_client::{ApiError, ListingType, PolicyStatus, VendorTourLink};
use tour_desk_testing::mocks::{ApiCall, Endpoint, MockTicketApi};
use tour_desk_testing::{fixtures, helpers, test_clock};

fn config() -> Config {
    Config {
        wait_timeout_secs: 5,
        ..Config::default()
    }
}

fn app(api: &MockTicketApi, config: &Config) -> TourDeskApp {
    helpers::init_test_tracing();
    TourDeskApp::with_api(config, Arc::new(api.clone()), Arc::new(test_clock()))
}

fn seeded() -> MockTicketApi {
    MockTicketApi::new()
        .with_vendor(fixtures::vendor(10, "Acme Tours"))
        .with_tour(fixtures::tour(20, "Old Town Walk"))
        .with_ticket(fixtures::ticket(1, 10, 20, ListingType::NewListing))
        .with_ticket(fixtures::ticket(2, 10, 20, ListingType::MultiVariant))
}

#[tokio::test]
async fn test_new_listing_without_records_offers_default_forms() {
    let api = seeded();
    let app = app(&api, &config());
    app.refresh_tickets().await;

    let opened = app.open_ticket(1).await.unwrap();
    let TicketWorkflow::NewListing(workflow) = &opened.workflow else {
        panic!("expected the new listing workflow");
    };

    let PanelView::Ready { form: mut policy, saving, save_error } = workflow.policy_panel().await
    else {
        panic!("policy panel should be ready");
    };
    assert!(!saving);
    assert_eq!(save_error, None);
    assert_eq!(policy.status(), "ACTIVE");
    assert_eq!(policy.minutes(), "");
    assert_eq!(
        workflow.contact_panel().await,
        PanelView::Ready {
            form: ContactFormState::default(),
            saving: false,
            save_error: None,
        }
    );

    policy.set_status("INACTIVE");
    policy.set_minutes("30");
    assert_eq!(workflow.submit_policy(&mut policy).await, Ok(true));

    let state = workflow.policy_state().await;
    let held = state.policy().unwrap();
    assert_eq!(held.status, PolicyStatus::Inactive);
    assert_eq!(held.cancellation_before_minutes, Some(30));
    assert_eq!((held.vendor_id, held.tour_id), (10, 20));
    assert_eq!(api.call_count(Endpoint::CreateCancellationPolicy), 1);
    assert_eq!(api.call_count(Endpoint::UpdateCancellationPolicy), 0);

    let PanelView::Ready { form, .. } = workflow.policy_panel().await else {
        panic!("policy panel should stay ready");
    };
    assert_eq!(form, PolicyFormState::from_policy(Some(held)));

    opened.close().await;
    app.shutdown().await;
}

#[tokio::test]
async fn test_second_save_updates_the_created_record() {
    let api = seeded();
    let app = app(&api, &config());
    let opened = app.open_ticket(1).await.unwrap();
    let TicketWorkflow::NewListing(workflow) = &opened.workflow else {
        panic!("expected the new listing workflow");
    };

    let mut contact = ContactFormState::default();
    contact.set_phone("+351 912 345 678");
    contact.set_email("desk@example.com");
    assert_eq!(workflow.submit_contact(&mut contact).await, Ok(true));

    contact.set_email("bookings@example.com");
    assert_eq!(workflow.submit_contact(&mut contact).await, Ok(true));

    let created = api.contacts();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].email, "bookings@example.com");
    assert!(api
        .calls()
        .iter()
        .any(|call| matches!(call, ApiCall::UpdateContact(id, _) if *id == created[0].id)));

    let messages: Vec<_> = app
        .alert_broker()
        .alerts()
        .await
        .into_iter()
        .map(|alert| alert.message)
        .collect();
    assert_eq!(
        messages,
        vec![
            "Contact information created successfully",
            "Contact information updated successfully"
        ]
    );
}

#[tokio::test]
async fn test_invalid_contact_never_reaches_the_api() {
    let api = seeded();
    let app = app(&api, &config());
    let opened = app.open_ticket(1).await.unwrap();
    let TicketWorkflow::NewListing(workflow) = &opened.workflow else {
        panic!("expected the new listing workflow");
    };

    let mut contact = ContactFormState::default();
    contact.set_phone("12345");
    contact.set_email("user@");
    let errors = workflow.submit_contact(&mut contact).await.unwrap_err();

    assert_eq!(errors.get(ContactField::Email), Some("Please enter a valid email address"));
    assert_eq!(errors.get(ContactField::Phone), Some("Please enter a valid phone number"));
    assert_eq!(api.call_count(Endpoint::CreateContact), 0);
    assert_eq!(api.call_count(Endpoint::UpdateContact), 0);
}

#[tokio::test]
async fn test_failed_fetch_offers_retry() {
    let api = seeded().failing(Endpoint::CancellationPolicies, ApiError::network("offline"));
    let app = app(&api, &config());
    let opened = app.open_ticket(1).await.unwrap();
    let TicketWorkflow::NewListing(workflow) = &opened.workflow else {
        panic!("expected the new listing workflow");
    };

    assert_eq!(
        workflow.policy_panel().await,
        PanelView::Failed {
            message: "Failed to load cancellation policy: Network error: offline".to_string()
        }
    );

    api.recover(Endpoint::CancellationPolicies);
    workflow.retry_policy().await;
    assert!(matches!(workflow.policy_panel().await, PanelView::Ready { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_multi_variant_setup_makes_no_calls() {
    let api = seeded();
    let app = app(&api, &config());
    app.refresh_tickets().await;
    let before = api.calls().len();

    let opened = app.open_ticket(2).await.unwrap();
    let TicketWorkflow::MultiVariant(workflow) = &opened.workflow else {
        panic!("expected the multi variant workflow");
    };
    assert_eq!(workflow.phase().await, SetupPhase::Required);
    assert!(workflow.forms().await.is_none());

    workflow.begin_setup().await;
    assert_eq!(workflow.phase().await, SetupPhase::InProgress);
    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert_eq!(workflow.phase().await, SetupPhase::Complete);

    let (mut policy, mut contact) = workflow.forms().await.unwrap();
    policy.set_minutes("45");
    contact.set_phone("0123456789");
    contact.set_email("ops@example.com");
    assert_eq!(workflow.submit_policy(&mut policy), Ok(true));
    assert_eq!(workflow.submit_contact(&mut contact), Ok(true));

    assert_eq!(api.calls().len(), before);
    assert!(opened.detail().await.to_string().contains("Setup Complete"));
}

#[tokio::test(start_paused = true)]
async fn test_reopening_resets_setup() {
    let api = seeded();
    let app = app(&api, &config());

    let first = app.open_ticket(2).await.unwrap();
    if let TicketWorkflow::MultiVariant(workflow) = &first.workflow {
        assert_eq!(workflow.run_setup().await, SetupPhase::Complete);
    }
    first.close().await;

    let second = app.open_ticket(2).await.unwrap();
    let TicketWorkflow::MultiVariant(workflow) = &second.workflow else {
        panic!("expected the multi variant workflow");
    };
    assert_eq!(workflow.phase().await, SetupPhase::Required);
}

#[tokio::test]
async fn test_linked_setup_creates_local_link_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        link_backend: LinkBackend::Local,
        setup_mode: SetupMode::Linked,
        storage_path: dir.path().join("storage.json"),
        ..config()
    };
    let api = seeded();
    let app = app(&api, &config);

    for _ in 0..2 {
        let opened = app.open_ticket(2).await.unwrap();
        let TicketWorkflow::MultiVariant(workflow) = &opened.workflow else {
            panic!("expected the multi variant workflow");
        };
        assert_eq!(workflow.run_setup().await, SetupPhase::Complete);
    }

    let link = app.vendor_tour_link(10, 20).await;
    let held = link.state(|s| s.link().cloned()).await.unwrap();
    assert_eq!((held.vendor_id, held.tour_id), (10, 20));

    let stored = std::fs::read_to_string(dir.path().join("storage.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    let links: Vec<VendorTourLink> =
        serde_json::from_str(stored["vendorTours"].as_str().unwrap()).unwrap();
    assert_eq!(links, vec![held]);
    assert_eq!(api.call_count(Endpoint::CreateVendorTour), 0);
}

#[tokio::test]
async fn test_unknown_ticket_is_an_error() {
    let api = seeded();
    let app = app(&api, &config());

    let error = app.open_ticket(99).await.unwrap_err();
    assert_eq!(error.to_string(), "Failed to load ticket 99: API Error: 404 Not Found");
}
