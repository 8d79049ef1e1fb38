//! HTTP-level tests for `ApiClient` against a mock server

#![allow(clippy::unwrap_used)]

use serde_json::json;
use tour_desk_client::{
    ApiClient, ApiError, CancellationPolicyForm, ContactForm, NewContact, NewVendorTourLink,
    PolicyStatus, TicketApi,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_tickets_are_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tickets"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "vendorId": 10, "tourId": 20, "productName": "Harbor Walk", "listingType": "new_listing"},
            {"id": 2, "vendorId": 11, "tourId": 21, "productName": "Night Safari", "listingType": "multi_variant"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let tickets = client.tickets().await.unwrap();

    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[1].product_name, "Night Safari");
}

#[tokio::test]
async fn test_pair_lookups_send_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cancellationPolicy"))
        .and(query_param("vendorId", "10"))
        .and(query_param("tourId", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "vendorId": 10, "tourId": 20, "status": "ACTIVE", "cancellationBeforeMinutes": 0}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vendorTours"))
        .and(query_param("vendorId", "10"))
        .and(query_param("tourId", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let policies = client.cancellation_policies_for(10, 20).await.unwrap();
    let links = client.vendor_tours_for(10, 20).await.unwrap();

    assert_eq!(policies[0].cancellation_before_minutes, Some(0));
    assert!(links.is_empty());
}

#[tokio::test]
async fn test_update_uses_put_with_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/cancellationPolicy/5"))
        .and(body_json(json!({"status": "INACTIVE", "cancellationBeforeMinutes": 30})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"id": 5, "vendorId": 10, "tourId": 20, "status": "INACTIVE", "cancellationBeforeMinutes": 30}
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let form = CancellationPolicyForm {
        status: PolicyStatus::Inactive,
        cancellation_before_minutes: Some(30),
    };
    let updated = client.update_cancellation_policy(5, form).await.unwrap();

    assert_eq!(updated.status, PolicyStatus::Inactive);
}

#[tokio::test]
async fn test_create_uses_post_with_pair() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contact"))
        .and(body_json(json!({
            "vendorId": 10, "tourId": 20, "phone": "5551234567", "email": "ops@example.com"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!(
            {"id": 9, "vendorId": 10, "tourId": 20, "phone": "5551234567", "email": "ops@example.com"}
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let form = ContactForm {
        phone: "5551234567".to_string(),
        email: "ops@example.com".to_string(),
    };
    let created = client
        .create_contact(NewContact::from_form(10, 20, &form))
        .await
        .unwrap();

    assert_eq!(created.id, 9);
}

#[tokio::test]
async fn test_update_contact_body_is_form_only() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/contact/3"))
        .and(body_json(json!({"phone": "5551234567", "email": "a@b.co"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"id": 3, "vendorId": 1, "tourId": 2, "phone": "5551234567", "email": "a@b.co"}
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let form = ContactForm {
        phone: "5551234567".to_string(),
        email: "a@b.co".to_string(),
    };

    assert!(client.update_contact(3, form).await.is_ok());
}

#[tokio::test]
async fn test_link_created_at_sent_as_iso8601() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vendorTours"))
        .and(body_json(json!({
            "vendorId": 1, "tourId": 2, "createdAt": "2025-01-01T00:00:00Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!(
            {"id": 7, "vendorId": 1, "tourId": 2, "createdAt": "2025-01-01T00:00:00Z"}
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let created_at = chrono::DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let link = client
        .create_vendor_tour(NewVendorTourLink {
            vendor_id: 1,
            tour_id: 2,
            created_at,
        })
        .await
        .unwrap();

    assert_eq!(link.id, 7);
}

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tickets/99"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Ticket not found"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let error = client.ticket(99).await.unwrap_err();

    assert_eq!(error.status(), Some(404));
    assert_eq!(error.to_string(), "Ticket not found");
}

#[tokio::test]
async fn test_error_without_body_uses_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tours"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let error = client.tours().await.unwrap_err();

    assert_eq!(
        error,
        ApiError::Http {
            status: 500,
            message: "API Error: 500 Internal Server Error".to_string(),
        }
    );
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vendors"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let error = client.vendors().await.unwrap_err();

    assert!(matches!(error, ApiError::Decode { .. }));
    assert!(error.message().starts_with("Invalid response body"));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = ApiClient::new(uri);
    let error = client.contacts().await.unwrap_err();

    assert_eq!(error.status(), None);
    assert!(error.message().starts_with("Network error: "));
}
