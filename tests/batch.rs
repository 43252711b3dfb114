mod common;

use common::{API, Part, api_path, batch_template, client, client_with_batch_size};
use dataverse_api::api::batch::{create_commands, delete_commands};
use dataverse_api::{BatchCommand, BatchOptions, DataverseError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer};

fn rows(names: &[&str]) -> Vec<serde_json::Map<String, serde_json::Value>> {
    names
        .iter()
        .map(|name| json!({"name": name}).as_object().cloned().unwrap())
        .collect()
}

#[tokio::test]
async fn test_batch_sends_multipart_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api_path("$batch")))
        .and(header("If-None-Match", "null"))
        .and(header_exists("Content-Type"))
        .respond_with(batch_template(&[
            Part::created(&format!("{}{}/accounts(00000000-0000-0000-0000-000000000001)", server.uri(), API)),
            Part::json(200, json!({"name": "Fabrikam"})),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let commands = vec![
        BatchCommand::post("accounts", json!({"name": "Contoso"})),
        BatchCommand::get("accounts(00000000-0000-0000-0000-000000000002)?$select=name"),
    ];
    let items = client(&server)
        .batch(commands, BatchOptions::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.is_success));
    assert_eq!(
        items[0].header("odata-entityid"),
        Some(format!("{}{}/accounts(00000000-0000-0000-0000-000000000001)", server.uri(), API).as_str())
    );
    assert_eq!(items[1].json().unwrap()["name"], "Fabrikam");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/mixed; boundary="));
    assert!(body.contains(&format!("POST {}{}/accounts HTTP/1.1", server.uri(), API)));
    assert!(body.contains(r#"{"name":"Contoso"}"#));
    assert!(body.contains("Content-Type: application/json"));
    assert!(!body.contains("Content-ID"));
    assert!(body.trim_end().ends_with("--"));
}

#[tokio::test]
async fn test_transactional_batch_uses_changeset() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api_path("$batch")))
        .and(body_string_contains("Content-ID: 1"))
        .and(body_string_contains("Content-ID: 2"))
        .and(body_string_contains("boundary=\"changeset_"))
        .respond_with(batch_template(&[Part::no_content(), Part::no_content()]))
        .expect(1)
        .mount(&server)
        .await;

    let commands = delete_commands(
        "accounts",
        &[
            "00000000-0000-0000-0000-000000000001".to_string(),
            "00000000-0000-0000-0000-000000000002".to_string(),
        ],
        None,
    );
    let items = client(&server)
        .batch(commands, BatchOptions::transactional())
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_continue_on_error_returns_failed_items() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api_path("$batch")))
        .and(header("Prefer", "odata.continue-on-error"))
        .respond_with(batch_template(&[
            Part::json(
                400,
                json!({"error": {"code": "0x80040237", "message": "A record with matching key values already exists."}}),
            ),
            Part::no_content(),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let items = client(&server)
        .batch(create_commands("accounts", &rows(&["A", "B"])), BatchOptions::continue_on_error())
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert!(!items[0].is_success);
    assert_eq!(items[0].status_code, 400);
    assert!(
        items[0]
            .error_message()
            .unwrap()
            .contains("matching key values already exists")
    );
    assert!(items[1].is_success);
}

#[tokio::test]
async fn test_batch_is_chunked_by_batch_size() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api_path("$batch")))
        .respond_with(batch_template(&[Part::no_content(), Part::no_content()]))
        .expect(2)
        .mount(&server)
        .await;

    let items = client_with_batch_size(&server, 2)
        .batch(create_commands("accounts", &rows(&["A", "B", "C", "D"])), BatchOptions::default())
        .await
        .unwrap();
    assert_eq!(items.len(), 4);
}

#[tokio::test]
async fn test_content_id_reference_must_stay_in_its_chunk() {
    let server = MockServer::start().await;

    let mut commands = create_commands("accounts", &rows(&["A", "B"]));
    commands.push(BatchCommand::post(
        "$1/contact_customer_accounts",
        json!({"lastname": "Lovelace"}),
    ));

    let err = client_with_batch_size(&server, 2)
        .batch(commands, BatchOptions::transactional())
        .await
        .unwrap_err();
    assert!(matches!(err, DataverseError::Validation(_)));
    assert!(err.to_string().contains("batch request 2"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_content_id_reference_needs_transaction() {
    let server = MockServer::start().await;

    let mut commands = create_commands("accounts", &rows(&["A"]));
    commands.push(BatchCommand::post("$1/contact_customer_accounts", json!({"lastname": "Lovelace"})));

    let err = client(&server)
        .batch(commands, BatchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DataverseError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_batch_sends_nothing() {
    let server = MockServer::start().await;

    let items = client(&server)
        .batch(Vec::new(), BatchOptions::default())
        .await
        .unwrap();
    assert!(items.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_batch_request_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api_path("$batch")))
        .respond_with(
            wiremock::ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"code": "0x0", "message": "The batch body is malformed."}})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .batch(create_commands("accounts", &rows(&["A"])), BatchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("malformed"));
}
