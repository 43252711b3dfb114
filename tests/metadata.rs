mod common;

use common::{API, api_path, client};
use dataverse_api::metadata::{AttributeMetadata, AttributeRequiredLevel, define_alternate_key};
use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn created(server: &MockServer, set: &str, id: &str) -> ResponseTemplate {
    ResponseTemplate::new(204).insert_header(
        "OData-EntityId",
        format!("{}{}/{}({})", server.uri(), API, set, id).as_str(),
    )
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    serde_json::from_slice(&requests.last().unwrap().body).unwrap()
}

#[tokio::test]
async fn test_create_attribute_on_table() {
    let server = MockServer::start().await;
    let id = "00000000-0000-0000-0000-0000000000c1";

    Mock::given(method("POST"))
        .and(path(api_path("EntityDefinitions(LogicalName='new_project')/Attributes")))
        .and(header("MSCRM.SolutionName", "Core"))
        .respond_with(created(&server, "Attributes", id))
        .expect(1)
        .mount(&server)
        .await;

    let attribute = AttributeMetadata::integer("new_Budget", 0, 100000)
        .with_display_name("Budget")
        .with_required_level(AttributeRequiredLevel::ApplicationRequired);

    let created_id = client(&server)
        .create_attribute("new_project", &attribute, Some("Core"))
        .await
        .unwrap();
    assert_eq!(created_id, id);

    let body = last_body(&server).await;
    assert_eq!(body["@odata.type"], "Microsoft.Dynamics.CRM.IntegerAttributeMetadata");
    assert_eq!(body["AttributeType"], "Integer");
    assert_eq!(body["AttributeTypeName"]["Value"], "IntegerType");
    assert_eq!(body["SchemaName"], "new_Budget");
    assert_eq!(body["MaxValue"], 100000);
    assert_eq!(body["RequiredLevel"]["Value"], "ApplicationRequired");
    assert_eq!(body["DisplayName"]["LocalizedLabels"][0]["Label"], "Budget");
}

#[tokio::test]
async fn test_create_alternate_key() {
    let server = MockServer::start().await;
    let id = "00000000-0000-0000-0000-0000000000c2";

    Mock::given(method("POST"))
        .and(path(api_path("EntityDefinitions(LogicalName='new_project')/Keys")))
        .respond_with(created(&server, "EntityKeys", id))
        .expect(1)
        .mount(&server)
        .await;

    let key = define_alternate_key("new_ProjectCode", "Project code", ["new_code", "new_year", "new_code"]).unwrap();
    let created_id = client(&server)
        .create_alternate_key("new_project", &key)
        .await
        .unwrap();
    assert_eq!(created_id, id);

    let body = last_body(&server).await;
    assert_eq!(body["SchemaName"], "new_ProjectCode");
    assert_eq!(body["KeyAttributes"], serde_json::json!(["new_code", "new_year"]));
}

#[tokio::test]
async fn test_delete_relationship() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(api_path("RelationshipDefinitions(SchemaName='new_account_project')")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_relationship("new_account_project")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_metadata_errors_surface_dataverse_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api_path("EntityDefinitions(LogicalName='new_project')/Attributes")))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {
                "code": "0x80044363",
                "message": "An attribute with the specified name new_budget already exists."
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_attribute("new_project", &AttributeMetadata::string("new_Budget"), None)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("already exists"));
}
