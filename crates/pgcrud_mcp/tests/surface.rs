//! Agent-surface behavior that needs no live database: discovery tools,
//! resources, prompts and the session lifecycle, all running over a lazy
//! pool and a hand-built model.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use pgcrud_auth::{Access, TokenClaims};
use pgcrud_core::{Gateway, GatewayConfig};
use pgcrud_mcp::proto::{methods, JsonRpcRequest, RequestId, JSONRPC_VERSION};
use pgcrud_mcp::McpService;
use pgcrud_schema::{Column, Entity, SchemaModel};

fn column(name: &str, tag: &str, ordinal: i32) -> Column {
    Column {
        name: name.to_string(),
        sql_type_tag: tag.to_string(),
        declared_type: tag.to_string(),
        nullable: true,
        has_default: false,
        default_text: None,
        max_text_length: None,
        ordinal_position: ordinal,
    }
}

fn model() -> SchemaModel {
    let users = Entity {
        namespace: "public".into(),
        name: "users".into(),
        columns: vec![
            column("id", "int4", 1),
            column("name", "text", 2),
            column("email", "text", 3),
        ],
        primary_key: vec!["id".into()],
        foreign_keys: Vec::new(),
    };
    let metrics = Entity {
        namespace: "reporting".into(),
        name: "metrics".into(),
        columns: vec![column("day", "date", 1), column("value", "numeric", 2)],
        primary_key: vec!["day".into()],
        foreign_keys: Vec::new(),
    };
    SchemaModel::new(
        vec![users, metrics],
        vec!["public".into(), "reporting".into()],
    )
    .unwrap()
}

fn service() -> McpService {
    // Lazy pool: no connection is made unless a query runs.
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap();
    let gateway = Gateway::from_parts(
        Arc::new(model()),
        Arc::new(GatewayConfig::default()),
        pool,
        None,
    );
    McpService::new(gateway)
}

fn scoped_public() -> TokenClaims {
    let mut grants = BTreeMap::new();
    grants.insert("public".to_string(), Access::ReadWrite);
    TokenClaims::Scoped(grants)
}

fn request(method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: Some(RequestId::Number(1)),
        method: method.to_string(),
        params: Some(params),
    }
}

fn result_of(response: pgcrud_mcp::proto::JsonRpcResponse) -> Value {
    assert!(response.error.is_none(), "unexpected error: {response:?}");
    response.result.unwrap()
}

fn tool_payload(result: &Value) -> Value {
    // Tool results carry their JSON as a text content block.
    let text = result["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn initialize_creates_session_bound_to_claims() {
    let service = service();
    let (session, response) =
        service.initialize(scoped_public(), request(methods::INITIALIZE, json!({})));

    assert_eq!(service.sessions().len(), 1);
    assert_eq!(session.claims, scoped_public());

    let result = result_of(response);
    assert_eq!(result["serverInfo"]["name"], "pgcrud");
    assert!(result["capabilities"]["tools"].is_object());

    assert!(service.sessions().remove(&session.id));
    assert!(service.sessions().is_empty());
}

#[tokio::test]
async fn tools_list_exposes_full_schemas() {
    let service = service();
    let (session, _) = service.initialize(TokenClaims::FullAccess, request(methods::INITIALIZE, json!({})));

    let response = service
        .handle(&session, request(methods::TOOLS_LIST, json!({})))
        .await;
    let result = result_of(response);
    let tools = result["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 7);
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[tokio::test]
async fn list_tables_hides_denied_namespaces() {
    let service = service();
    let (session, _) =
        service.initialize(scoped_public(), request(methods::INITIALIZE, json!({})));

    let response = service
        .handle(
            &session,
            request(
                methods::TOOLS_CALL,
                json!({ "name": "list_tables", "arguments": {} }),
            ),
        )
        .await;
    let result = result_of(response);
    assert_eq!(result["isError"], json!(false));

    let payload = tool_payload(&result);
    let tables = payload["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0]["table"], "users");
}

#[tokio::test]
async fn describe_denied_namespace_is_protocol_error() {
    let service = service();
    let (session, _) =
        service.initialize(scoped_public(), request(methods::INITIALIZE, json!({})));

    let response = service
        .handle(
            &session,
            request(
                methods::TOOLS_CALL,
                json!({ "name": "describe_table", "arguments": { "table": "reporting__metrics" } }),
            ),
        )
        .await;
    let result = result_of(response);
    assert_eq!(result["isError"], json!(true));

    let payload = tool_payload(&result);
    assert_eq!(payload["error"], "permission_denied");
    assert!(payload["message"].as_str().unwrap().contains("reporting"));
}

#[tokio::test]
async fn describe_table_reports_structure() {
    let service = service();
    let (session, _) = service.initialize(TokenClaims::FullAccess, request(methods::INITIALIZE, json!({})));

    let response = service
        .handle(
            &session,
            request(
                methods::TOOLS_CALL,
                json!({ "name": "describe_table", "arguments": { "table": "users" } }),
            ),
        )
        .await;
    let payload = tool_payload(&result_of(response));
    assert_eq!(payload["name"], "users");
    assert_eq!(payload["primary_key"], json!(["id"]));
    assert_eq!(payload["searchable_columns"], json!(["name", "email"]));
    assert!(payload["operations"]
        .as_array()
        .unwrap()
        .contains(&json!("delete")));
}

#[tokio::test]
async fn resources_follow_claims() {
    let service = service();
    let (session, _) =
        service.initialize(scoped_public(), request(methods::INITIALIZE, json!({})));

    let listed = result_of(
        service
            .handle(&session, request(methods::RESOURCES_LIST, json!({})))
            .await,
    );
    let resources = listed["resources"].as_array().unwrap();
    // The model dump plus one accessible table.
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["uri"], "schema://tables");

    let read = result_of(
        service
            .handle(
                &session,
                request(methods::RESOURCES_READ, json!({ "uri": "schema://tables" })),
            )
            .await,
    );
    let text = read["contents"][0]["text"].as_str().unwrap();
    let dump: Value = serde_json::from_str(text).unwrap();
    assert!(dump["capabilities"]["pagination"]["max_page_size"].is_number());
    assert_eq!(dump["tables"].as_array().unwrap().len(), 1);

    // The denied table's resource is a permission error, same as the tool.
    let denied = service
        .handle(
            &session,
            request(
                methods::RESOURCES_READ,
                json!({ "uri": "schema://tables/reporting__metrics" }),
            ),
        )
        .await;
    assert!(denied.error.is_some());
}

#[tokio::test]
async fn prompts_render_from_model() {
    let service = service();
    let (session, _) = service.initialize(TokenClaims::FullAccess, request(methods::INITIALIZE, json!({})));

    let listed = result_of(
        service
            .handle(&session, request(methods::PROMPTS_LIST, json!({})))
            .await,
    );
    assert_eq!(listed["prompts"].as_array().unwrap().len(), 2);

    let overview = result_of(
        service
            .handle(
                &session,
                request(methods::PROMPTS_GET, json!({ "name": "database-overview" })),
            )
            .await,
    );
    let text = match &overview["messages"][0]["content"]["text"] {
        Value::String(text) => text.clone(),
        other => panic!("expected text content, got {other:?}"),
    };
    assert!(text.contains("users"));
    assert!(text.contains("reporting__metrics"));

    let guide = result_of(
        service
            .handle(
                &session,
                request(
                    methods::PROMPTS_GET,
                    json!({ "name": "crud-guide", "arguments": { "table": "users" } }),
                ),
            )
            .await,
    );
    let text = guide["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("create_record"));
    assert!(text.contains("`id`"));
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let service = service();
    let (session, _) = service.initialize(TokenClaims::FullAccess, request(methods::INITIALIZE, json!({})));

    let response = service
        .handle(&session, request("tools/destroy", json!({})))
        .await;
    assert_eq!(response.error.unwrap().code, -32601);
}

#[tokio::test]
async fn notifications_produce_no_body() {
    let service = service();
    let (session, _) = service.initialize(TokenClaims::FullAccess, request(methods::INITIALIZE, json!({})));

    let mut note = request(methods::INITIALIZED, json!({}));
    note.id = None;
    let response = service.handle(&session, note).await;
    assert!(response.is_empty());
}
