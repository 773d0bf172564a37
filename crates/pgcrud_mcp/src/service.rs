//! The MCP service: semantic handling of agent-protocol requests.
//!
//! The transport owns session headers, SSE framing and HTTP; this service
//! owns initialize, tool listing/calls, resources and prompts, all under
//! the claims bound to the session.

use serde_json::{json, Value};
use tracing::{info, warn};

use pgcrud_auth::TokenClaims;
use pgcrud_core::{Gateway, GatewayError};

use crate::proto::{
    methods, ContentBlock, ErrorCode, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, PromptsCapability, PromptsListResult, ResourcesCapability,
    ResourcesListResult, ResourcesReadResult, ServerCapabilities, ServerInfo, ToolCallParams,
    ToolCallResult, ToolsCapability, ToolsListResult, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
use crate::session::{Session, SessionTable};
use crate::tools::ToolRegistry;
use crate::{prompts, resources};

/// Gateway-backed MCP service shared by every agent session.
pub struct McpService {
    gateway: Gateway,
    tools: ToolRegistry,
    sessions: SessionTable,
}

impl McpService {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            tools: ToolRegistry::new(),
            sessions: SessionTable::new(),
        }
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Handle `initialize`: bind the presented claims to a fresh session.
    ///
    /// Returns the session (for the transport to echo as a header) along
    /// with the response.
    pub fn initialize(
        &self,
        claims: TokenClaims,
        request: JsonRpcRequest,
    ) -> (std::sync::Arc<Session>, JsonRpcResponse) {
        let session = self.sessions.create(claims);

        let client = request
            .params
            .and_then(|params| serde_json::from_value::<InitializeParams>(params).ok());
        if let Some(client) = &client {
            info!(
                session = %session.id,
                client = %client.client_info.name,
                version = %client.client_info.version,
                "agent session initialized"
            );
        }

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                resources: Some(ResourcesCapability {
                    list_changed: false,
                }),
                prompts: Some(PromptsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "pgcrud".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let response = JsonRpcResponse::success(
            request.id,
            serde_json::to_value(result).unwrap_or_else(|_| json!({})),
        );
        (session, response)
    }

    /// Handle any post-initialize request under the session's claims.
    pub async fn handle(&self, session: &Session, request: JsonRpcRequest) -> JsonRpcResponse {
        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(
                    ErrorCode::InvalidRequest,
                    format!("Invalid JSON-RPC version: {}", request.jsonrpc),
                ),
            );
        }

        let method = request.method.clone();
        match method.as_str() {
            methods::INITIALIZED => JsonRpcResponse::none(request.id),
            methods::PING => JsonRpcResponse::success(request.id, json!({})),
            methods::TOOLS_LIST => self.tools_list(request.id),
            methods::TOOLS_CALL => self.tools_call(session, request).await,
            methods::RESOURCES_LIST => self.resources_list(session, request.id),
            methods::RESOURCES_READ => self.resources_read(session, request),
            methods::PROMPTS_LIST => JsonRpcResponse::success(
                request.id,
                to_value(PromptsListResult {
                    prompts: prompts::list_prompts(),
                }),
            ),
            methods::PROMPTS_GET => self.prompts_get(session, request),
            other => JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(
                    ErrorCode::MethodNotFound,
                    format!("Unknown method: {other}"),
                ),
            ),
        }
    }

    fn tools_list(&self, id: Option<crate::proto::RequestId>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            to_value(ToolsListResult {
                tools: self.tools.list_tools(),
            }),
        )
    }

    async fn tools_call(&self, session: &Session, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: ToolCallParams = match request.params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            _ => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::new(ErrorCode::InvalidParams, "Missing tool call params"),
                )
            }
        };

        info!(session = %session.id, tool = %params.name, "tool call");

        let outcome = self
            .tools
            .call_tool(&params.name, params.arguments, &self.gateway, &session.claims)
            .await;

        let result = match outcome {
            Ok(value) => ToolCallResult {
                content: vec![ContentBlock::text(
                    serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string()),
                )],
                is_error: false,
            },
            Err(err) => {
                warn!(session = %session.id, tool = %params.name, error = %err, "tool call failed");
                let expose = self.gateway.config().expose_db_errors;
                ToolCallResult {
                    content: vec![ContentBlock::text(
                        serde_json::to_string(&err.body(expose))
                            .unwrap_or_else(|_| "{}".to_string()),
                    )],
                    is_error: true,
                }
            }
        };

        JsonRpcResponse::success(request.id, to_value(result))
    }

    fn resources_list(
        &self,
        session: &Session,
        id: Option<crate::proto::RequestId>,
    ) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            to_value(ResourcesListResult {
                resources: resources::list_resources(&self.gateway, &session.claims),
            }),
        )
    }

    fn resources_read(&self, session: &Session, request: JsonRpcRequest) -> JsonRpcResponse {
        let uri = request
            .params
            .as_ref()
            .and_then(|params| params.get("uri"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let Some(uri) = uri else {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(ErrorCode::InvalidParams, "Missing resource uri"),
            );
        };

        match resources::read_resource(&self.gateway, &session.claims, &uri) {
            Ok(contents) => JsonRpcResponse::success(
                request.id,
                to_value(ResourcesReadResult {
                    contents: vec![contents],
                }),
            ),
            Err(err) => gateway_error_response(request.id, err),
        }
    }

    fn prompts_get(&self, session: &Session, request: JsonRpcRequest) -> JsonRpcResponse {
        let name = request
            .params
            .as_ref()
            .and_then(|params| params.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let Some(name) = name else {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(ErrorCode::InvalidParams, "Missing prompt name"),
            );
        };
        let arguments = request
            .params
            .as_ref()
            .and_then(|params| params.get("arguments"))
            .cloned();

        match prompts::get_prompt(&self.gateway, &session.claims, &name, arguments.as_ref()) {
            Ok(result) => JsonRpcResponse::success(request.id, to_value(result)),
            Err(err) => gateway_error_response(request.id, err),
        }
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| json!({}))
}

/// Map a gateway error onto the JSON-RPC error envelope.
fn gateway_error_response(
    id: Option<crate::proto::RequestId>,
    err: GatewayError,
) -> JsonRpcResponse {
    let code = match err.status() {
        400 => ErrorCode::InvalidParams,
        404 => ErrorCode::InvalidParams,
        _ => ErrorCode::InternalError,
    };
    JsonRpcResponse::error(id, JsonRpcError::new(code, err.to_string()))
}
