//! MCP method dispatch over JSON-RPC.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::FigmaConfig;
use crate::engine::jsonrpc::{self, ErrorObject, Message, Response};
use crate::engine::resources::ResourceCatalog;
use crate::engine::tools::{self, ToolRunner};
use crate::engine::{EngineError, EngineFactory, ProtocolEngine};
use crate::figma::FigmaClient;
use crate::observability::metrics;
use crate::session::SessionId;

pub const SERVER_NAME: &str = "figma-mcp-proxy";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Methods reported by name in metrics; anything else is `other`.
const KNOWN_METHODS: &[&str] = &[
    "initialize",
    "ping",
    "tools/list",
    "tools/call",
    "resources/list",
    "resources/read",
    "prompts/list",
];

/// Engine for one session.
pub struct McpEngine {
    session_id: SessionId,
    tools: ToolRunner,
    resources: ResourceCatalog,
}

#[async_trait]
impl ProtocolEngine for McpEngine {
    async fn handle(&self, raw: &str) -> Result<Vec<String>, EngineError> {
        let message = match jsonrpc::parse(raw) {
            Ok(message) => message,
            Err((id, error)) => {
                tracing::debug!(session_id = %self.session_id, error = %error.message, "Rejected message");
                return Ok(vec![Response::failure(id, error).to_json()]);
            }
        };

        match message {
            Message::Request { id, method, params } => {
                tracing::debug!(session_id = %self.session_id, method = %method, "Request");
                let reply = match self.dispatch(&method, params).await {
                    Ok(result) => {
                        metrics::record_request(method_label(&method), "ok");
                        Response::success(id, result)
                    }
                    Err(error) => {
                        metrics::record_request(method_label(&method), "error");
                        Response::failure(id, error)
                    }
                };
                Ok(vec![reply.to_json()])
            }
            Message::Notification { method } => {
                tracing::debug!(session_id = %self.session_id, method = %method, "Notification");
                Ok(Vec::new())
            }
            Message::Response { id } => {
                tracing::debug!(session_id = %self.session_id, id = %id, "Ignoring client response");
                Ok(Vec::new())
            }
        }
    }
}

impl McpEngine {
    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ErrorObject> {
        match method {
            "initialize" => Ok(self.initialize(params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::catalog() })),
            "tools/call" => {
                let params = params.ok_or_else(|| ErrorObject::invalid_params("Missing params"))?;
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ErrorObject::invalid_params("Missing tool name"))?;
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                Ok(self.tools.call(name, &arguments).await)
            }
            "resources/list" => self
                .resources
                .list()
                .await
                .map_err(|err| ErrorObject::internal(format!("Failed to list resources: {err}"))),
            "resources/read" => {
                let uri = params
                    .as_ref()
                    .and_then(|params| params.get("uri"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| ErrorObject::invalid_params("Missing resource uri"))?;
                self.resources.read(uri).await.map_err(|err| {
                    ErrorObject::internal(format!("Failed to read resource {uri}: {err}"))
                })
            }
            "prompts/list" => Ok(json!({ "prompts": [] })),
            other => Err(ErrorObject::method_not_found(other)),
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|params| params.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        if let Some(client) = params.and_then(|params| params.get("clientInfo")) {
            let client_name = client
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            tracing::info!(
                session_id = %self.session_id,
                client = %client_name,
                protocol_version,
                "Client initialized"
            );
        }

        json!({
            "protocolVersion": protocol_version,
            "capabilities": {"tools": {}, "resources": {}, "prompts": {}},
            "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
        })
    }
}

fn method_label(method: &str) -> &str {
    KNOWN_METHODS
        .iter()
        .find(|known| **known == method)
        .copied()
        .unwrap_or("other")
}

/// Builds [`McpEngine`]s that share one Figma client and resource cache.
#[derive(Clone)]
pub struct McpEngineFactory {
    tools: ToolRunner,
    resources: ResourceCatalog,
}

impl McpEngineFactory {
    pub fn new(figma: Arc<FigmaClient>, config: &FigmaConfig) -> Self {
        Self {
            tools: ToolRunner::new(figma.clone()),
            resources: ResourceCatalog::new(
                figma,
                Duration::from_secs(config.file_list_cache_ttl_secs),
            ),
        }
    }
}

impl EngineFactory for McpEngineFactory {
    fn create(&self, session_id: &SessionId) -> Box<dyn ProtocolEngine> {
        Box::new(McpEngine {
            session_id: session_id.clone(),
            tools: self.tools.clone(),
            resources: self.resources.clone(),
        })
    }
}
