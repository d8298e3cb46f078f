//! Tool catalog and execution.
//!
//! Tool failures never become protocol errors: they are reported to the
//! client as an `isError` result whose text is `{"error":true,"message":...}`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::figma::types::{ImageFormat, ImagesResponse};
use crate::figma::{FigmaClient, FigmaError};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Figma(#[from] FigmaError),
}

/// The `tools/list` catalog.
pub fn catalog() -> Value {
    json!([
        {
            "name": "export_asset",
            "description": "Export images/assets from Figma designs",
            "inputSchema": render_schema("Array of node IDs to export", "Export format"),
        },
        {
            "name": "get_design_tokens",
            "description": "Extract design tokens (colors, typography, spacing) from a Figma file",
            "inputSchema": file_schema(),
        },
        {
            "name": "search_files",
            "description": "Search for Figma files by name",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query (file name)"},
                    "teamId": {"type": "string", "description": "Optional team ID to search within"},
                },
                "required": ["query"],
            },
        },
        {
            "name": "get_components",
            "description": "Get all components from a Figma file",
            "inputSchema": file_schema(),
        },
        {
            "name": "get_styles",
            "description": "Get published styles (colors, text styles) from a Figma file",
            "inputSchema": file_schema(),
        },
        {
            "name": "fetch_screenshots",
            "description": "Fetch screenshot images from Figma designs (downloads actual image data)",
            "inputSchema": render_schema("Array of node IDs to fetch screenshots for", "Image format"),
        },
    ])
}

fn file_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "fileId": {"type": "string", "description": "The Figma file ID"},
        },
        "required": ["fileId"],
    })
}

fn render_schema(node_ids: &str, format: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "fileId": {"type": "string", "description": "The Figma file ID"},
            "nodeIds": {"type": "array", "items": {"type": "string"}, "description": node_ids},
            "format": {
                "type": "string",
                "enum": ["png", "jpg", "svg", "pdf"],
                "default": "png",
                "description": format,
            },
            "scale": {"type": "number", "default": 1, "description": "Scale factor (1, 2, 3, etc.)"},
        },
        "required": ["fileId", "nodeIds"],
    })
}

/// Executes `tools/call` requests against the Figma API.
#[derive(Clone)]
pub struct ToolRunner {
    figma: Arc<FigmaClient>,
}

impl ToolRunner {
    pub fn new(figma: Arc<FigmaClient>) -> Self {
        Self { figma }
    }

    /// Run a tool and wrap the outcome as a `tools/call` result.
    pub async fn call(&self, name: &str, arguments: &Value) -> Value {
        match self.execute(name, arguments).await {
            Ok(payload) => json!({
                "content": [{"type": "text", "text": format!("{payload:#}")}],
            }),
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "Tool call failed");
                let payload = json!({"error": true, "message": err.to_string()});
                json!({
                    "content": [{"type": "text", "text": format!("{payload:#}")}],
                    "isError": true,
                })
            }
        }
    }

    async fn execute(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        match name {
            "export_asset" => {
                let render = RenderArgs::parse(args)?;
                let images = self.render(&render).await?;
                Ok(json!({
                    "success": true,
                    "images": images.images,
                    "format": render.format,
                    "scale": render.scale_value,
                }))
            }
            "get_design_tokens" => {
                let file_id = required_file_id(args)?;
                let tokens = self.figma.extract_design_tokens(file_id).await?;
                Ok(json!(tokens))
            }
            "search_files" => {
                let query = string_arg(args, "query")
                    .ok_or_else(|| ToolError::InvalidArguments("query is required".into()))?;
                let team_id = string_arg(args, "teamId");
                let files = self.figma.search_files(query, team_id).await?;
                let results: Vec<Value> = files
                    .iter()
                    .map(|file| {
                        json!({
                            "key": file.key,
                            "name": file.name,
                            "lastModified": file.last_modified,
                            "thumbnailUrl": file.thumbnail_url,
                        })
                    })
                    .collect();
                Ok(json!({"query": query, "count": results.len(), "results": results}))
            }
            "get_components" => {
                let file_id = required_file_id(args)?;
                let file = self.figma.get_file(file_id).await?;
                let components: Vec<Value> = file
                    .components
                    .iter()
                    .map(|(key, component)| {
                        json!({
                            "key": key,
                            "name": component.name,
                            "description": component.description,
                            "componentSetId": component.component_set_id,
                        })
                    })
                    .collect();
                Ok(json!({"fileId": file_id, "count": components.len(), "components": components}))
            }
            "get_styles" => {
                let file_id = required_file_id(args)?;
                let file = self.figma.get_file(file_id).await?;
                let styles: Vec<Value> = file
                    .styles
                    .iter()
                    .map(|(key, style)| {
                        json!({
                            "key": key,
                            "name": style.name,
                            "styleType": style.style_type,
                            "description": style.description,
                        })
                    })
                    .collect();
                Ok(json!({"fileId": file_id, "count": styles.len(), "styles": styles}))
            }
            "fetch_screenshots" => {
                let render = RenderArgs::parse(args)?;
                let images = self.render(&render).await?;
                let screenshots =
                    join_all(images.images.into_iter().map(|(node_id, url)| self.download(node_id, url)))
                        .await;
                Ok(json!({
                    "success": true,
                    "count": screenshots.len(),
                    "screenshots": screenshots,
                    "format": render.format,
                    "scale": render.scale_value,
                }))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    async fn render(&self, args: &RenderArgs<'_>) -> Result<ImagesResponse, FigmaError> {
        self.figma
            .get_images(args.file_id, &args.node_ids, args.format, args.scale)
            .await
    }

    /// One screenshot entry. Failures are reported inline, per node.
    async fn download(&self, node_id: String, url: Option<String>) -> Value {
        let Some(url) = url else {
            return json!({"nodeId": node_id, "error": "No image URL returned"});
        };

        match self.figma.fetch_image(&url).await {
            Ok(image) => json!({
                "nodeId": node_id,
                "url": url,
                "mimeType": image.mime_type,
                "dataUri": format!("data:{};base64,{}", image.mime_type, BASE64.encode(&image.bytes)),
                "size": image.bytes.len(),
            }),
            Err(err) => {
                tracing::debug!(node_id = %node_id, error = %err, "Screenshot download failed");
                json!({"nodeId": node_id, "url": url, "error": err.to_string()})
            }
        }
    }
}

/// Arguments shared by the rendering tools.
struct RenderArgs<'a> {
    file_id: &'a str,
    node_ids: Vec<String>,
    format: ImageFormat,
    scale: f64,
    /// Echoed back as the caller sent it.
    scale_value: Value,
}

impl<'a> RenderArgs<'a> {
    fn parse(args: &'a Value) -> Result<Self, ToolError> {
        let missing = || ToolError::InvalidArguments("fileId and nodeIds (array) are required".into());

        let file_id = string_arg(args, "fileId").ok_or_else(missing)?;
        let node_ids = args
            .get("nodeIds")
            .and_then(Value::as_array)
            .ok_or_else(missing)?
            .iter()
            .map(|id| id.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(missing)?;

        let format = match string_arg(args, "format") {
            None => ImageFormat::default(),
            Some(raw) => serde_json::from_value(Value::String(raw.to_string())).map_err(|_| {
                ToolError::InvalidArguments(format!(
                    "Unsupported format '{raw}' (expected png, jpg, svg or pdf)"
                ))
            })?,
        };

        let (scale, scale_value) = match args.get("scale") {
            Some(value) if value.as_f64().is_some_and(|scale| scale > 0.0) => {
                (value.as_f64().unwrap_or(1.0), value.clone())
            }
            _ => (1.0, json!(1)),
        };

        Ok(Self {
            file_id,
            node_ids,
            format,
            scale,
            scale_value,
        })
    }
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|value| !value.is_empty())
}

fn required_file_id(args: &Value) -> Result<&str, ToolError> {
    string_arg(args, "fileId").ok_or_else(|| ToolError::InvalidArguments("fileId is required".into()))
}
