//! `figma://` resources.
//!
//! | URI                    | Contents                      |
//! |------------------------|-------------------------------|
//! | `figma://files`        | account file listing (cached) |
//! | `figma://file/{id}`    | file summary                  |
//! | `figma://team/{id}`    | team files and projects       |
//! | `figma://project/{id}` | placeholder                   |

use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::figma::{FigmaClient, FigmaError};

const MIME_JSON: &str = "application/json";
const FILES_URI: &str = "figma://files";

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Unknown resource URI: {0}")]
    UnknownUri(String),
    #[error(transparent)]
    Figma(#[from] FigmaError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceUri<'a> {
    Files,
    File(&'a str),
    Team(&'a str),
    Project(&'a str),
}

impl<'a> ResourceUri<'a> {
    fn parse(uri: &'a str) -> Option<Self> {
        if uri == FILES_URI {
            return Some(Self::Files);
        }
        let (kind, id) = uri.strip_prefix("figma://")?.split_once('/')?;
        if id.is_empty() {
            return None;
        }
        match kind {
            "file" => Some(Self::File(id)),
            "team" => Some(Self::Team(id)),
            "project" => Some(Self::Project(id)),
            _ => None,
        }
    }
}

struct CachedListing {
    value: Value,
    fetched_at: Instant,
}

/// Resource listing and reads. Clones share the file-listing cache.
#[derive(Clone)]
pub struct ResourceCatalog {
    figma: Arc<FigmaClient>,
    ttl: Duration,
    files: Arc<DashMap<&'static str, CachedListing>>,
}

impl ResourceCatalog {
    pub fn new(figma: Arc<FigmaClient>, ttl: Duration) -> Self {
        Self {
            figma,
            ttl,
            files: Arc::new(DashMap::new()),
        }
    }

    /// `resources/list` result. Teams that fail to list their projects are
    /// skipped, not fatal.
    pub async fn list(&self) -> Result<Value, ResourceError> {
        let mut resources = vec![json!({
            "uri": FILES_URI,
            "name": "All Figma Files",
            "description": "List of all Figma files in your account",
            "mimeType": MIME_JSON,
        })];

        for team in self.figma.get_teams().await? {
            resources.push(json!({
                "uri": format!("figma://team/{}", team.id),
                "name": format!("Team: {}", team.name),
                "description": format!("Files and projects for team: {}", team.name),
                "mimeType": MIME_JSON,
            }));

            match self.figma.get_projects(&team.id).await {
                Ok(projects) => {
                    for project in projects {
                        resources.push(json!({
                            "uri": format!("figma://project/{}", project.id),
                            "name": format!("Project: {}", project.name),
                            "description": format!("Project: {} in team {}", project.name, team.name),
                            "mimeType": MIME_JSON,
                        }));
                    }
                }
                Err(err) => {
                    tracing::warn!(team_id = %team.id, error = %err, "Skipping team projects");
                }
            }
        }

        Ok(json!({ "resources": resources }))
    }

    /// `resources/read` result.
    pub async fn read(&self, uri: &str) -> Result<Value, ResourceError> {
        let resource =
            ResourceUri::parse(uri).ok_or_else(|| ResourceError::UnknownUri(uri.to_string()))?;

        let body = match resource {
            ResourceUri::Files => self.file_listing().await?,
            ResourceUri::File(file_id) => {
                let file = self.figma.get_file(file_id).await?;
                let children: Vec<Value> = file
                    .document
                    .children
                    .iter()
                    .map(|child| json!({"id": child.id, "name": child.name, "type": child.node_type}))
                    .collect();
                json!({
                    "name": file.name,
                    "lastModified": file.last_modified,
                    "version": file.version,
                    "document": {
                        "id": file.document.id,
                        "name": file.document.name,
                        "type": file.document.node_type,
                        "children": children,
                    },
                    "components": file.components.len(),
                    "styles": file.styles.len(),
                })
            }
            ResourceUri::Team(team_id) => {
                let files = self.figma.get_files(Some(team_id)).await?;
                let projects = self.figma.get_projects(team_id).await?;
                json!({
                    "teamId": team_id,
                    "files": files
                        .iter()
                        .map(|f| json!({"key": f.key, "name": f.name, "lastModified": f.last_modified}))
                        .collect::<Vec<_>>(),
                    "projects": projects
                        .iter()
                        .map(|p| json!({"id": p.id, "name": p.name}))
                        .collect::<Vec<_>>(),
                })
            }
            ResourceUri::Project(project_id) => json!({
                "projectId": project_id,
                "note": "Project resource - files would be listed here",
            }),
        };

        Ok(json!({
            "contents": [{"uri": uri, "mimeType": MIME_JSON, "text": format!("{body:#}")}],
        }))
    }

    async fn file_listing(&self) -> Result<Value, FigmaError> {
        if let Some(cached) = self.files.get(FILES_URI) {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.value.clone());
            }
        }

        let files = self.figma.get_files(None).await?;
        let value: Value = files
            .iter()
            .map(|file| {
                json!({
                    "key": file.key,
                    "name": file.name,
                    "thumbnailUrl": file.thumbnail_url,
                    "lastModified": file.last_modified,
                })
            })
            .collect();

        self.files.insert(
            FILES_URI,
            CachedListing {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }
}
