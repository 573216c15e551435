//! FAQ MCP Server implementation

use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::commands::status;
use faq_match::core::item::{ImportRow, MultiValue};
use faq_match::core::paths::KbPaths;
use faq_match::core::reconcile::ImportMode;
use faq_match::search::FaqEngine;

/// Parameters for kb_ask tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AskParams {
    /// Free-text user question (e.g., "I forgot my password")
    #[schemars(description = "Free-text user question")]
    pub query: String,
}

/// One question/answer row for kb_import
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RowParam {
    #[schemars(description = "Question text (required)")]
    #[serde(default)]
    pub question: Option<String>,
    #[schemars(description = "Answer text (required)")]
    #[serde(default)]
    pub answer: Option<String>,
    #[schemars(description = "Keywords separated by ';' or ','")]
    #[serde(default)]
    pub keywords: Option<String>,
    #[schemars(description = "Tags separated by ';' or ','")]
    #[serde(default)]
    pub tags: Option<String>,
    #[schemars(description = "Explicit item id; omit to derive one from the question")]
    #[serde(default)]
    pub id: Option<String>,
}

impl From<RowParam> for ImportRow {
    fn from(p: RowParam) -> Self {
        ImportRow {
            question: p.question,
            answer: p.answer,
            keywords: p.keywords.map(MultiValue::Text),
            tags: p.tags.map(MultiValue::Text),
            id: p.id,
        }
    }
}

/// Parameters for kb_import tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImportParams {
    #[schemars(description = "Rows to import")]
    pub rows: Vec<RowParam>,
    /// "replace" (default) or "append"
    #[schemars(description = "Import mode: replace (default) or append")]
    #[serde(default)]
    pub mode: Option<String>,
    #[schemars(description = "Only report what would change")]
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct SamplesJson {
    samples: Vec<String>,
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

/// FAQ MCP Service
#[derive(Clone)]
pub struct FaqService {
    engine: Arc<FaqEngine>,
    tool_router: ToolRouter<Self>,
}

impl FaqService {
    pub fn new(engine: Arc<FaqEngine>) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl FaqService {
    /// Answer a user question
    #[tool(description = "Answer a user question from the FAQ knowledge base. Returns either a direct answer or a list of similar questions to choose from.")]
    async fn kb_ask(&self, params: Parameters<AskParams>) -> Result<CallToolResult, McpError> {
        let reply = self.engine.ask(&params.0.query);
        to_json(&reply)
    }

    /// Bulk import question/answer rows
    #[tool(description = "Import question/answer rows into the FAQ knowledge base. Replace mode makes the rows the whole knowledge base; append mode merges them into it. Any invalid row rejects the whole batch.")]
    async fn kb_import(&self, params: Parameters<ImportParams>) -> Result<CallToolResult, McpError> {
        let ImportParams {
            rows,
            mode,
            dry_run,
        } = params.0;
        let mode = mode.as_deref().map(ImportMode::parse).unwrap_or_default();
        let rows: Vec<ImportRow> = rows.into_iter().map(ImportRow::from).collect();

        let outcome = if dry_run {
            self.engine.preview_import(&rows, mode)
        } else {
            self.engine.import(&rows, mode)
        }
        .map_err(|e| McpError::internal_error(format!("Import failed: {}", e), None))?;

        to_json(&outcome)
    }

    /// Example questions
    #[tool(description = "List example questions from the FAQ knowledge base.")]
    async fn kb_samples(&self) -> Result<CallToolResult, McpError> {
        to_json(&SamplesJson {
            samples: self.engine.samples(),
        })
    }

    /// Knowledge base summary
    #[tool(description = "Get FAQ knowledge base status: item count, semantic scoring state, backups and unmatched query count.")]
    async fn kb_status(&self) -> Result<CallToolResult, McpError> {
        let status = status::collect(&self.engine)
            .map_err(|e| McpError::internal_error(format!("Status failed: {}", e), None))?;
        to_json(&status)
    }
}

#[tool_handler]
impl ServerHandler for FaqService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "FAQ knowledge base MCP Server. Answers user questions and manages question/answer imports.".to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Run the MCP server over stdio
pub async fn run_mcp_server(paths: KbPaths) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let engine = Arc::new(FaqEngine::open(paths)?);
    info!(items = engine.snapshot().items.len(), "Starting MCP server");

    let service = FaqService::new(engine);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
