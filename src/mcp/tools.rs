//! MCP tool definitions
//!
//! The registry of tools this server exposes, the typed argument struct for
//! each of them, and the single validation step that turns a raw argument bag
//! into a [`ToolRequest`].

use std::sync::OnceLock;

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use validator::Validate;

use crate::error::{DraftMailError, Result, ToolError};
use crate::mcp::types::Tool;

pub const HELLO_WORLD: &str = "hello_world";
pub const GET_UNREAD_EMAILS: &str = "get_unread_emails";
pub const CREATE_DRAFT_REPLY: &str = "create_draft_reply";

/// Largest page the Gmail list endpoint will return
pub const MAX_UNREAD_LIMIT: u32 = 500;

/// Arguments for `hello_world`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
pub struct HelloWorldArgs {}

/// Arguments for `get_unread_emails`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
pub struct GetUnreadEmailsArgs {
    /// Maximum number of unread emails to retrieve
    #[validate(range(max = 500))]
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Arguments for `create_draft_reply`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct CreateDraftReplyArgs {
    /// The ID of the email to create a draft reply to
    #[validate(length(min = 1))]
    pub email_id: String,

    /// The body of the draft reply email
    pub reply_body: String,
}

/// A validated tool call
#[derive(Debug, Clone)]
pub enum ToolRequest {
    HelloWorld,
    GetUnreadEmails(GetUnreadEmailsArgs),
    CreateDraftReply(CreateDraftReplyArgs),
}

impl ToolRequest {
    /// Validate `arguments` against the descriptor registered as `name`.
    ///
    /// Required-argument presence is checked first, so a missing argument is
    /// reported as such rather than as a deserialization failure.
    pub fn parse(name: &str, arguments: Value) -> Result<Self> {
        let tool = find_tool(name).ok_or_else(|| {
            DraftMailError::Tool(ToolError::UnknownTool {
                name: name.to_string(),
            })
        })?;

        // hello_world takes no arguments, so whatever was sent is ignored
        if name == HELLO_WORLD {
            return Ok(ToolRequest::HelloWorld);
        }

        let arguments = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(invalid(name, format!("arguments must be an object, got {}", other)));
            }
        };

        check_required(tool, &arguments)?;

        match name {
            GET_UNREAD_EMAILS => Ok(ToolRequest::GetUnreadEmails(typed(name, arguments)?)),
            CREATE_DRAFT_REPLY => Ok(ToolRequest::CreateDraftReply(typed(name, arguments)?)),
            _ => Err(DraftMailError::Tool(ToolError::UnknownTool {
                name: name.to_string(),
            })),
        }
    }

    /// Name of the tool this request targets
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolRequest::HelloWorld => HELLO_WORLD,
            ToolRequest::GetUnreadEmails(_) => GET_UNREAD_EMAILS,
            ToolRequest::CreateDraftReply(_) => CREATE_DRAFT_REPLY,
        }
    }
}

/// All available tools, in a fixed order
pub fn list_tools() -> Vec<Tool> {
    registry().to_vec()
}

/// Look up a tool descriptor by name
pub fn find_tool(name: &str) -> Option<&'static Tool> {
    registry().iter().find(|tool| tool.name == name)
}

fn registry() -> &'static [Tool] {
    static TOOLS: OnceLock<Vec<Tool>> = OnceLock::new();
    TOOLS.get_or_init(|| {
        vec![
            tool_def(HELLO_WORLD, "Say hello to the world", schema_for::<HelloWorldArgs>()),
            tool_def(
                GET_UNREAD_EMAILS,
                "Get a list of unread emails",
                schema_for::<GetUnreadEmailsArgs>(),
            ),
            tool_def(
                CREATE_DRAFT_REPLY,
                "Create a draft reply to an email",
                schema_for::<CreateDraftReplyArgs>(),
            ),
        ]
    })
}

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// JSON Schema for an argument struct, trimmed to what MCP clients expect
fn schema_for<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.option_add_null_type = false;
            s.inline_subschemas = true;
        })
        .into_generator();

    let mut schema = serde_json::to_value(generator.into_root_schema_for::<T>())
        .unwrap_or_else(|_| json!({"type": "object"}));

    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.remove("description");
        obj.entry("properties").or_insert_with(|| json!({}));
        obj.entry("required").or_insert_with(|| json!([]));
    }

    schema
}

fn check_required(tool: &Tool, arguments: &Map<String, Value>) -> Result<()> {
    let required = tool.input_schema["required"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);

    for argument in required {
        if arguments.get(argument).map_or(true, Value::is_null) {
            return Err(DraftMailError::Tool(ToolError::MissingArgument {
                tool: tool.name.clone(),
                argument: argument.to_string(),
            }));
        }
    }

    Ok(())
}

fn typed<T: DeserializeOwned + Validate>(tool: &str, arguments: Map<String, Value>) -> Result<T> {
    let parsed: T =
        serde_json::from_value(Value::Object(arguments)).map_err(|e| invalid(tool, e.to_string()))?;
    parsed.validate().map_err(|e| invalid(tool, e.to_string()))?;
    Ok(parsed)
}

fn invalid(tool: &str, message: String) -> DraftMailError {
    DraftMailError::Tool(ToolError::InvalidArgument {
        tool: tool.to_string(),
        message,
    })
}
