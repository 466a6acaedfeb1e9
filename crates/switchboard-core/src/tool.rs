//! Tool System
//!
//! Named capabilities with a declared input schema. Tools are registered once
//! at startup and invoked by the turn executor; the registry validates
//! arguments before any executor runs.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::schema::{InputSchema, ParamType, ParameterSchema, ValidatedArgs};

pub(crate) fn new_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID correlating the request with its tool message
    #[serde(default = "new_call_id")]
    pub id: String,

    /// Tool identifier
    #[serde(alias = "tool")]
    pub name: String,

    /// Raw, unvalidated arguments
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: new_call_id(),
            name: name.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Input contract
    #[serde(rename = "parameters")]
    pub input: InputSchema,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,

    /// Whether tool has side effects
    #[serde(default)]
    pub has_side_effects: bool,
}

/// Tool trait - implement to add new capabilities
///
/// Executors must be re-entrant: one turn may call the same tool many times.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with schema-conformant arguments
    async fn execute(&self, args: ValidatedArgs) -> Result<Value>;
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Validate raw arguments and run the tool once
    pub async fn invoke(&self, name: &str, raw_arguments: &Value) -> Result<Value> {
        let tool = self.resolve(name)?;
        let args = tool
            .schema()
            .input
            .validate(raw_arguments)
            .map_err(|violations| AgentError::ToolArgument {
                tool: name.to_string(),
                violations,
            })?;

        tool.execute(args).await.map_err(|e| match e {
            e @ AgentError::ToolExecution { .. } => e,
            other => AgentError::ToolExecution {
                tool: name.to_string(),
                message: other.to_string(),
            },
        })
    }

    /// Schemas for the given tool names, in the order given
    pub fn schemas_for(&self, names: &[String]) -> Result<Vec<ToolSchema>> {
        names
            .iter()
            .map(|name| self.resolve(name).map(|tool| tool.schema()))
            .collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Render a tool catalogue for providers without native function calling
pub fn prompt_section(schemas: &[ToolSchema]) -> String {
    use std::fmt::Write;

    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
    prompt.push_str(
        "```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n",
    );

    for schema in schemas {
        let _ = writeln!(prompt, "### {}", schema.name);
        let _ = writeln!(prompt, "{}", schema.description);

        if !schema.input.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &schema.input.parameters {
                let required = if param.required { " (required)" } else { "" };
                let _ = writeln!(
                    prompt,
                    "- `{}` ({}){}: {}",
                    param.name, param.param_type, required, param.description
                );
            }
        }
        prompt.push('\n');
    }

    prompt
}

type ToolFn = dyn Fn(ValidatedArgs) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// A closure-backed tool
#[derive(Clone)]
pub struct FunctionTool {
    schema: ToolSchema,
    function: Arc<ToolFn>,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.schema.name)
            .field("description", &self.schema.description)
            .finish_non_exhaustive()
    }
}

impl FunctionTool {
    /// Create a tool from a synchronous function
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input: InputSchema,
        function: F,
    ) -> Self
    where
        F: Fn(ValidatedArgs) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new_async(name, description, input, move |args| {
            futures::future::ready(function(args)).boxed()
        })
    }

    /// Create a tool from a function returning a future
    pub fn new_async<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input: InputSchema,
        function: F,
    ) -> Self
    where
        F: Fn(ValidatedArgs) -> BoxFuture<'static, Result<Value>> + Send + Sync + 'static,
    {
        Self {
            schema: ToolSchema {
                name: name.into(),
                description: description.into(),
                input,
                category: None,
                has_side_effects: false,
            },
            function: Arc::new(function),
        }
    }

    #[must_use]
    pub fn with_side_effects(mut self) -> Self {
        self.schema.has_side_effects = true;
        self
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        (self.function)(args).await
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// Adds two numbers
pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "add".into(),
            description: "Add two numbers".into(),
            input: InputSchema::new(vec![
                ParameterSchema::required("a", ParamType::Number, "First addend"),
                ParameterSchema::required("b", ParamType::Number, "Second addend"),
            ]),
            category: Some("math".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        #[derive(Deserialize)]
        struct Operands {
            a: f64,
            b: f64,
        }

        let Operands { a, b } = args.parse()?;
        let sum = a + b;
        // Keep integral sums integral so the model sees `5`, not `5.0`
        if sum.fract() == 0.0 && sum.abs() < 9.0e15 {
            #[allow(clippy::cast_possible_truncation)]
            return Ok(json!(sum as i64));
        }
        Ok(json!(sum))
    }
}

/// DateTime tool - returns current time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "datetime".into(),
            description: "Get the current date and time".into(),
            input: InputSchema::new(vec![
                ParameterSchema::optional(
                    "format",
                    ParamType::String,
                    "Output format: 'iso', 'human', or 'unix'",
                )
                .with_default(json!("human"))
                .with_enum(vec![json!("iso"), json!("human"), json!("unix")]),
            ]),
            category: Some("time".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        let now = chrono::Utc::now();

        let output = match args.get_str("format").unwrap_or("human") {
            "iso" => now.to_rfc3339(),
            "unix" => now.timestamp().to_string(),
            _ => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
        };

        Ok(Value::String(output))
    }
}
