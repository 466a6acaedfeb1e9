//! Agent roster served over HTTP

use switchboard_core::tool::{AddTool, DateTimeTool};
use switchboard_core::{
    AgentBuilder, AgentRegistry, HandoffData, HandoffTarget, InputSchema, ParamType,
    ParameterSchema, Result, ToolRegistry,
};

/// Persona behind `/messages`
pub const CHAT_AGENT: &str = "gollum";

/// Tool-using agent behind `/agents/tools`
pub const TOOL_AGENT: &str = "calculator";

/// Entry agent behind `/agents/handoff`
pub const TRIAGE_AGENT: &str = "triage";

pub fn tools() -> Result<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register(AddTool)?;
    tools.register(DateTimeTool)?;
    Ok(tools)
}

fn log_handoff(data: &HandoffData) -> Result<()> {
    tracing::info!(
        from = %data.from_agent,
        to = %data.to_agent,
        payload = ?data.payload,
        "Triage routed request"
    );
    Ok(())
}

fn reason_schema() -> InputSchema {
    InputSchema::new(vec![ParameterSchema::optional(
        "reason",
        ParamType::String,
        "Why this specialist fits the question",
    )])
}

/// Build the agent roster, with every agent on `model` when one is given
pub fn agents(model: Option<&str>) -> Result<AgentRegistry> {
    let with_model = |builder: AgentBuilder| match model {
        Some(m) => builder.model(m),
        None => builder,
    };

    let mut agents = AgentRegistry::new();

    agents.register(
        with_model(AgentBuilder::new(CHAT_AGENT))
            .instructions("You are Gollum, from The Lord of the Rings. Always answer in character.")
            .build()?,
    )?;

    agents.register(
        with_model(AgentBuilder::new(TOOL_AGENT))
            .instructions(
                "You answer arithmetic and date questions. Use the add tool for sums and the \
                 datetime tool for the current date or time instead of guessing.",
            )
            .temperature(0.2)
            .tool("add")
            .tool("datetime")
            .build()?,
    )?;

    agents.register(
        with_model(AgentBuilder::new("math_tutor"))
            .instructions(
                "You provide help with math problems. Explain your reasoning at each step \
                 and include examples.",
            )
            .tool("add")
            .handoff(HandoffTarget::new(
                "history_tutor",
                "The question turns out to be about history",
            ))
            .build()?,
    )?;

    agents.register(
        with_model(AgentBuilder::new("history_tutor"))
            .instructions(
                "You provide assistance with historical queries. Explain important events \
                 and context clearly.",
            )
            .build()?,
    )?;

    agents.register(
        with_model(AgentBuilder::new(TRIAGE_AGENT))
            .instructions(
                "You determine which specialist should answer the user's homework question. \
                 Always hand off; never answer yourself.",
            )
            .handoff(
                HandoffTarget::new("math_tutor", "Specialist agent for math questions")
                    .with_input_schema(reason_schema())
                    .with_callback(log_handoff),
            )
            .handoff(
                HandoffTarget::new("history_tutor", "Specialist agent for historical questions")
                    .with_input_schema(reason_schema())
                    .with_callback(log_handoff),
            )
            .build()?,
    )?;

    Ok(agents)
}
