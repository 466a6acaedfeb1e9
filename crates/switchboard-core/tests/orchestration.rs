mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use switchboard_core::{
    AgentBuilder, AgentError, AgentRegistry, FunctionTool, HandoffData, HandoffTarget,
    InputSchema, LlmProvider, Message, ModelResponse, Orchestrator, ParamType, ParameterSchema,
    Role, RunConfig, ToolCall, ToolRegistry, Transcript,
};

use common::{ScriptedProvider, handoff, text, tool_call};

fn sum_tool() -> FunctionTool {
    FunctionTool::new(
        "sum",
        "Add x and y",
        InputSchema::new(vec![
            ParameterSchema::required("x", ParamType::Integer, "left"),
            ParameterSchema::required("y", ParamType::Integer, "right"),
        ]),
        |args| {
            let x = args.get("x").and_then(Value::as_i64).unwrap_or_default();
            let y = args.get("y").and_then(Value::as_i64).unwrap_or_default();
            Ok(json!(x + y))
        },
    )
}

fn tools() -> Arc<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register(sum_tool()).unwrap();
    Arc::new(tools)
}

fn orchestrator(
    provider: Arc<ScriptedProvider>,
    agents: AgentRegistry,
    config: RunConfig,
) -> Orchestrator {
    Orchestrator::new(
        provider as Arc<dyn LlmProvider>,
        tools(),
        Arc::new(agents),
        config,
    )
    .unwrap()
}

fn single(agent: AgentBuilder) -> AgentRegistry {
    let mut agents = AgentRegistry::new();
    agents.register(agent.build().unwrap()).unwrap();
    agents
}

#[tokio::test]
async fn plain_answer_on_empty_transcript() {
    let provider = Arc::new(ScriptedProvider::new([text("hi")]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("chat")),
        RunConfig::default(),
    );

    let result = orch.run("chat", Transcript::new(), "hello").await.unwrap();

    assert_eq!(result.output, "hi");
    assert_eq!(result.final_agent.name(), "chat");
    assert_eq!(result.turns, 1);
    assert_eq!(result.usage.total_tokens, 12);

    let messages = result.transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!((messages[0].role, messages[0].content.as_str()), (Role::User, "hello"));
    assert_eq!((messages[1].role, messages[1].content.as_str()), (Role::Assistant, "hi"));
    assert_eq!(messages[1].agent_name.as_deref(), Some("chat"));
}

#[tokio::test]
async fn tool_round_trip() {
    let provider = Arc::new(ScriptedProvider::new([
        tool_call("call-1", "sum", json!({"x": 2, "y": 3})),
        text("5"),
    ]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("math").tool("sum")),
        RunConfig::default(),
    );

    let result = orch.run("math", Transcript::new(), "2+3?").await.unwrap();
    assert_eq!(result.output, "5");

    let roles: Vec<Role> = result.transcript.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::Tool, Role::Assistant]);

    let tool_messages: Vec<&Message> = result
        .transcript
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(tool_messages.len(), 1);
    assert_eq!(tool_messages[0].content, "5");
    assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call-1"));
    assert_eq!(result.transcript.messages()[1].tool_calls[0].id, "call-1");

    let seen = provider.seen();
    assert_eq!(seen[0].tools, ["sum"]);
    assert_eq!(seen[1].messages.len(), 3);
    assert!(result.transcript.check_integrity().is_ok());
}

#[tokio::test]
async fn all_tool_results_precede_next_model_call() {
    let calls = vec![
        ToolCall::new("sum", json!({"x": 1, "y": 1})).with_id("a"),
        ToolCall::new("sum", json!({"x": 2, "y": 2})).with_id("b"),
        ToolCall::new("sum", json!({"x": 3, "y": 3})).with_id("c"),
    ];
    let provider = Arc::new(ScriptedProvider::new([
        ModelResponse::ToolCalls {
            content: "working".into(),
            calls,
        },
        text("2, 4 and 6"),
    ]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("math").tool("sum")),
        RunConfig::default(),
    );

    orch.run("math", Transcript::new(), "three sums").await.unwrap();

    let seen = provider.seen();
    let second = &seen[1];
    let tool_results: Vec<(&str, &str)> = second
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| (m.tool_call_id.as_deref().unwrap(), m.content.as_str()))
        .collect();
    assert_eq!(tool_results, [("a", "2"), ("b", "4"), ("c", "6")]);
}

#[tokio::test]
async fn handoff_payload_mismatch_aborts_without_callback() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = {
        let fired = fired.clone();
        move |_: &HandoffData| -> switchboard_core::Result<()> {
            fired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    };

    let mut agents = AgentRegistry::new();
    agents
        .register(
            AgentBuilder::new("triage")
                .handoff(
                    HandoffTarget::new("billing", "Billing")
                        .with_input_schema(InputSchema::new(vec![ParameterSchema::required(
                            "reason",
                            ParamType::String,
                            "why",
                        )]))
                        .with_callback(counter),
                )
                .build()
                .unwrap(),
        )
        .unwrap();
    agents.register(AgentBuilder::new("billing").build().unwrap()).unwrap();

    let provider = Arc::new(ScriptedProvider::new([handoff("billing", Some(json!({})))]));
    let orch = orchestrator(provider.clone(), agents, RunConfig::default());

    let err = orch
        .run("triage", Transcript::new(), "refund please")
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::HandoffPayload { ref target, .. } if target == "billing"));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn handoff_swaps_agent_and_keeps_history() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = {
        let fired = fired.clone();
        move |data: &HandoffData| -> switchboard_core::Result<()> {
            assert_eq!(data.from_agent, "triage");
            fired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    };

    let mut agents = AgentRegistry::new();
    agents
        .register(
            AgentBuilder::new("triage")
                .handoff(HandoffTarget::new("history", "History tutor").with_callback(counter))
                .build()
                .unwrap(),
        )
        .unwrap();
    agents
        .register(
            AgentBuilder::new("history")
                .instructions("You teach history.")
                .handoff(HandoffTarget::new("triage", "Back to triage"))
                .build()
                .unwrap(),
        )
        .unwrap();

    let provider = Arc::new(ScriptedProvider::new([
        handoff("history", None),
        text("Rome was founded in 753 BC."),
    ]));
    let orch = orchestrator(provider.clone(), agents, RunConfig::default());

    let result = orch
        .run("triage", Transcript::new(), "When was Rome founded?")
        .await
        .unwrap();

    assert_eq!(result.final_agent.name(), "history");
    assert_eq!(result.output, "Rome was founded in 753 BC.");
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    let seen = provider.seen();
    assert_eq!(seen[0].agent, "triage");
    assert_eq!(seen[0].handoffs, ["history"]);
    assert_eq!(seen[1].agent, "history");
    assert_eq!(seen[1].messages[0].content, "When was Rome founded?");

    let handoff_message = &result.transcript.messages()[1];
    assert_eq!(handoff_message.agent_name.as_deref(), Some("triage"));
    assert_eq!(
        handoff_message.handoff.as_ref().map(|h| h.target.as_str()),
        Some("history")
    );
    assert_eq!(
        result.transcript.last().and_then(|m| m.agent_name.as_deref()),
        Some("history")
    );
}

#[tokio::test]
async fn undeclared_handoff_is_fatal() {
    let mut agents = AgentRegistry::new();
    agents.register(AgentBuilder::new("triage").build().unwrap()).unwrap();
    agents.register(AgentBuilder::new("billing").build().unwrap()).unwrap();

    let provider = Arc::new(ScriptedProvider::new([handoff("billing", None), text("never")]));
    let orch = orchestrator(provider.clone(), agents, RunConfig::default());

    let err = orch.run("triage", Transcript::new(), "hi").await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::InvalidHandoff { ref from, ref to } if from == "triage" && to == "billing"
    ));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn turn_limit_returns_partial_transcript() {
    let provider = Arc::new(ScriptedProvider::repeating(tool_call(
        "loop",
        "sum",
        json!({"x": 1, "y": 1}),
    )));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("math").tool("sum")),
        RunConfig::default().with_max_turns(3),
    );

    let err = orch.run("math", Transcript::new(), "loop").await.unwrap_err();

    assert_eq!(provider.calls(), 3);
    let AgentError::TurnLimitExceeded { limit, transcript } = err else {
        panic!("expected turn limit, got {err}");
    };
    assert_eq!(limit, 3);
    // user + 3 × (assistant tool call + tool result)
    assert_eq!(transcript.len(), 7);
    assert_eq!(transcript.messages()[0].content, "loop");
}

#[tokio::test]
async fn bad_arguments_are_reported_to_the_model() {
    let provider = Arc::new(ScriptedProvider::new([
        tool_call("c1", "sum", json!({"x": 2})),
        tool_call("c2", "sum", json!({"x": 2, "y": 3})),
        text("5"),
    ]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("math").tool("sum")),
        RunConfig::default(),
    );

    let result = orch.run("math", Transcript::new(), "2+3").await.unwrap();
    assert_eq!(result.output, "5");

    let first_tool = &result.transcript.messages()[2];
    assert_eq!(first_tool.role, Role::Tool);
    assert_eq!(first_tool.tool_call_id.as_deref(), Some("c1"));
    let payload: Value = serde_json::from_str(&first_tool.content).unwrap();
    assert!(payload["error"].as_str().unwrap().contains("'y'"));
}

#[tokio::test]
async fn malformed_tool_block_is_reported_to_the_model() {
    let provider = Arc::new(ScriptedProvider::new([
        ModelResponse::decode(
            "Adding.\n```tool\n{\"tool\": \"sum\", \"arguments\": {x: 2, y: 3}}\n```",
        ),
        tool_call("c2", "sum", json!({"x": 2, "y": 3})),
        text("5"),
    ]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("math").tool("sum")),
        RunConfig::default(),
    );

    let result = orch.run("math", Transcript::new(), "2+3").await.unwrap();
    assert_eq!(result.output, "5");
    assert_eq!(provider.calls(), 3);

    let first_tool = &result.transcript.messages()[2];
    assert_eq!(first_tool.role, Role::Tool);
    let payload: Value = serde_json::from_str(&first_tool.content).unwrap();
    assert!(payload.get("error").is_some());
}

#[tokio::test]
async fn failure_budget_escalates() {
    let provider = Arc::new(ScriptedProvider::repeating(tool_call(
        "bad",
        "sum",
        json!({"x": "two", "y": 3}),
    )));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("math").tool("sum")),
        RunConfig::default().with_max_tool_failures(2),
    );

    let err = orch.run("math", Transcript::new(), "2+3").await.unwrap_err();
    assert!(matches!(err, AgentError::ToolArgument { ref tool, .. } if tool == "sum"));
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn undeclared_tool_is_fatal() {
    let provider = Arc::new(ScriptedProvider::new([tool_call(
        "c1",
        "sum",
        json!({"x": 1, "y": 2}),
    )]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("chat")),
        RunConfig::default(),
    );

    let err = orch.run("chat", Transcript::new(), "1+2").await.unwrap_err();
    assert!(matches!(err, AgentError::UnknownTool(ref name) if name == "sum"));
}

#[tokio::test]
async fn existing_history_is_a_prefix() {
    let mut history = Transcript::with_system_prompt("Stay in character.");
    history.push(Message::user("first"));
    history.push(Message::assistant("first answer").with_agent("chat"));

    let provider = Arc::new(ScriptedProvider::new([text("second answer")]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("chat")),
        RunConfig::default(),
    );

    let result = orch.run("chat", history.clone(), "second").await.unwrap();
    assert!(result.transcript.starts_with(&history));
    assert!(result.transcript.len() > history.len());
    assert_eq!(provider.seen()[0].messages.len(), 4);
}

#[tokio::test]
async fn empty_completion_is_an_error() {
    let provider = Arc::new(ScriptedProvider::new([text("   ")]));
    let orch = orchestrator(
        provider,
        single(AgentBuilder::new("chat")),
        RunConfig::default(),
    );

    let err = orch.run("chat", Transcript::new(), "hello").await.unwrap_err();
    assert!(matches!(err, AgentError::EmptyCompletion(_)));
}

#[tokio::test]
async fn context_cap_is_enforced() {
    let provider = Arc::new(ScriptedProvider::new([text("hi")]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("chat")),
        RunConfig::default().with_max_context_tokens(8),
    );

    let err = orch
        .run("chat", Transcript::new(), "a long question ".repeat(20))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::ContextOverflow { max: 8, .. }));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn corrupt_history_is_rejected() {
    let mut history = Transcript::new();
    history.push(Message::user("hi"));
    history.push(Message::tool("5", "nobody-asked"));

    let provider = Arc::new(ScriptedProvider::new([text("hi")]));
    let orch = orchestrator(
        provider.clone(),
        single(AgentBuilder::new("chat")),
        RunConfig::default(),
    );

    let err = orch.run("chat", history, "again").await.unwrap_err();
    assert!(matches!(err, AgentError::InvalidTranscript(_)));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn unknown_starting_agent() {
    let provider = Arc::new(ScriptedProvider::new([text("hi")]));
    let orch = orchestrator(
        provider,
        single(AgentBuilder::new("chat")),
        RunConfig::default(),
    );

    let err = orch.run("ghost", Transcript::new(), "hi").await.unwrap_err();
    assert!(matches!(err, AgentError::UnknownAgent(_)));
}

#[test]
fn wiring_errors_surface_at_construction() {
    let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::default());
    let agents = single(AgentBuilder::new("math").tool("missing"));
    let result = Orchestrator::new(provider, tools(), Arc::new(agents), RunConfig::default());
    assert!(matches!(result, Err(AgentError::UnknownTool(_))));
}
