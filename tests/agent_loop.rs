use agent_graph::{
    Agent, AgentState, ChatModel, FnTool, LLM_PROCESSOR, MESSAGE_PREP, Message, ModelError, ModelResponse,
    SessionMemory, TOOL_EXECUTOR, TokenUsage, Tool, ToolCall, ToolSchema,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;

/// Replays canned responses in order.
struct Scripted(Mutex<VecDeque<ModelResponse>>);

impl Scripted {
    fn new(responses: Vec<ModelResponse>) -> Self {
        Self(Mutex::new(responses.into()))
    }
}

impl ChatModel for Scripted {
    fn invoke(&self, _messages: &[Message], _tools: &[ToolSchema]) -> Result<ModelResponse, ModelError> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::Transport("script exhausted".into()))
    }
}

/// Answers every transcript with the text of its last user entry.
struct Parrot;

impl ChatModel for Parrot {
    fn invoke(&self, messages: &[Message], _tools: &[ToolSchema]) -> Result<ModelResponse, ModelError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role() == "user")
            .map(|m| m.content().to_string())
            .unwrap_or_default();
        Ok(ModelResponse::text(last_user).with_usage(TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
        }))
    }
}

fn recording_tool(calls: Arc<Mutex<Vec<Value>>>) -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "weather",
        "Look up the weather",
        json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        move |args| {
            calls.lock().unwrap().push(Value::Object(args));
            Ok(json!({"forecast": "sunny"}))
        },
    ))
}

fn usage(total: u64) -> TokenUsage {
    TokenUsage {
        total_tokens: total,
        ..TokenUsage::default()
    }
}

#[test]
fn no_tool_calls_ends_after_first_model_turn() {
    let agent = Agent::with_model(Scripted::new(vec![ModelResponse::text("hi there")]), "sys", vec![]).unwrap();

    let run = agent.invoke("hello", Some("s1")).unwrap();

    assert_eq!(run.step_names(), vec![MESSAGE_PREP, LLM_PROCESSOR]);
    let messages = &run.final_state().messages;
    assert_eq!(
        messages,
        &vec![
            Message::system("sys"),
            Message::user("hello"),
            Message::assistant("hi there", vec![]),
        ]
    );
}

#[test]
fn one_tool_round_trip() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let call = ToolCall::new("call_1", "weather", r#"{"city": "Porto"}"#);
    let agent = Agent::with_model(
        Scripted::new(vec![
            ModelResponse::text("").with_tool_calls(vec![call.clone()]),
            ModelResponse::text("Sunny in Porto."),
        ]),
        "sys",
        vec![recording_tool(Arc::clone(&calls))],
    )
    .unwrap();

    let run = agent.invoke("weather in Porto?", None).unwrap();

    assert_eq!(
        run.step_names(),
        vec![MESSAGE_PREP, LLM_PROCESSOR, TOOL_EXECUTOR, LLM_PROCESSOR]
    );
    let state = run.final_state();
    assert_eq!(state.messages.len(), 5);
    assert_eq!(state.messages[2], Message::assistant("", vec![call]));
    assert_eq!(
        state.messages[3],
        Message::tool(r#"{"forecast":"sunny"}"#, "call_1", "weather")
    );
    assert_eq!(state.messages[4], Message::assistant("Sunny in Porto.", vec![]));
    assert!(state.current_tool_calls.is_empty());
    assert_eq!(*calls.lock().unwrap(), vec![json!({"city": "Porto"})]);
}

#[test]
fn invalid_arguments_still_invoke_tool_with_nothing() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let agent = Agent::with_model(
        Scripted::new(vec![
            ModelResponse::text("").with_tool_calls(vec![ToolCall::new("c1", "weather", "city=Porto")]),
            ModelResponse::text("done"),
        ]),
        "sys",
        vec![recording_tool(Arc::clone(&calls))],
    )
    .unwrap();

    let run = agent.invoke("go", None).unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![json!({})]);
    assert!(run.final_state().messages.iter().any(|m| matches!(
        m,
        Message::Tool { tool_call_id, .. } if tool_call_id == "c1"
    )));
}

#[test]
fn unknown_tool_gets_no_response_entry() {
    let agent = Agent::with_model(
        Scripted::new(vec![
            ModelResponse::text("").with_tool_calls(vec![ToolCall::new("c9", "teleport", "{}")]),
            ModelResponse::text("could not"),
        ]),
        "sys",
        vec![],
    )
    .unwrap();

    let run = agent.invoke("beam me up", None).unwrap();

    let state = run.final_state();
    assert!(!state.messages.iter().any(|m| m.role() == "tool"));
    assert_eq!(state.last_answer(), Some("could not"));
    assert_eq!(
        run.step_names(),
        vec![MESSAGE_PREP, LLM_PROCESSOR, TOOL_EXECUTOR, LLM_PROCESSOR]
    );
}

#[test]
fn token_counter_sums_reported_usage() {
    let agent = Agent::with_model(
        Scripted::new(vec![
            ModelResponse::text("")
                .with_tool_calls(vec![ToolCall::new("a", "none", "{}")])
                .with_usage(usage(10)),
            ModelResponse::text("")
                .with_tool_calls(vec![ToolCall::new("b", "none", "{}")]),
            ModelResponse::text("end").with_usage(usage(7)),
        ]),
        "sys",
        vec![],
    )
    .unwrap();

    let run = agent.invoke("count", None).unwrap();
    assert_eq!(run.final_state().total_tokens, 17);
}

#[test]
fn continuation_keeps_both_exchanges_in_order() {
    let agent = Agent::with_model(Parrot, "sys", vec![]).unwrap();

    agent.invoke("q1", Some("s")).unwrap();
    let run = agent.invoke("q2", Some("s")).unwrap();

    let contents: Vec<(&str, &str)> = run
        .final_state()
        .messages
        .iter()
        .map(|m| (m.role(), m.content()))
        .collect();
    assert_eq!(
        contents,
        vec![
            ("system", "sys"),
            ("user", "q1"),
            ("assistant", "q1"),
            ("user", "q2"),
            ("assistant", "q2"),
        ]
    );
    // The counter restarts on every invoke.
    assert_eq!(run.final_state().total_tokens, 2);
}

#[test]
fn calls_without_session_never_see_each_other() {
    let agent = Agent::with_model(Parrot, "sys", vec![]).unwrap();

    let first = agent.invoke("first", None).unwrap();
    let second = agent.invoke("second", None).unwrap();

    assert_eq!(second.final_state().messages.len(), 3);
    assert!(!second.final_state().messages.iter().any(|m| m.content() == "first"));
    assert_ne!(first.final_state().session_id, second.final_state().session_id);
    assert!(agent.memory().session_ids().is_empty());
}

#[test]
fn session_overwrites_last_run() {
    let memory = Arc::new(SessionMemory::<AgentState>::new());
    let agent = Agent::with_model(Parrot, "sys", vec![])
        .unwrap()
        .with_memory(Arc::clone(&memory));

    agent.invoke("q1", Some("s")).unwrap();
    agent.invoke("q2", Some("s")).unwrap();

    let stored = memory.get_last("s").unwrap();
    assert_eq!(stored.final_state().user_query, "q2");
    assert_eq!(stored.final_state().messages.len(), 5);
}

#[test]
fn concurrent_invokes_on_one_session_do_not_lose_turns() {
    let agent = Arc::new(Agent::with_model(Parrot, "sys", vec![]).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let agent = Arc::clone(&agent);
            thread::spawn(move || {
                for j in 0..5 {
                    agent.invoke(&format!("t{i}-{j}"), Some("shared")).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let stored = agent.memory().get_last("shared").unwrap();
    // system + 20 user/assistant pairs
    assert_eq!(stored.final_state().messages.len(), 41);
}

#[test]
fn history_snapshots_track_each_step() {
    let agent = Agent::with_model(Scripted::new(vec![ModelResponse::text("ok")]), "sys", vec![]).unwrap();

    let run = agent.invoke("hi", Some("snap")).unwrap();

    let history = run.history();
    assert_eq!(history[0].state.messages.len(), 2);
    assert_eq!(history[1].state.messages.len(), 3);
    assert!(history.iter().all(|r| r.state.session_id == "snap"));
}
