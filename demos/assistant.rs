//! Talks to an OpenAI-compatible endpoint with a couple of tools.
//!
//! OPENAI_API_KEY=... cargo run --example assistant -- gpt-4o-mini

use agent_graph::tools::{ListDirTool, ReadFileTool};
use agent_graph::{Agent, FnTool, Tool};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let model = std::env::args().nth(1).unwrap_or_else(|| "gpt-4o-mini".to_string());

    let clock: Arc<dyn Tool> = Arc::new(FnTool::new(
        "unix_time",
        "Current Unix time in seconds.",
        json!({"type": "object", "properties": {}}),
        |_| {
            let secs = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            Ok(json!(secs))
        },
    ));

    let agent = Agent::new(
        model,
        "You are a terse assistant. Use tools when they help.",
        vec![clock, Arc::new(ReadFileTool::new()), Arc::new(ListDirTool::new())],
        0.2,
        None,
        None,
    )
    .unwrap()
    .with_tracing();

    for query in [
        "What Unix time is it right now?",
        "Which files are in the current directory?",
        "Summarize what you told me so far in one sentence.",
    ] {
        println!("> {query}");
        match agent.invoke(query, Some("demo")) {
            Ok(run) => {
                let state = run.final_state();
                println!("{}", state.last_answer().unwrap_or("(no answer)"));
                println!("  steps: {:?}, tokens: {}\n", run.step_names(), state.total_tokens);
            }
            Err(e) => eprintln!("error: {e}\n"),
        }
    }
}
