//! A small step-graph executor, and a tool-calling agent loop built on it.
//!
//! Register named [`Step`]s in a [`Graph`], wire them with plain or routed
//! edges between the [`Node::Entry`] and [`Node::End`] markers, and let the
//! [`Runner`] drive it. Every step returns a partial update that is merged into
//! the state, and each merged state is recorded in the resulting [`Run`].
//!
//! [`Agent`] assembles the graph `message_prep -> llm_processor -> {tool_executor, end}`
//! with `tool_executor` looping back to `llm_processor`, and keeps the last run
//! of each named session in a [`SessionMemory`].
//!
//! # Quick start
//!
//! ```rust
//! use agent_graph::{FnStep, Graph, GraphState, Node, Runner};
//!
//! #[derive(Clone)]
//! struct State { n: i32 }
//!
//! impl GraphState for State {
//!     type Update = Option<i32>;
//!     fn merge(&mut self, update: Option<i32>) {
//!         if let Some(n) = update { self.n = n; }
//!     }
//! }
//!
//! let graph = Graph::builder("demo")
//!     .add_step(FnStep::new("add_one", |s: &State| Ok(Some(s.n + 1))))
//!     .connect(Node::Entry, "add_one")
//!     .connect("add_one", Node::End)
//!     .build()
//!     .unwrap();
//!
//! let run = Runner::new(graph).run(State { n: 0 }).unwrap();
//! assert_eq!(run.final_state().n, 1);
//! assert_eq!(run.step_names(), vec!["add_one"]);
//! ```

mod agent;
mod graph;
mod message;
pub mod model;
pub mod openai;
mod run;
mod runner;
mod session;
mod state;
mod step;
pub mod tools;

pub use agent::{Agent, DEFAULT_MAX_STEPS as AGENT_MAX_STEPS, LLM_PROCESSOR, MESSAGE_PREP, TOOL_EXECUTOR};
pub use graph::{Graph, GraphBuilder, GraphError, Node, Router};
pub use message::{Message, TokenUsage, ToolCall};
pub use model::{ChatModel, ModelConfig, ModelError, ModelResponse, ToolSchema};
pub use openai::OpenAiChat;
pub use run::{Run, StepRecord};
pub use runner::{ErrorEvent, RunError, Runner, StepEvent};
pub use session::SessionMemory;
pub use state::{AgentState, AgentUpdate, GraphState};
pub use step::{FnStep, Step, StepError, StepResult};
pub use tools::{FnTool, Tool, ToolError, ToolRegistry};
