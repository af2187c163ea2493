use crate::graph::{Graph, GraphError, Node};
use crate::run::{Run, StepRecord};
use crate::state::GraphState;
use crate::step::StepError;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Passed to the `on_step` hook after each applied step.
pub struct StepEvent<'a> {
    pub step: &'a str,
    pub duration: Duration,
    pub step_number: usize,
}

/// Passed to the `on_error` hook when a step errors or a limit is exceeded.
pub struct ErrorEvent<'a> {
    pub step: &'a str,
    pub error: &'a RunError,
    pub step_number: usize,
}

/// Why a run stopped without producing a [`Run`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: StepError,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("max_steps exceeded ({limit}), possible infinite loop in graph {graph}")]
    MaxSteps { graph: &'static str, limit: usize },
}

type StepHook = Box<dyn Fn(&StepEvent) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&ErrorEvent) + Send + Sync>;

/// Drives a [`Graph`] from its entry to its end marker.
pub struct Runner<S: GraphState> {
    graph: Graph<S>,
    max_steps: usize,
    on_step: Option<StepHook>,
    on_error: Option<ErrorHook>,
}

impl<S: GraphState> Runner<S> {
    pub fn new(graph: Graph<S>) -> Self {
        Self {
            graph,
            max_steps: DEFAULT_MAX_STEPS,
            on_step: None,
            on_error: None,
        }
    }

    /// Prevent accidental infinite loops.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }

    /// Register a callback that fires after each applied step.
    pub fn on_step(mut self, cb: impl Fn(&StepEvent) + Send + Sync + 'static) -> Self {
        self.on_step = Some(Box::new(cb));
        self
    }

    /// Register a callback that fires when a step errors or a limit is exceeded.
    pub fn on_error(mut self, cb: impl Fn(&ErrorEvent) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(cb));
        self
    }

    /// Set both hooks to log step transitions and errors through `tracing`.
    pub fn with_tracing(self) -> Self {
        let graph = self.graph.name();
        self.on_step(move |e| {
            tracing::info!(
                graph = graph,
                step = e.step,
                step_number = e.step_number,
                elapsed_ms = e.duration.as_secs_f64() * 1000.0,
                "step applied"
            );
        })
        .on_error(move |e| {
            tracing::error!(
                graph = graph,
                step = e.step,
                step_number = e.step_number,
                error = %e.error,
                "run failed"
            );
        })
    }

    /// Execute the graph from its entry.
    ///
    /// Each step's update is merged into the state and the merged state is
    /// recorded. The run ends when the successor of the current node is the
    /// end marker. Failures are returned as-is; no partial run is exposed.
    pub fn run(&self, initial: S) -> Result<Run<S>, RunError> {
        let mut state = initial;
        let mut history: Vec<StepRecord<S>> = Vec::new();
        let mut current = Node::Entry;
        let mut step_number: usize = 0;

        loop {
            let next = match self.graph.successor(current, &state) {
                Ok(next) => next,
                Err(err) => return Err(self.fail(current, step_number, err.into())),
            };

            let name = match next {
                Node::End => return Ok(Run::new(history, state)),
                Node::Step(name) => name,
                Node::Entry => {
                    let err = GraphError::InvalidTarget(Node::Entry);
                    return Err(self.fail(current, step_number, err.into()));
                }
            };

            if step_number >= self.max_steps {
                let err = RunError::MaxSteps {
                    graph: self.graph.name(),
                    limit: self.max_steps,
                };
                return Err(self.fail(next, step_number, err));
            }
            step_number += 1;

            let Some(step) = self.graph.step(name) else {
                let err = GraphError::UnknownStep(name);
                return Err(self.fail(next, step_number, err.into()));
            };

            let start = Instant::now();
            let result = step.run(&state);
            let duration = start.elapsed();

            let update = match result {
                Ok(update) => update,
                Err(source) => {
                    let err = RunError::Step { step: name, source };
                    return Err(self.fail(next, step_number, err));
                }
            };

            state.merge(update);
            history.push(StepRecord {
                step: name,
                state: state.clone(),
            });
            tracing::debug!(graph = self.graph.name(), step = name, step_number, "step merged");

            if let Some(cb) = &self.on_step {
                cb(&StepEvent {
                    step: name,
                    duration,
                    step_number,
                });
            }

            current = next;
        }
    }

    fn fail(&self, at: Node, step_number: usize, err: RunError) -> RunError {
        if let Some(cb) = &self.on_error {
            cb(&ErrorEvent {
                step: &at.to_string(),
                error: &err,
                step_number,
            });
        }
        err
    }
}
