use crate::model::ModelError;
use crate::state::GraphState;
use thiserror::Error;

/// The result of running a step: a partial update to merge into the state.
pub type StepResult<S> = Result<<S as GraphState>::Update, StepError>;

/// A named state transformation.
///
/// Steps read the current state and return only the fields they change. They
/// are built once with the graph and may run many times within a single run,
/// so they take `&self`.
pub trait Step<S: GraphState>: Send + Sync + 'static {
    /// A unique name for this step, used for edges and run history.
    fn name(&self) -> &'static str;

    /// Run once against the current state.
    fn run(&self, state: &S) -> StepResult<S>;
}

/// Adapts a closure into a [`Step`].
pub struct FnStep<F> {
    name: &'static str,
    f: F,
}

impl<F> FnStep<F> {
    pub fn new<S>(name: &'static str, f: F) -> Self
    where
        S: GraphState,
        F: Fn(&S) -> StepResult<S> + Send + Sync + 'static,
    {
        Self { name, f }
    }
}

impl<S, F> Step<S> for FnStep<F>
where
    S: GraphState,
    F: Fn(&S) -> StepResult<S> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, state: &S) -> StepResult<S> {
        (self.f)(state)
    }
}

/// Error type for steps, with variants designed around what the caller can
/// do about them.
///
/// I/O and HTTP errors convert with `?`, so custom steps can stay terse:
///
/// ```rust
/// use agent_graph::{FnStep, GraphState, Step, StepError};
///
/// #[derive(Clone)]
/// struct Doc { path: String, text: String }
///
/// impl GraphState for Doc {
///     type Update = String;
///     fn merge(&mut self, text: String) { self.text = text; }
/// }
///
/// let load = FnStep::new("load", |d: &Doc| {
///     if d.path.is_empty() {
///         return Err(StepError::invalid("no path"));
///     }
///     Ok(std::fs::read_to_string(&d.path)?)
/// });
///
/// let missing = Doc { path: "/definitely/not/here".into(), text: String::new() };
/// assert!(matches!(load.run(&missing), Err(StepError::Other(_))));
///
/// let blank = Doc { path: String::new(), text: String::new() };
/// assert!(matches!(load.run(&blank), Err(StepError::Invalid(_))));
/// ```
#[derive(Debug, Error)]
pub enum StepError {
    /// Bad input or step logic error. Don't retry, fix the code.
    #[error("invalid: {0}")]
    Invalid(String),
    /// Transient failure (network, rate limit). Retrying might help.
    #[error("transient: {0}")]
    Transient(String),
    /// The model client failed.
    #[error("model: {0}")]
    Model(#[from] ModelError),
    /// A resolved tool returned an error.
    #[error("tool '{name}' failed: {message}")]
    Tool { name: String, message: String },
    /// Everything else. Inspect the message for details.
    #[error("{0}")]
    Other(String),
}

impl From<ureq::Error> for StepError {
    fn from(e: ureq::Error) -> Self {
        StepError::Transient(e.to_string())
    }
}

impl From<std::io::Error> for StepError {
    fn from(e: std::io::Error) -> Self {
        StepError::Other(e.to_string())
    }
}

impl StepError {
    /// Create an [`Invalid`](StepError::Invalid) error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        StepError::Invalid(msg.into())
    }

    /// Create an [`Other`](StepError::Other) error.
    pub fn other(msg: impl Into<String>) -> Self {
        StepError::Other(msg.into())
    }

    /// Create a [`Transient`](StepError::Transient) error.
    pub fn transient(msg: impl Into<String>) -> Self {
        StepError::Transient(msg.into())
    }
}
