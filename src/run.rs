use serde::Serialize;

/// One applied step and the state right after its update was merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord<S> {
    pub step: &'static str,
    pub state: S,
}

/// The trajectory and final state of one graph execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run<S> {
    history: Vec<StepRecord<S>>,
    final_state: S,
}

impl<S> Run<S> {
    pub(crate) fn new(history: Vec<StepRecord<S>>, final_state: S) -> Self {
        Self {
            history,
            final_state,
        }
    }

    pub fn final_state(&self) -> &S {
        &self.final_state
    }

    pub fn into_final_state(self) -> S {
        self.final_state
    }

    pub fn history(&self) -> &[StepRecord<S>] {
        &self.history
    }

    /// Names of the applied steps, in order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.history.iter().map(|r| r.step).collect()
    }

    /// The state snapshot after the most recent run of `step`.
    pub fn last_state_of(&self, step: &str) -> Option<&S> {
        self.history
            .iter()
            .rev()
            .find(|r| r.step == step)
            .map(|r| &r.state)
    }
}
