use crate::state::GraphState;
use crate::step::Step;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A graph node: the entry marker, a registered step, or the end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Entry,
    Step(&'static str),
    End,
}

impl From<&'static str> for Node {
    fn from(name: &'static str) -> Self {
        Node::Step(name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Entry => write!(f, "__entry__"),
            Node::Step(name) => write!(f, "{name}"),
            Node::End => write!(f, "__end__"),
        }
    }
}

/// Picks a successor from the current state.
pub type Router<S> = Box<dyn Fn(&S) -> Node + Send + Sync>;

enum Edge<S> {
    Direct(Node),
    Routed {
        candidates: Vec<Node>,
        router: Router<S>,
    },
}

// ---------------------------------------------------------------------------
// GraphError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate step name: {0}")]
    DuplicateStep(&'static str),
    #[error("unknown step: {0}")]
    UnknownStep(&'static str),
    #[error("graph has no edge from the entry")]
    MissingEntry,
    #[error("{0} cannot have outgoing edges of this kind")]
    InvalidSource(Node),
    #[error("{0} cannot be an edge target")]
    InvalidTarget(Node),
    #[error("{0} already has outgoing edges")]
    DuplicateEdge(Node),
    #[error("routed edge from {0} has no candidates")]
    EmptyRoute(Node),
    #[error("step '{0}' has no outgoing edge")]
    MissingEdge(&'static str),
    #[error("router at {from} chose unregistered target {to}")]
    UnregisteredRoute { from: Node, to: Node },
}

// ---------------------------------------------------------------------------
// GraphBuilder
// ---------------------------------------------------------------------------

pub struct GraphBuilder<S: GraphState> {
    name: &'static str,
    steps: HashMap<&'static str, Box<dyn Step<S>>>,
    edges: HashMap<Node, Edge<S>>,
    error: Option<GraphError>,
}

impl<S: GraphState> GraphBuilder<S> {
    pub fn add_step<T: Step<S>>(mut self, step: T) -> Self {
        let name = step.name();
        if self.steps.contains_key(name) {
            self.record(GraphError::DuplicateStep(name));
        }
        self.steps.insert(name, Box::new(step));
        self
    }

    /// Add an unconditional edge `from -> to`.
    pub fn connect(mut self, from: impl Into<Node>, to: impl Into<Node>) -> Self {
        let from = from.into();
        if from == Node::End {
            self.record(GraphError::InvalidSource(from));
            return self;
        }
        self.insert_edge(from, Edge::Direct(to.into()));
        self
    }

    /// Add a routed edge: after `from` runs, `router` picks one of `candidates`.
    pub fn connect_routed<I, N, R>(mut self, from: impl Into<Node>, candidates: I, router: R) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
        R: Fn(&S) -> Node + Send + Sync + 'static,
    {
        let from = from.into();
        // Entry has out-degree 1 and End has none.
        if matches!(from, Node::Entry | Node::End) {
            self.record(GraphError::InvalidSource(from));
            return self;
        }
        let candidates: Vec<Node> = candidates.into_iter().map(Into::into).collect();
        if candidates.is_empty() {
            self.record(GraphError::EmptyRoute(from));
            return self;
        }
        self.insert_edge(
            from,
            Edge::Routed {
                candidates,
                router: Box::new(router),
            },
        );
        self
    }

    pub fn build(self) -> Result<Graph<S>, GraphError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        if !self.edges.contains_key(&Node::Entry) {
            return Err(GraphError::MissingEntry);
        }

        for (from, edge) in &self.edges {
            if let Node::Step(name) = from
                && !self.steps.contains_key(name)
            {
                return Err(GraphError::UnknownStep(*name));
            }
            let targets = match edge {
                Edge::Direct(to) => std::slice::from_ref(to),
                Edge::Routed { candidates, .. } => candidates.as_slice(),
            };
            for to in targets {
                match to {
                    Node::Entry => return Err(GraphError::InvalidTarget(*to)),
                    Node::Step(name) if !self.steps.contains_key(name) => {
                        return Err(GraphError::UnknownStep(*name));
                    }
                    _ => {}
                }
            }
        }

        // Every step needs a way out, otherwise the runner would strand there.
        let mut names: Vec<_> = self.steps.keys().copied().collect();
        names.sort_unstable();
        for name in names {
            if !self.edges.contains_key(&Node::Step(name)) {
                return Err(GraphError::MissingEdge(name));
            }
        }

        Ok(Graph {
            name: self.name,
            steps: self.steps,
            edges: self.edges,
        })
    }

    fn insert_edge(&mut self, from: Node, edge: Edge<S>) {
        if self.edges.contains_key(&from) {
            self.record(GraphError::DuplicateEdge(from));
        }
        self.edges.insert(from, edge);
    }

    // Keep the first problem; build() reports it.
    fn record(&mut self, err: GraphError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

// ---------------------------------------------------------------------------
// Graph (validated, only constructed via build())
// ---------------------------------------------------------------------------

pub struct Graph<S: GraphState> {
    name: &'static str,
    steps: HashMap<&'static str, Box<dyn Step<S>>>,
    edges: HashMap<Node, Edge<S>>,
}

impl<S: GraphState> Graph<S> {
    pub fn builder(name: &'static str) -> GraphBuilder<S> {
        GraphBuilder {
            name,
            steps: HashMap::new(),
            edges: HashMap::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn contains_step(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    // --- stuff the runner uses (keep pub(crate)) ---
    pub(crate) fn step(&self, name: &'static str) -> Option<&dyn Step<S>> {
        self.steps.get(name).map(|s| s.as_ref())
    }

    /// Resolve where to go after `from`, consulting the router if there is one.
    pub(crate) fn successor(&self, from: Node, state: &S) -> Result<Node, GraphError> {
        let edge = match from {
            Node::End => return Ok(Node::End),
            _ => self.edges.get(&from),
        };
        match edge {
            None => match from {
                Node::Step(name) => Err(GraphError::MissingEdge(name)),
                _ => Err(GraphError::MissingEntry),
            },
            Some(Edge::Direct(to)) => Ok(*to),
            Some(Edge::Routed { candidates, router }) => {
                let to = router(state);
                // End is always a legal way out, listed or not.
                if to == Node::End || candidates.contains(&to) {
                    Ok(to)
                } else {
                    Err(GraphError::UnregisteredRoute { from, to })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AgentState, AgentUpdate};
    use crate::step::StepResult;

    type S = AgentState;

    struct FakeStep(&'static str);

    impl Step<S> for FakeStep {
        fn name(&self) -> &'static str {
            self.0
        }
        fn run(&self, _state: &S) -> StepResult<S> {
            Ok(AgentUpdate::new())
        }
    }

    #[test]
    fn build_valid_graph() {
        let graph = Graph::builder("test")
            .add_step(FakeStep("a"))
            .add_step(FakeStep("b"))
            .connect(Node::Entry, "a")
            .connect("a", "b")
            .connect("b", Node::End)
            .build()
            .unwrap();

        assert_eq!(graph.name(), "test");
        assert!(graph.contains_step("a"));
        let state = S::default();
        assert_eq!(graph.successor(Node::Entry, &state), Ok(Node::Step("a")));
        assert_eq!(graph.successor("a".into(), &state), Ok(Node::Step("b")));
        assert_eq!(graph.successor("b".into(), &state), Ok(Node::End));
    }

    #[test]
    fn missing_entry_on_empty_builder() {
        let err = Graph::<S>::builder("test").build().err().unwrap();
        assert_eq!(err, GraphError::MissingEntry);
    }

    #[test]
    fn unknown_edge_target() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .connect(Node::Entry, "a")
            .connect("a", "missing")
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::UnknownStep("missing"));
    }

    #[test]
    fn unknown_edge_source() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .connect(Node::Entry, "a")
            .connect("a", Node::End)
            .connect("ghost", "a")
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::UnknownStep("ghost"));
    }

    #[test]
    fn duplicate_step_rejected() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .add_step(FakeStep("a"))
            .connect(Node::Entry, "a")
            .connect("a", Node::End)
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::DuplicateStep("a"));
    }

    #[test]
    fn second_edge_from_same_node_rejected() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .add_step(FakeStep("b"))
            .connect(Node::Entry, "a")
            .connect(Node::Entry, "b")
            .connect("a", Node::End)
            .connect("b", Node::End)
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::DuplicateEdge(Node::Entry));
    }

    #[test]
    fn step_without_outgoing_edge_rejected() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .connect(Node::Entry, "a")
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::MissingEdge("a"));
    }

    #[test]
    fn entry_cannot_be_routed() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .connect_routed(Node::Entry, ["a"], |_: &S| Node::Step("a"))
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::InvalidSource(Node::Entry));
    }

    #[test]
    fn end_cannot_have_edges() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .connect(Node::Entry, "a")
            .connect("a", Node::End)
            .connect(Node::End, "a")
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::InvalidSource(Node::End));
    }

    #[test]
    fn entry_cannot_be_target() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .connect(Node::Entry, "a")
            .connect("a", Node::Entry)
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::InvalidTarget(Node::Entry));
    }

    #[test]
    fn empty_route_rejected() {
        let err = Graph::builder("test")
            .add_step(FakeStep("a"))
            .connect(Node::Entry, "a")
            .connect_routed("a", Vec::<Node>::new(), |_: &S| Node::End)
            .build()
            .err()
            .unwrap();

        assert_eq!(err, GraphError::EmptyRoute(Node::Step("a")));
    }

    #[test]
    fn router_picks_from_state() {
        let graph = Graph::builder("test")
            .add_step(FakeStep("a"))
            .add_step(FakeStep("b"))
            .connect(Node::Entry, "a")
            .connect_routed("a", [Node::Step("b"), Node::End], |s: &S| {
                if s.total_tokens > 0 { Node::Step("b") } else { Node::End }
            })
            .connect("b", Node::End)
            .build()
            .unwrap();

        let mut state = S::default();
        assert_eq!(graph.successor("a".into(), &state), Ok(Node::End));
        state.total_tokens = 1;
        assert_eq!(graph.successor("a".into(), &state), Ok(Node::Step("b")));
    }

    #[test]
    fn router_may_end_without_listing_end() {
        let graph = Graph::builder("test")
            .add_step(FakeStep("a"))
            .add_step(FakeStep("b"))
            .connect(Node::Entry, "a")
            .connect_routed("a", [Node::Step("b")], |_: &S| Node::End)
            .connect("b", Node::End)
            .build()
            .unwrap();

        assert_eq!(graph.successor("a".into(), &S::default()), Ok(Node::End));
    }

    #[test]
    fn router_outside_candidates_is_error() {
        let graph = Graph::builder("test")
            .add_step(FakeStep("a"))
            .add_step(FakeStep("b"))
            .connect(Node::Entry, "a")
            .connect_routed("a", [Node::End], |_: &S| Node::Step("b"))
            .connect("b", Node::End)
            .build()
            .unwrap();

        let err = graph.successor("a".into(), &S::default()).err().unwrap();
        assert_eq!(
            err,
            GraphError::UnregisteredRoute {
                from: Node::Step("a"),
                to: Node::Step("b"),
            }
        );
    }
}
