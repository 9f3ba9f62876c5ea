//! Stream network: a directed graph of nodes with a single outlet each.
//!
//! Edges point downstream, from an inlet to the node it drains into. The
//! executor in [`crate::executor`] walks this graph recursively from the
//! terminal node(s) and caches which `(node, timestep)` pairs are done.

pub mod spec;

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{ConfigurationError, Error, ParameterError};
use crate::node::Node;
use crate::traits::NodeModel;

pub use spec::{parse_topology, ModelSpec, NodeSpec};

/// Per-run record of evaluated `(node, timestep)` pairs.
#[derive(Debug, Clone, Default)]
pub(crate) struct Memo {
    pub(crate) done: HashSet<(NodeIndex, usize)>,
    /// Pairs currently on the recursion stack.
    pub(crate) active: HashSet<(NodeIndex, usize)>,
}

impl Memo {
    pub(crate) fn clear(&mut self) {
        self.done.clear();
        self.active.clear();
    }
}

/// A validated, acyclic stream network.
#[derive(Debug, Clone)]
pub struct StreamNetwork {
    name: String,
    pub(crate) graph: DiGraph<Node, ()>,
    pub(crate) index: HashMap<String, NodeIndex>,
    /// Node indices, upstream before downstream.
    order: Vec<NodeIndex>,
    pub(crate) memo: Memo,
}

impl StreamNetwork {
    /// Build a network from a topology description.
    ///
    /// The description is a mapping of node name to node entry, or a list of
    /// entries each carrying a `name`. Every referenced inlet must exist,
    /// each node may drain into at most one other node, gauge identifiers
    /// must be unique and the flow graph must be acyclic.
    #[instrument(skip_all, fields(network = name), err)]
    pub fn build(name: &str, description: &Value) -> Result<Self, Error> {
        let entries = parse_topology(description)?;

        let mut graph = DiGraph::with_capacity(entries.len(), entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        let mut gauges = HashSet::with_capacity(entries.len());
        for (node_name, spec) in &entries {
            let node = Node::from_spec(node_name, spec)?;
            if !gauges.insert(node.gauge().to_string()) {
                return Err(ConfigurationError::DuplicateIdentifier {
                    id: node.gauge().to_string(),
                }
                .into());
            }
            index.insert(node_name.clone(), graph.add_node(node));
        }

        // downstream node for each inlet, from the inlet lists
        let mut drains_into: HashMap<&str, Vec<&str>> = HashMap::new();
        for (node_name, spec) in &entries {
            let mut seen = HashSet::new();
            for inlet in spec.inlets.iter().filter(|i| seen.insert(i.as_str())) {
                let Some(&from) = index.get(inlet) else {
                    return Err(ConfigurationError::UnknownNode {
                        node: node_name.clone(),
                        missing: inlet.clone(),
                    }
                    .into());
                };
                drains_into
                    .entry(inlet.as_str())
                    .or_default()
                    .push(node_name.as_str());
                graph.add_edge(from, index[node_name], ());
            }
        }

        for (node_name, downstream) in &drains_into {
            if downstream.len() > 1 {
                let mut outlets: Vec<String> = downstream.iter().map(|s| s.to_string()).collect();
                outlets.sort();
                return Err(ConfigurationError::MultipleOutlets {
                    node: node_name.to_string(),
                    outlets,
                }
                .into());
            }
        }

        for (node_name, spec) in &entries {
            check_declared_outlet(node_name, &spec.outlets, &index, &drains_into)?;
        }

        let order = toposort(&graph, None).map_err(|cycle| ConfigurationError::Cycle {
            node: graph[cycle.node_id()].name().to_string(),
        })?;

        info!(network = name, nodes = graph.node_count(), "built stream network");
        Ok(Self {
            name: name.to_string(),
            graph,
            index,
            order,
            memo: Memo::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Node names, upstream before downstream.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|&ix| self.graph[ix].name())
    }

    pub(crate) fn order(&self) -> &[NodeIndex] {
        &self.order
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<NodeIndex, ConfigurationError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownNode {
                node: String::new(),
                missing: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get_node(&self, name: &str) -> Result<&Node, ConfigurationError> {
        Ok(&self.graph[self.resolve(name)?])
    }

    pub fn get_node_mut(&mut self, name: &str) -> Result<&mut Node, ConfigurationError> {
        let ix = self.resolve(name)?;
        Ok(&mut self.graph[ix])
    }

    /// Look a node up by its gauge identifier rather than its name.
    pub fn get_gauge(&self, gauge: &str) -> Result<&Node, ConfigurationError> {
        self.graph
            .node_weights()
            .find(|n| n.gauge() == gauge)
            .ok_or_else(|| ConfigurationError::UnknownNode {
                node: String::new(),
                missing: gauge.to_string(),
            })
    }

    /// Names of the nodes draining directly into `name`.
    pub fn inlets(&self, name: &str) -> Result<Vec<&str>, ConfigurationError> {
        let ix = self.resolve(name)?;
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(ix, Direction::Incoming)
            .map(|up| self.graph[up].name())
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Name of the node `name` drains into, if any.
    pub fn outlet(&self, name: &str) -> Result<Option<&str>, ConfigurationError> {
        let ix = self.resolve(name)?;
        Ok(self
            .graph
            .neighbors_directed(ix, Direction::Outgoing)
            .next()
            .map(|down| self.graph[down].name()))
    }

    /// Nodes with no downstream neighbour.
    pub fn terminal_nodes(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|&&ix| {
                self.graph
                    .neighbors_directed(ix, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|&ix| self.graph[ix].name())
            .collect()
    }

    /// Nodes with no inlets.
    pub fn headwater_nodes(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|&&ix| {
                self.graph
                    .neighbors_directed(ix, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|&ix| self.graph[ix].name())
            .collect()
    }

    /// Replace the parameters of one node. Persists until the next call.
    pub fn update_parameters(&mut self, name: &str, values: &[f64]) -> Result<(), Error> {
        let node = self.get_node_mut(name)?;
        node.update_parameters(values)?;
        Ok(())
    }

    /// Replace parameters of several nodes; stops at the first failure.
    pub fn update_many<'a, I>(&mut self, updates: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (&'a str, &'a [f64])>,
    {
        for (name, values) in updates {
            self.update_parameters(name, values)?;
        }
        Ok(())
    }

    /// Current parameter vector of one node.
    pub fn current_parameters(&self, name: &str) -> Result<Vec<f64>, ConfigurationError> {
        Ok(self.get_node(name)?.current_parameters())
    }

    /// Check a parameter vector against a node's bounds without applying it.
    ///
    /// Accepts the flow parameters alone or followed by the stream-level
    /// rating parameters.
    pub fn check_parameters(&self, name: &str, values: &[f64]) -> Result<(), Error> {
        let node = self.get_node(name)?;
        let flow = node.param_info(false);
        let expected = flow.len();
        let bounds = if values.len() == expected {
            flow
        } else {
            node.param_info(true)
        };
        if values.len() != bounds.len() {
            return Err(ParameterError::WrongLength {
                model: node.model_type(),
                expected,
                got: values.len(),
            }
            .into());
        }
        for (i, (&v, (lo, hi))) in values.iter().zip(bounds.ranges()).enumerate() {
            if !(lo..=hi).contains(&v) {
                return Err(ParameterError::OutOfBounds {
                    name: bounds.names[i],
                    value: v,
                    min: lo,
                    max: hi,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Return every node to its initial state and clear the run memo.
    ///
    /// Parameters are left as they are.
    pub fn reset(&mut self) {
        for node in self.graph.node_weights_mut() {
            node.reset();
        }
        self.memo.clear();
        debug!(network = %self.name, "reset network");
    }
}

fn check_declared_outlet(
    node: &str,
    declared: &[String],
    index: &HashMap<String, NodeIndex>,
    drains_into: &HashMap<&str, Vec<&str>>,
) -> Result<(), ConfigurationError> {
    let mut declared: Vec<&String> = declared.iter().collect();
    declared.dedup();
    match declared.as_slice() {
        [] => Ok(()),
        [outlet] => {
            if !index.contains_key(outlet.as_str()) {
                return Err(ConfigurationError::UnknownNode {
                    node: node.to_string(),
                    missing: outlet.to_string(),
                });
            }
            match drains_into.get(node).and_then(|d| d.first()) {
                Some(actual) if *actual == outlet.as_str() => Ok(()),
                _ => Err(ConfigurationError::InconsistentOutlet {
                    node: node.to_string(),
                    declared: outlet.to_string(),
                }),
            }
        }
        many => Err(ConfigurationError::MultipleOutlets {
            node: node.to_string(),
            outlets: many.iter().map(|s| s.to_string()).collect(),
        }),
    }
}
