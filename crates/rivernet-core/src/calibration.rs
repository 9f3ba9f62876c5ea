//! Calibration adapter: turns a network run into a scalar objective for an
//! external optimizer.
//!
//! Each evaluation applies a candidate parameter vector to one node, runs the
//! network up to the node where performance is judged, scores the simulated
//! series against observations and resets the network, so every trial starts
//! from the same initial conditions.

use petgraph::visit::{DfsPostOrder, Reversed};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::{ConfigurationError, DataAlignmentError, Error, SimulationError};
use crate::executor::{self, RunInputs};
use crate::forcing::Climate;
use crate::network::StreamNetwork;
use crate::traits::NodeModel;

type ScoreFn<'a> = Box<dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'a>;

/// Starting point and box bounds for one node's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    pub names: &'static [&'static str],
    /// Current parameter values.
    pub x0: Vec<f64>,
    pub bounds: Vec<(f64, f64)>,
}

/// Parameter names, current values and bounds of `node`.
///
/// `with_level` appends the stream-level rating parameters, for nodes
/// calibrated against gauged levels.
pub fn search_space(
    network: &StreamNetwork,
    node: &str,
    with_level: bool,
) -> Result<SearchSpace, ConfigurationError> {
    let node = network.get_node(node)?;
    let bounds = node.param_info(with_level);
    let x0 = if with_level {
        node.current_parameters_with_level()
    } else {
        node.current_parameters()
    };
    Ok(SearchSpace {
        names: bounds.names,
        x0,
        bounds: bounds.ranges(),
    })
}

/// `node` and everything upstream of it, upstream nodes first.
///
/// Calibrating in this order means each node is fitted against inflows from
/// already-calibrated upstream nodes.
pub fn calibration_order(network: &StreamNetwork, node: &str) -> Result<Vec<String>, ConfigurationError> {
    let start = network.resolve(node)?;
    let upstream = Reversed(&network.graph);
    let mut dfs = DfsPostOrder::new(upstream, start);
    let mut order = Vec::new();
    while let Some(ix) = dfs.next(upstream) {
        order.push(network.graph[ix].name().to_string());
    }
    Ok(order)
}

/// Scalar minimisation objective for one node of a network.
pub struct Objective<'a> {
    target: String,
    judged_at: Option<String>,
    variable: String,
    observed: Vec<f64>,
    climate: &'a Climate,
    inputs: RunInputs<'a>,
    metric: ScoreFn<'a>,
}

impl std::fmt::Debug for Objective<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Objective")
            .field("target", &self.target)
            .field("judged_at", &self.judged_at)
            .field("variable", &self.variable)
            .field("observed", &self.observed.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Objective<'a> {
    /// Score `target`'s outflow against `observed` with a higher-is-better
    /// `metric`.
    ///
    /// The run covers the first `observed.len()` climate timesteps.
    pub fn new<M>(
        target: impl Into<String>,
        observed: Vec<f64>,
        climate: &'a Climate,
        metric: M,
    ) -> Self
    where
        M: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'a,
    {
        Self {
            target: target.into(),
            judged_at: None,
            variable: "outflow".to_string(),
            observed,
            climate,
            inputs: RunInputs::default(),
            metric: Box::new(metric),
        }
    }

    /// Judge the target's parameters at a downstream node, e.g. a dam whose
    /// level is gauged. Evaluation fails with
    /// [`ConfigurationError::NotDownstream`] unless the target drains into it.
    pub fn run_through(mut self, node: impl Into<String>) -> Self {
        self.judged_at = Some(node.into());
        self
    }

    /// Compare a recorded variable other than outflow, e.g. `level`.
    pub fn variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn with_inputs(mut self, inputs: RunInputs<'a>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn judged_node(&self) -> &str {
        self.judged_at.as_deref().unwrap_or(&self.target)
    }

    /// Evaluate `1 - metric(observed, simulated)` for `params`.
    ///
    /// The network is reset before and after the run, whatever the outcome.
    /// The applied parameters persist on the target node.
    #[instrument(skip_all, fields(target = %self.target))]
    pub fn evaluate(&self, network: &mut StreamNetwork, params: &[f64]) -> Result<f64, Error> {
        network.reset();
        let outcome = self.score(network, params);
        network.reset();
        if let Ok(objective) = outcome {
            debug!(objective, "evaluated candidate");
        }
        outcome
    }

    fn score(&self, network: &mut StreamNetwork, params: &[f64]) -> Result<f64, Error> {
        let end = self.observed.len();
        if end > self.climate.len() {
            return Err(DataAlignmentError::LengthMismatch {
                name: format!("observations at {}", self.judged_node()),
                expected: self.climate.len(),
                got: end,
            }
            .into());
        }

        let judged = self.judged_node();
        if judged != self.target && !calibration_order(network, judged)?.contains(&self.target) {
            return Err(ConfigurationError::NotDownstream {
                node: self.target.clone(),
                judged_at: judged.to_string(),
            }
            .into());
        }

        network.update_parameters(&self.target, params)?;
        executor::run_node_until(network, judged, self.climate, end, &self.inputs)?;

        let node = network.get_node(judged)?;
        let simulated = node
            .output(&self.variable)
            .ok_or_else(|| SimulationError::UnknownOutput {
                node: judged.to_string(),
                variable: self.variable.clone(),
            })?;
        Ok(1.0 - (self.metric)(&self.observed, &simulated[..end]))
    }

    /// Evaluate many candidates in parallel.
    ///
    /// Each rayon worker owns a private clone of `network`; the original is
    /// left untouched. Results are in candidate order.
    pub fn evaluate_batch(
        &self,
        network: &StreamNetwork,
        candidates: &[Vec<f64>],
    ) -> Vec<Result<f64, Error>> {
        candidates
            .par_iter()
            .map_init(|| network.clone(), |net, params| self.evaluate(net, params))
            .collect()
    }
}
