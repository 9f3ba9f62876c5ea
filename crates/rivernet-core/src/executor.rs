//! Recursive network executor.
//!
//! A node is evaluated at timestep `t` only after every inlet has produced
//! its output for `t`; missing upstream results are computed on demand by
//! recursing towards the headwaters. The network's memo records finished
//! `(node, timestep)` pairs so repeated requests within a timestep are served
//! from the node's outflow history.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;
use petgraph::visit::{Dfs, Reversed};
use petgraph::Direction;
use smallvec::SmallVec;
use tracing::{debug, info, instrument, trace};

use crate::error::{ConfigurationError, DataAlignmentError, Error, SimulationError};
use crate::forcing::Climate;
use crate::network::StreamNetwork;
use crate::node::Node;
use crate::traits::NodeModel;

/// Per-node time series keyed by node name.
pub type NodeSeries = BTreeMap<String, Vec<f64>>;

/// Optional exogenous series applied during a run.
///
/// All series are indexed by timestep and keyed by node name. Nodes without
/// an entry receive zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunInputs<'a> {
    /// Extra inflow [ML/timestep] added to a node's upstream inflow.
    pub inflow: Option<&'a NodeSeries>,
    /// Scheduled extraction [ML/timestep].
    pub water_order: Option<&'a NodeSeries>,
    /// Signed groundwater exchange [ML/timestep].
    pub exchange: Option<&'a NodeSeries>,
}

impl<'a> RunInputs<'a> {
    pub fn with_inflow(mut self, inflow: &'a NodeSeries) -> Self {
        self.inflow = Some(inflow);
        self
    }

    pub fn with_water_order(mut self, water_order: &'a NodeSeries) -> Self {
        self.water_order = Some(water_order);
        self
    }

    pub fn with_exchange(mut self, exchange: &'a NodeSeries) -> Self {
        self.exchange = Some(exchange);
        self
    }

    fn series(&self) -> [(&'static str, Option<&'a NodeSeries>); 3] {
        [
            ("inflow", self.inflow),
            ("water_order", self.water_order),
            ("exchange", self.exchange),
        ]
    }
}

fn value_at(
    series: Option<&NodeSeries>,
    label: &str,
    node: &str,
    timestep: usize,
) -> Result<f64, DataAlignmentError> {
    let Some(values) = series.and_then(|s| s.get(node)) else {
        return Ok(0.0);
    };
    values
        .get(timestep)
        .copied()
        .ok_or_else(|| DataAlignmentError::MissingTimestep {
            name: format!("{label} of {node}"),
            timestep,
            len: values.len(),
        })
}

/// Evaluate `node` at `timestep`, first pulling every upstream node.
///
/// Returns the node's outflow [ML/timestep]. A node already evaluated at
/// `timestep` is not stepped again.
pub fn run_step(
    network: &mut StreamNetwork,
    node: &str,
    climate: &Climate,
    timestep: usize,
    inputs: &RunInputs<'_>,
) -> Result<f64, Error> {
    let ix = network.resolve(node)?;
    step_index(network, ix, climate, timestep, inputs)
}

fn step_index(
    network: &mut StreamNetwork,
    ix: NodeIndex,
    climate: &Climate,
    timestep: usize,
    inputs: &RunInputs<'_>,
) -> Result<f64, Error> {
    let key = (ix, timestep);
    if network.memo.done.contains(&key) {
        if let Some(&q) = network.graph[ix].outflow().get(timestep) {
            return Ok(q);
        }
        // history was cleared behind the memo's back
        network.memo.done.remove(&key);
    }
    if !network.memo.active.insert(key) {
        return Err(ConfigurationError::Cycle {
            node: network.graph[ix].name().to_string(),
        }
        .into());
    }
    let result = evaluate(network, ix, climate, timestep, inputs);
    network.memo.active.remove(&key);
    if result.is_ok() {
        network.memo.done.insert(key);
    }
    result
}

fn evaluate(
    network: &mut StreamNetwork,
    ix: NodeIndex,
    climate: &Climate,
    timestep: usize,
    inputs: &RunInputs<'_>,
) -> Result<f64, Error> {
    let mut outlets = network.graph.neighbors_directed(ix, Direction::Outgoing);
    if let (Some(_), Some(_)) = (outlets.next(), outlets.next()) {
        let outlets = network
            .graph
            .neighbors_directed(ix, Direction::Outgoing)
            .map(|down| network.graph[down].name().to_string())
            .collect();
        return Err(ConfigurationError::MultipleOutlets {
            node: network.graph[ix].name().to_string(),
            outlets,
        }
        .into());
    }

    let upstream: SmallVec<[NodeIndex; 4]> = network
        .graph
        .neighbors_directed(ix, Direction::Incoming)
        .collect();
    let mut inflow = 0.0;
    for up in upstream {
        inflow += step_index(network, up, climate, timestep, inputs)?;
    }

    let node = &network.graph[ix];
    let completed = node.timesteps_completed();
    if completed != timestep {
        return Err(SimulationError::OutOfOrder {
            node: node.name().to_string(),
            expected: completed,
            got: timestep,
        }
        .into());
    }
    let forcing = climate.sample(node.gauge(), timestep)?;
    inflow += value_at(inputs.inflow, "inflow", node.name(), timestep)?;
    let extraction = value_at(inputs.water_order, "water_order", node.name(), timestep)?;
    let exchange = value_at(inputs.exchange, "exchange", node.name(), timestep)?;

    let node = &mut network.graph[ix];
    let q = node.step(&forcing, inflow, extraction, exchange)?;
    trace!(node = node.name(), timestep, inflow, outflow = q, "stepped");
    Ok(q)
}

/// Check, before any node is stepped, that every node feeding `target` has
/// climate data and that supplied series cover `end` timesteps.
fn validate_inputs(
    network: &StreamNetwork,
    target: NodeIndex,
    climate: &Climate,
    end: usize,
    inputs: &RunInputs<'_>,
) -> Result<(), DataAlignmentError> {
    if end > climate.len() {
        return Err(DataAlignmentError::MissingTimestep {
            name: "climate".to_string(),
            timestep: end.saturating_sub(1),
            len: climate.len(),
        });
    }
    let upstream = Reversed(&network.graph);
    let mut dfs = Dfs::new(upstream, target);
    while let Some(ix) = dfs.next(upstream) {
        let node = &network.graph[ix];
        climate.require_gauge(node.gauge())?;
        for (label, series) in inputs.series() {
            if let Some(values) = series.and_then(|s| s.get(node.name())) {
                if values.len() < end {
                    return Err(DataAlignmentError::LengthMismatch {
                        name: format!("{label} of {}", node.name()),
                        expected: climate.len(),
                        got: values.len(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Run `node` and everything upstream of it over the first `end` timesteps.
///
/// Returns the node's outflow history.
#[instrument(skip_all, fields(network = network.name(), node = node, end = end))]
pub fn run_node_until(
    network: &mut StreamNetwork,
    node: &str,
    climate: &Climate,
    end: usize,
    inputs: &RunInputs<'_>,
) -> Result<Vec<f64>, Error> {
    let ix = network.resolve(node)?;
    validate_inputs(network, ix, climate, end, inputs)?;
    for t in 0..end {
        step_index(network, ix, climate, t, inputs)?;
    }
    let outflow = network.graph[ix].outflow();
    debug!(
        timesteps = end,
        mean_outflow = outflow.iter().sum::<f64>() / end.max(1) as f64,
        "node run complete"
    );
    Ok(outflow.to_vec())
}

/// Run `node` and everything upstream of it over the whole climate period.
pub fn run_node(
    network: &mut StreamNetwork,
    node: &str,
    climate: &Climate,
    inputs: &RunInputs<'_>,
) -> Result<Vec<f64>, Error> {
    run_node_until(network, node, climate, climate.len(), inputs)
}

/// Run every terminal node, and so the whole network, over the climate period.
///
/// Returns the outflow of each terminal node, keyed by name.
#[instrument(skip_all, fields(network = network.name()))]
pub fn run_catchment(
    network: &mut StreamNetwork,
    climate: &Climate,
    inputs: &RunInputs<'_>,
) -> Result<NodeSeries, Error> {
    let terminals: Vec<String> = network
        .terminal_nodes()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut outflows = NodeSeries::new();
    for name in terminals {
        let q = run_node(network, &name, climate, inputs)?;
        outflows.insert(name, q);
    }
    info!(
        terminals = outflows.len(),
        timesteps = climate.len(),
        "catchment run complete"
    );
    Ok(outflows)
}

/// Run a single node outside any network, with explicit external series.
///
/// The node must be freshly reset. Each supplied series must cover the
/// climate period.
pub fn run_isolated(
    node: &mut Node,
    climate: &Climate,
    inflow: Option<&[f64]>,
    water_order: Option<&[f64]>,
    exchange: Option<&[f64]>,
) -> Result<Vec<f64>, Error> {
    climate.require_gauge(node.gauge())?;
    for (label, series) in [
        ("inflow", inflow),
        ("water_order", water_order),
        ("exchange", exchange),
    ] {
        if let Some(values) = series {
            if values.len() != climate.len() {
                return Err(DataAlignmentError::LengthMismatch {
                    name: format!("{label} of {}", node.name()),
                    expected: climate.len(),
                    got: values.len(),
                }
                .into());
            }
        }
    }

    let at = |series: Option<&[f64]>, t: usize| series.map_or(0.0, |s| s[t]);
    for t in 0..climate.len() {
        let completed = node.timesteps_completed();
        if completed != t {
            return Err(SimulationError::OutOfOrder {
                node: node.name().to_string(),
                expected: completed,
                got: t,
            }
            .into());
        }
        let forcing = climate.sample(node.gauge(), t)?;
        node.step(&forcing, at(inflow, t), at(water_order, t), at(exchange, t))?;
    }
    debug!(node = node.name(), timesteps = climate.len(), "isolated run complete");
    Ok(node.outflow().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::EvapKind;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use serde_json::json;

    fn climate(gauges: &[&str], n: usize) -> Climate {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let dates = start.iter_days().take(n).collect();
        let rain: Vec<f64> = (0..n).map(|t| if t % 3 == 0 { 12.0 } else { 0.5 }).collect();
        gauges.iter().fold(
            Climate::new(dates, EvapKind::Evapotranspiration).unwrap(),
            |c, g| c.with_gauge(*g, rain.clone(), vec![3.0; n]).unwrap(),
        )
    }

    fn chain() -> StreamNetwork {
        StreamNetwork::build(
            "chain",
            &json!({
                "A": {"node_type": "IHACRES", "area": 50.0},
                "B": {"node_type": "IHACRES", "area": 20.0, "inlets": ["A"]},
                "C": {"node_type": "Dam", "max_store": 500.0, "initial_volume": 490.0, "inlets": ["B"]}
            }),
        )
        .unwrap()
    }

    #[test]
    fn step_pulls_upstream_nodes() {
        let mut net = chain();
        let c = climate(&["A", "B", "C"], 5);
        run_step(&mut net, "C", &c, 0, &RunInputs::default()).unwrap();
        for name in ["A", "B", "C"] {
            assert_eq!(net.get_node(name).unwrap().timesteps_completed(), 1);
        }
    }

    #[test]
    fn repeated_step_is_memoised() {
        let mut net = chain();
        let c = climate(&["A", "B", "C"], 5);
        let first = run_step(&mut net, "C", &c, 0, &RunInputs::default()).unwrap();
        let again = run_step(&mut net, "C", &c, 0, &RunInputs::default()).unwrap();
        run_step(&mut net, "B", &c, 0, &RunInputs::default()).unwrap();
        assert_eq!(first, again);
        assert_eq!(net.get_node("A").unwrap().timesteps_completed(), 1);
    }

    #[test]
    fn upstream_outflow_feeds_downstream() {
        let mut net = chain();
        let c = climate(&["A", "B", "C"], 1);
        run_step(&mut net, "B", &c, 0, &RunInputs::default()).unwrap();
        let a = net.get_node("A").unwrap().outflow()[0];
        let b_inflow = net.get_node("B").unwrap().output("inflow").unwrap()[0];
        assert_relative_eq!(a, b_inflow);
    }

    #[test]
    fn skipping_a_timestep_is_out_of_order() {
        let mut net = chain();
        let c = climate(&["A", "B", "C"], 5);
        let err = run_step(&mut net, "A", &c, 2, &RunInputs::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Simulation(SimulationError::OutOfOrder {
                node: "A".to_string(),
                expected: 0,
                got: 2
            })
        );
    }

    #[test]
    fn missing_gauge_detected_before_stepping() {
        let mut net = chain();
        let c = climate(&["A", "C"], 5);
        let err = run_node(&mut net, "C", &c, &RunInputs::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::DataAlignment(DataAlignmentError::MissingSeries { .. })
        ));
        assert_eq!(net.get_node("A").unwrap().timesteps_completed(), 0);
    }

    #[test]
    fn short_water_order_rejected() {
        let mut net = chain();
        let c = climate(&["A", "B", "C"], 5);
        let orders = NodeSeries::from([("C".to_string(), vec![1.0; 3])]);
        let inputs = RunInputs::default().with_water_order(&orders);
        assert!(matches!(
            run_node(&mut net, "C", &c, &inputs),
            Err(Error::DataAlignment(DataAlignmentError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn water_order_does_not_reach_downstream() {
        let description = json!({
            "D": {"node_type": "Dam", "max_store": 1000.0, "initial_volume": 500.0},
            "R": {"node_type": "IHACRES", "area": 10.0, "inlets": ["D"]}
        });
        let mut plain = StreamNetwork::build("plain", &description).unwrap();
        let mut ordered = StreamNetwork::build("ordered", &description).unwrap();
        let c = climate(&["D", "R"], 3);
        let orders = NodeSeries::from([("D".to_string(), vec![40.0; 3])]);

        run_node(&mut plain, "R", &c, &RunInputs::default()).unwrap();
        run_node(&mut ordered, "R", &c, &RunInputs::default().with_water_order(&orders)).unwrap();

        let dam = ordered.get_node("D").unwrap();
        assert!(dam.output("released").unwrap().iter().all(|r| (*r - 40.0).abs() < 1e-12));
        assert!(dam.outflow().iter().all(|q| *q == 0.0));
        assert_eq!(
            plain.get_node("R").unwrap().outflow(),
            ordered.get_node("R").unwrap().outflow()
        );
    }

    #[test]
    fn external_inflow_added_at_headwater() {
        let mut plain = chain();
        let mut fed = chain();
        let c = climate(&["A", "B", "C"], 3);
        let extra = NodeSeries::from([("A".to_string(), vec![100.0; 3])]);
        run_node(&mut plain, "A", &c, &RunInputs::default()).unwrap();
        run_node(&mut fed, "A", &c, &RunInputs::default().with_inflow(&extra)).unwrap();
        let qa = plain.get_node("A").unwrap().outflow();
        let qb = fed.get_node("A").unwrap().outflow();
        for (a, b) in qa.iter().zip(qb) {
            assert_relative_eq!(b - a, 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn run_catchment_covers_every_terminal() {
        let mut net = StreamNetwork::build(
            "forest",
            &json!({
                "A": {"node_type": "IHACRES"},
                "B": {"node_type": "IHACRES", "inlets": ["A"]},
                "X": {"node_type": "IHACRES"}
            }),
        )
        .unwrap();
        let c = climate(&["A", "B", "X"], 6);
        let out = run_catchment(&mut net, &c, &RunInputs::default()).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["B", "X"]);
        assert!(out.values().all(|q| q.len() == 6));
    }

    #[test]
    fn run_until_stops_early() {
        let mut net = chain();
        let c = climate(&["A", "B", "C"], 10);
        let q = run_node_until(&mut net, "C", &c, 4, &RunInputs::default()).unwrap();
        assert_eq!(q.len(), 4);
        assert!(run_node_until(&mut net, "C", &c, 11, &RunInputs::default()).is_err());
    }

    #[test]
    fn isolated_run_matches_network_headwater() {
        let mut net = chain();
        let c = climate(&["A", "B", "C"], 8);
        let via_network = run_node(&mut net, "A", &c, &RunInputs::default()).unwrap();
        let mut node = net.get_node("A").unwrap().clone();
        node.reset();
        let isolated = run_isolated(&mut node, &c, None, None, None).unwrap();
        assert_eq!(via_network, isolated);
    }

    #[test]
    fn isolated_run_requires_fresh_node() {
        let mut net = chain();
        let c = climate(&["A", "B", "C"], 3);
        run_node(&mut net, "A", &c, &RunInputs::default()).unwrap();
        let mut node = net.get_node("A").unwrap().clone();
        assert!(matches!(
            run_isolated(&mut node, &c, None, None, None),
            Err(Error::Simulation(SimulationError::OutOfOrder { .. }))
        ));
    }
}
