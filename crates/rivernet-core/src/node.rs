//! Network node: a tagged union over the supported models.
//!
//! Each variant keeps its numeric state private; the network only talks to
//! nodes through the [`NodeModel`] capability set.

use std::collections::BTreeMap;

use crate::dam::{self, DamNode};
use crate::error::{ConfigurationError, Error, ParameterError, SimulationError};
use crate::forcing::ClimateSample;
use crate::ihacres::{self, IhacresNode};
use crate::network::spec::{ModelSpec, NodeSpec};
use crate::traits::{ModelParams, NodeModel, ParameterBounds};

#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Ihacres(IhacresNode),
    Dam(DamNode),
}

impl Model {
    fn as_dyn(&self) -> &dyn NodeModel {
        match self {
            Model::Ihacres(n) => n,
            Model::Dam(n) => n,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn NodeModel {
        match self {
            Model::Ihacres(n) => n,
            Model::Dam(n) => n,
        }
    }
}

/// One catchment or reservoir segment of a network.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Gauge identifier used to look up forcing and observations.
    gauge: String,
    model: Model,
}

impl Node {
    pub fn new(gauge: impl Into<String>, model: Model) -> Self {
        Self {
            gauge: gauge.into(),
            model,
        }
    }

    /// Build the node described by a topology entry.
    pub fn from_spec(name: &str, spec: &NodeSpec) -> Result<Self, Error> {
        let gauge = spec.node_id.clone().unwrap_or_else(|| name.to_string());
        let model = match &spec.model {
            ModelSpec::Ihacres { initial_state } => {
                let (rating, flow): (BTreeMap<String, f64>, BTreeMap<String, f64>) = spec
                    .parameters
                    .iter()
                    .map(|(k, v)| (k.clone(), *v))
                    .partition(|(k, _)| {
                        ihacres::constants::LEVEL_PARAM_NAMES.contains(&k.as_str())
                    });
                let params = ihacres::Parameters::from_named(&flow)?;
                let level = ihacres::LevelParameters::from_named(&rating)?;
                let area = spec.area.unwrap_or(1.0);
                if !(area.is_finite() && area > 0.0) {
                    return Err(ConfigurationError::InvalidAttribute {
                        node: name.to_string(),
                        attribute: "area",
                        value: area,
                    }
                    .into());
                }
                if !initial_state.is_valid() {
                    let value = initial_state
                        .to_array()
                        .into_iter()
                        .find(|v| !(v.is_finite() && *v >= 0.0))
                        .unwrap_or(f64::NAN);
                    return Err(ConfigurationError::InvalidAttribute {
                        node: name.to_string(),
                        attribute: "initial_state",
                        value,
                    }
                    .into());
                }
                Model::Ihacres(
                    IhacresNode::new(name, area, params, *initial_state).with_level(level),
                )
            }
            ModelSpec::Dam {
                max_store,
                initial_volume,
                level,
                area_relation,
            } => {
                let params = dam::Parameters::from_named(&spec.parameters)?;
                Model::Dam(DamNode::with_relations(
                    name,
                    *max_store,
                    initial_volume.unwrap_or(*max_store),
                    params,
                    level.clone().unwrap_or(dam::constants::DEFAULT_LEVEL),
                    area_relation.clone().unwrap_or(dam::constants::DEFAULT_AREA),
                )?)
            }
        };
        Ok(Self { gauge, model })
    }

    pub fn gauge(&self) -> &str {
        &self.gauge
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Model type tag, e.g. `IHACRES` or `Dam`.
    pub fn model_type(&self) -> &'static str {
        match self.model {
            Model::Ihacres(_) => ihacres::constants::MODEL_NAME,
            Model::Dam(_) => dam::constants::MODEL_NAME,
        }
    }

    pub fn as_ihacres(&self) -> Option<&IhacresNode> {
        match &self.model {
            Model::Ihacres(n) => Some(n),
            Model::Dam(_) => None,
        }
    }

    pub fn as_dam(&self) -> Option<&DamNode> {
        match &self.model {
            Model::Dam(n) => Some(n),
            Model::Ihacres(_) => None,
        }
    }

    /// Names, defaults and bounds of the node's parameters.
    ///
    /// `with_level` appends the stream-level rating parameters for models
    /// that have them.
    pub fn param_info(&self, with_level: bool) -> ParameterBounds {
        if with_level {
            self.parameter_bounds_with_level()
        } else {
            self.parameter_bounds()
        }
    }
}

impl NodeModel for Node {
    fn name(&self) -> &str {
        self.model.as_dyn().name()
    }

    fn step(
        &mut self,
        forcing: &ClimateSample,
        inflow: f64,
        extraction: f64,
        exchange: f64,
    ) -> Result<f64, SimulationError> {
        self.model
            .as_dyn_mut()
            .step(forcing, inflow, extraction, exchange)
    }

    fn update_parameters(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        self.model.as_dyn_mut().update_parameters(values)
    }

    fn reset(&mut self) {
        self.model.as_dyn_mut().reset();
    }

    fn parameter_bounds(&self) -> ParameterBounds {
        self.model.as_dyn().parameter_bounds()
    }

    fn current_parameters(&self) -> Vec<f64> {
        self.model.as_dyn().current_parameters()
    }

    fn parameter_bounds_with_level(&self) -> ParameterBounds {
        self.model.as_dyn().parameter_bounds_with_level()
    }

    fn current_parameters_with_level(&self) -> Vec<f64> {
        self.model.as_dyn().current_parameters_with_level()
    }

    fn timesteps_completed(&self) -> usize {
        self.model.as_dyn().timesteps_completed()
    }

    fn outflow(&self) -> &[f64] {
        self.model.as_dyn().outflow()
    }

    fn output(&self, variable: &str) -> Option<&[f64]> {
        self.model.as_dyn().output(variable)
    }
}
