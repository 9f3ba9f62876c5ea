/// IHACRES node: parameters, dynamic state and output history.
use tracing::debug;

use super::constants::{
    LEVEL_DEFAULTS, LEVEL_PARAM_BOUNDS, MODEL_NAME, N_LEVEL_PARAMS, N_PARAMS,
    PARAM_NAMES_WITH_LEVEL,
};
use super::fluxes::{IhacresFluxes, IhacresFluxesHistory};
use super::params::{LevelParameters, Parameters};
use super::processes;
use super::state::State;
use crate::error::{ParameterError, SimulationError};
use crate::forcing::{ClimateSample, EvapKind};
use crate::traits::{ModelParams, NodeModel, ParameterBounds};

#[derive(Debug, Clone, PartialEq)]
pub struct IhacresNode {
    name: String,
    /// Catchment area [km²].
    area: f64,
    params: Parameters,
    level: LevelParameters,
    state: State,
    initial_state: State,
    history: IhacresFluxesHistory,
}

impl IhacresNode {
    /// Create a node; `initial_state` is captured and restored on every reset.
    pub fn new(name: impl Into<String>, area: f64, params: Parameters, initial_state: State) -> Self {
        Self {
            name: name.into(),
            area,
            params,
            level: LevelParameters::default(),
            state: initial_state,
            initial_state,
            history: IhacresFluxesHistory::default(),
        }
    }

    /// Replace the stream-level rating curve.
    pub fn with_level(mut self, level: LevelParameters) -> Self {
        self.level = level;
        self
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn level_params(&self) -> &LevelParameters {
        &self.level
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn history(&self) -> &IhacresFluxesHistory {
        &self.history
    }

    /// Compute one timestep without touching the node.
    fn compute(
        &self,
        forcing: &ClimateSample,
        inflow: f64,
        extraction: f64,
        exchange: f64,
    ) -> (State, IhacresFluxes) {
        let p = &self.params;
        let (tau_w, loss) = match forcing.kind {
            EvapKind::Evapotranspiration => (
                processes::drying_time_constant(p.d, p.f, forcing.evap),
                processes::evaporative_loss(p.e, forcing.evap),
            ),
            EvapKind::Temperature => (
                processes::drying_time_constant_temp(p.d, p.f, forcing.evap),
                processes::evaporative_loss_temp(p.e, forcing.evap),
            ),
        };

        let wetness = processes::wetness_index(self.state.wetness, forcing.rainfall, loss, tau_w);
        let effective = processes::effective_rainfall(p.c, wetness, forcing.rainfall);
        let (quick_in, slow_in) = processes::partition(effective, p.alpha);
        let (quick_store, quick_flow) =
            processes::recession(self.state.quick_store, quick_in, p.tau_q);
        let (slow_store, slow_flow) = processes::recession(self.state.slow_store, slow_in, p.tau_s);
        let outflow = processes::outflow(
            quick_flow + slow_flow,
            self.area,
            inflow,
            extraction,
            exchange,
        );
        let level = processes::stream_level(outflow, &self.level);

        let state = State {
            wetness,
            quick_store,
            slow_store,
        };
        let fluxes = IhacresFluxes {
            rainfall: forcing.rainfall,
            evap: forcing.evap,
            wetness,
            effective_rainfall: effective,
            quick_store,
            slow_store,
            quick_flow,
            slow_flow,
            inflow,
            extraction,
            exchange,
            outflow,
            level,
        };
        (state, fluxes)
    }
}

impl NodeModel for IhacresNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(
        &mut self,
        forcing: &ClimateSample,
        inflow: f64,
        extraction: f64,
        exchange: f64,
    ) -> Result<f64, SimulationError> {
        let (state, fluxes) = self.compute(forcing, inflow, extraction, exchange);

        let checks = [
            ("wetness", state.wetness),
            ("quick_store", state.quick_store),
            ("slow_store", state.slow_store),
            ("outflow", fluxes.outflow),
            ("level", fluxes.level),
        ];
        if let Some(&(variable, _)) = checks.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimulationError::NonFinite {
                node: self.name.clone(),
                timestep: self.history.len(),
                variable,
            });
        }

        self.state = state;
        self.history.push(&fluxes);
        Ok(fluxes.outflow)
    }

    fn update_parameters(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        if values.len() == N_PARAMS + N_LEVEL_PARAMS {
            let (flow, level) = values.split_at(N_PARAMS);
            let params = Parameters::from_array(flow)?;
            self.level = LevelParameters::from_array(level)?;
            self.params = params;
        } else {
            self.params = Parameters::from_array(values)?;
        }
        debug!(node = %self.name, model = MODEL_NAME, ?values, "updated parameters");
        Ok(())
    }

    fn reset(&mut self) {
        self.state = self.initial_state;
        self.history.clear();
    }

    fn parameter_bounds(&self) -> ParameterBounds {
        ParameterBounds::of::<Parameters>()
    }

    fn current_parameters(&self) -> Vec<f64> {
        self.params.to_array()
    }

    fn parameter_bounds_with_level(&self) -> ParameterBounds {
        let flow = ParameterBounds::of::<Parameters>();
        ParameterBounds {
            names: PARAM_NAMES_WITH_LEVEL,
            defaults: [flow.defaults.as_slice(), LEVEL_DEFAULTS].concat(),
            lower: flow
                .lower
                .into_iter()
                .chain(LEVEL_PARAM_BOUNDS.iter().map(|b| b.0))
                .collect(),
            upper: flow
                .upper
                .into_iter()
                .chain(LEVEL_PARAM_BOUNDS.iter().map(|b| b.1))
                .collect(),
        }
    }

    fn current_parameters_with_level(&self) -> Vec<f64> {
        let mut values = self.params.to_array();
        values.extend(self.level.to_array());
        values
    }

    fn timesteps_completed(&self) -> usize {
        self.history.len()
    }

    fn outflow(&self) -> &[f64] {
        &self.history.outflow
    }

    fn output(&self, variable: &str) -> Option<&[f64]> {
        self.history.series(variable)
    }
}
