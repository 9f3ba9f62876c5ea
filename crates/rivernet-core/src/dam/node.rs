/// Dam node: stored volume, storage relations and output history.
use tracing::{debug, trace};

use super::constants::{DEFAULT_AREA, DEFAULT_LEVEL, MODEL_NAME};
use super::fluxes::{DamFluxes, DamFluxesHistory};
use super::params::Parameters;
use super::processes::{self, MassBalanceTerms};
use super::relation::StorageRelation;
use crate::error::{ConfigurationError, ParameterError, SimulationError};
use crate::forcing::{ClimateSample, EvapKind};
use crate::traits::{ModelParams, NodeModel, ParameterBounds};

#[derive(Debug, Clone, PartialEq)]
pub struct DamNode {
    name: String,
    /// Storage capacity [ML].
    max_store: f64,
    initial_volume: f64,
    volume: f64,
    params: Parameters,
    level: StorageRelation,
    area: StorageRelation,
    history: DamFluxesHistory,
}

impl DamNode {
    /// Create a dam holding `initial_volume` out of `max_store` ML.
    ///
    /// Uses the default level and surface-area relations.
    pub fn new(
        name: impl Into<String>,
        max_store: f64,
        initial_volume: f64,
        params: Parameters,
    ) -> Result<Self, ConfigurationError> {
        Self::with_relations(
            name,
            max_store,
            initial_volume,
            params,
            DEFAULT_LEVEL,
            DEFAULT_AREA,
        )
    }

    pub fn with_relations(
        name: impl Into<String>,
        max_store: f64,
        initial_volume: f64,
        params: Parameters,
        level: StorageRelation,
        area: StorageRelation,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        if !(max_store.is_finite() && max_store > 0.0) {
            return Err(ConfigurationError::InvalidAttribute {
                node: name,
                attribute: "max_store",
                value: max_store,
            });
        }
        if !(0.0..=max_store).contains(&initial_volume) {
            return Err(ConfigurationError::InvalidAttribute {
                node: name,
                attribute: "initial_volume",
                value: initial_volume,
            });
        }
        level.validate(&name)?;
        area.validate(&name)?;
        Ok(Self {
            name,
            max_store,
            initial_volume,
            volume: initial_volume,
            params,
            level,
            area,
            history: DamFluxesHistory::default(),
        })
    }

    pub fn max_store(&self) -> f64 {
        self.max_store
    }

    /// Current stored volume [ML].
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Current water level from the storage-level relation.
    pub fn current_level(&self) -> f64 {
        self.level.evaluate(self.volume)
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn history(&self) -> &DamFluxesHistory {
        &self.history
    }

    fn compute(
        &self,
        forcing: &ClimateSample,
        inflow: f64,
        extraction: f64,
        exchange: f64,
    ) -> DamFluxes {
        let area = self.area.evaluate(self.volume);
        let rain_volume = processes::depth_to_volume(forcing.rainfall.max(0.0), area);
        // Temperature forcing carries no evaporation depth
        let evap_volume = match forcing.kind {
            EvapKind::Evapotranspiration => processes::depth_to_volume(
                self.params.evap_factor * forcing.evap.max(0.0),
                area,
            ),
            EvapKind::Temperature => 0.0,
        };
        let seepage = processes::depth_to_volume(self.params.seepage_rate, area);

        let terms = MassBalanceTerms {
            inflow,
            rainfall: rain_volume,
            evaporation: evap_volume,
            seepage,
            extraction,
            exchange,
        };
        let balance = processes::mass_balance(self.volume, &terms, self.max_store);

        DamFluxes {
            rainfall: forcing.rainfall,
            evap: forcing.evap,
            inflow,
            rain_volume,
            evap_volume,
            seepage,
            extraction,
            released: balance.released,
            exchange,
            spill: balance.spill,
            volume: balance.volume,
            level: self.level.evaluate(balance.volume),
            area,
            // Extractions leave the system; only spill passes downstream
            outflow: balance.spill,
        }
    }
}

impl NodeModel for DamNode {
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
        let fluxes = self.compute(forcing, inflow, extraction, exchange);
        let timestep = self.history.len();

        let checks = [
            ("volume", fluxes.volume),
            ("spill", fluxes.spill),
            ("level", fluxes.level),
            ("outflow", fluxes.outflow),
        ];
        if let Some(&(variable, _)) = checks.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimulationError::NonFinite {
                node: self.name.clone(),
                timestep,
                variable,
            });
        }

        if fluxes.spill > 0.0 {
            trace!(node = %self.name, timestep, spill = fluxes.spill, "dam spilled");
        }
        if fluxes.released < extraction {
            debug!(
                node = %self.name,
                timestep,
                requested = extraction,
                released = fluxes.released,
                "extraction not met in full"
            );
        }

        self.volume = fluxes.volume;
        self.history.push(&fluxes);
        Ok(fluxes.outflow)
    }

    fn update_parameters(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        self.params = Parameters::from_array(values)?;
        debug!(node = %self.name, model = MODEL_NAME, ?values, "updated parameters");
        Ok(())
    }

    fn reset(&mut self) {
        self.volume = self.initial_volume;
        self.history.clear();
    }

    fn parameter_bounds(&self) -> ParameterBounds {
        ParameterBounds::of::<Parameters>()
    }

    fn current_parameters(&self) -> Vec<f64> {
        self.params.to_array()
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dam(initial: f64) -> DamNode {
        DamNode::new("dam", 1000.0, initial, Parameters::default()).unwrap()
    }

    fn dry() -> ClimateSample {
        ClimateSample::new(0.0, 0.0)
    }

    #[test]
    fn inflow_stored_below_capacity() {
        let mut d = dam(300.0);
        let q = d.step(&dry(), 200.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(d.volume(), 500.0);
        assert_eq!(q, 0.0);
    }

    #[test]
    fn inflow_above_capacity_spills() {
        let mut d = dam(900.0);
        let q = d.step(&dry(), 300.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(d.volume(), 1000.0);
        assert_relative_eq!(d.history().spill[0], 200.0);
        assert_relative_eq!(q, 200.0);
    }

    #[test]
    fn level_tracks_volume() {
        let mut d = dam(100.0);
        d.step(&dry(), 400.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(d.output("level").unwrap()[0], DEFAULT_LEVEL.evaluate(500.0));
        assert_relative_eq!(d.current_level(), DEFAULT_LEVEL.evaluate(500.0));
    }

    #[test]
    fn evaporation_and_seepage_remove_water() {
        let mut d = dam(500.0);
        d.update_parameters(&[1.2, 2.0]).unwrap();
        d.step(&ClimateSample::new(0.0, 5.0), 0.0, 0.0, 0.0).unwrap();
        let h = d.history();
        let area = DEFAULT_AREA.evaluate(500.0);
        assert_relative_eq!(h.evap_volume[0], 1.2 * 5.0 * area, epsilon = 1e-9);
        assert_relative_eq!(h.seepage[0], 2.0 * area, epsilon = 1e-9);
        assert!(d.volume() < 500.0);
    }

    #[test]
    fn exchange_is_signed() {
        let mut gain = dam(500.0);
        let mut loss = dam(500.0);
        gain.step(&dry(), 0.0, 0.0, 25.0).unwrap();
        loss.step(&dry(), 0.0, 0.0, -25.0).unwrap();
        assert_relative_eq!(gain.volume(), 525.0);
        assert_relative_eq!(loss.volume(), 475.0);
    }

    #[test]
    fn extraction_leaves_the_system() {
        let mut d = dam(500.0);
        let q = d.step(&dry(), 0.0, 40.0, 0.0).unwrap();
        assert_eq!(q, 0.0);
        assert_relative_eq!(d.history().released[0], 40.0);
        assert_relative_eq!(d.volume(), 460.0);
    }

    #[test]
    fn extraction_does_not_add_to_spill() {
        let mut d = dam(990.0);
        let q = d.step(&dry(), 100.0, 40.0, 0.0).unwrap();
        assert_relative_eq!(q, 50.0);
        assert_relative_eq!(d.volume(), 1000.0);
    }

    #[test]
    fn reset_restores_initial_volume() {
        let mut d = dam(250.0);
        d.step(&dry(), 100.0, 0.0, 0.0).unwrap();
        d.reset();
        assert_eq!(d.volume(), 250.0);
        assert!(d.history().is_empty());
    }

    #[test]
    fn rejects_initial_volume_above_capacity() {
        let err = DamNode::new("d", 100.0, 150.0, Parameters::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidAttribute { attribute: "initial_volume", .. }
        ));
    }

    #[test]
    fn non_finite_inflow_is_an_error() {
        let mut d = dam(500.0);
        assert!(d.step(&dry(), f64::NAN, 0.0, 0.0).is_err());
        assert_eq!(d.volume(), 500.0);
        assert_eq!(d.timesteps_completed(), 0);
    }
}
