/// Dam calibrated parameters.
///
/// - `evap_factor`: scales forcing ET to open-water evaporation [-]
/// - `seepage_rate`: bed seepage depth over the wetted area [mm/timestep]
use super::constants::{DEFAULTS, MODEL_NAME, PARAM_BOUNDS, PARAM_NAMES};
use crate::traits::ModelParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub evap_factor: f64,
    pub seepage_rate: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        <Self as ModelParams>::defaults()
    }
}

impl ModelParams for Parameters {
    const MODEL: &'static str = MODEL_NAME;
    const PARAM_NAMES: &'static [&'static str] = PARAM_NAMES;
    const PARAM_BOUNDS: &'static [(f64, f64)] = PARAM_BOUNDS;
    const DEFAULTS: &'static [f64] = DEFAULTS;

    fn from_array_unchecked(arr: &[f64]) -> Self {
        Self {
            evap_factor: arr[0],
            seepage_rate: arr[1],
        }
    }

    fn to_array(&self) -> Vec<f64> {
        vec![self.evap_factor, self.seepage_rate]
    }
}
