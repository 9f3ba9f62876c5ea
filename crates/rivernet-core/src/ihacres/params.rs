/// IHACRES calibrated parameters.
///
/// - `d`: drying time constant of the wetness index at zero ET [timesteps]
/// - `f`: sensitivity of the drying rate to ET [1/mm] or temperature [1/°C]
/// - `e`: share of forcing ET withdrawn from the wetness index [-]
/// - `c`: effective rainfall coefficient [1/mm]
/// - `alpha`: share of effective rainfall routed to the quick store [-]
/// - `tau_q`: quick store time constant [timesteps]
/// - `tau_s`: slow store time constant [timesteps]
use super::constants::{
    DEFAULTS, LEVEL_DEFAULTS, LEVEL_PARAM_BOUNDS, LEVEL_PARAM_NAMES, MODEL_NAME, PARAM_BOUNDS,
    PARAM_NAMES,
};
use crate::traits::ModelParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub d: f64,
    pub f: f64,
    pub e: f64,
    pub c: f64,
    pub alpha: f64,
    pub tau_q: f64,
    pub tau_s: f64,
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
            d: arr[0],
            f: arr[1],
            e: arr[2],
            c: arr[3],
            alpha: arr[4],
            tau_q: arr[5],
            tau_s: arr[6],
        }
    }

    fn to_array(&self) -> Vec<f64> {
        vec![
            self.d, self.f, self.e, self.c, self.alpha, self.tau_q, self.tau_s,
        ]
    }
}

/// Stream-level rating curve parameters, see [`super::processes::stream_level`].
///
/// - `p1`..`p4`: low-flow power segment and its fade-out
/// - `p5`..`p8`: high-flow power segment and its fade-in
/// - `ctf`: cease-to-flow level [m]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelParameters {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
    pub p5: f64,
    pub p6: f64,
    pub p7: f64,
    pub p8: f64,
    pub ctf: f64,
}

impl Default for LevelParameters {
    fn default() -> Self {
        <Self as ModelParams>::defaults()
    }
}

impl ModelParams for LevelParameters {
    const MODEL: &'static str = "IHACRES level";
    const PARAM_NAMES: &'static [&'static str] = LEVEL_PARAM_NAMES;
    const PARAM_BOUNDS: &'static [(f64, f64)] = LEVEL_PARAM_BOUNDS;
    const DEFAULTS: &'static [f64] = LEVEL_DEFAULTS;

    fn from_array_unchecked(arr: &[f64]) -> Self {
        Self {
            p1: arr[0],
            p2: arr[1],
            p3: arr[2],
            p4: arr[3],
            p5: arr[4],
            p6: arr[5],
            p7: arr[6],
            p8: arr[7],
            ctf: arr[8],
        }
    }

    fn to_array(&self) -> Vec<f64> {
        vec![
            self.p1, self.p2, self.p3, self.p4, self.p5, self.p6, self.p7, self.p8, self.ctf,
        ]
    }
}
