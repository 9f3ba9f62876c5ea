use rivernet_macros::Fluxes;

/// Everything an IHACRES node computes in one timestep.
///
/// Depths are in mm, volumes (`inflow`, `extraction`, `exchange`,
/// `outflow`) in ML/timestep, `level` in m.
#[derive(Debug, Clone, Copy, PartialEq, Fluxes)]
pub struct IhacresFluxes {
    pub rainfall: f64,
    pub evap: f64,
    pub wetness: f64,
    pub effective_rainfall: f64,
    pub quick_store: f64,
    pub slow_store: f64,
    pub quick_flow: f64,
    pub slow_flow: f64,
    pub inflow: f64,
    pub extraction: f64,
    pub exchange: f64,
    pub outflow: f64,
    pub level: f64,
}
