use rivernet_macros::Fluxes;

/// Everything a dam node computes in one timestep.
///
/// Volumes in ML/timestep, `volume` in ML, `level` in m, `area` in km².
#[derive(Debug, Clone, Copy, PartialEq, Fluxes)]
pub struct DamFluxes {
    pub rainfall: f64,
    pub evap: f64,
    pub inflow: f64,
    pub rain_volume: f64,
    pub evap_volume: f64,
    pub seepage: f64,
    pub extraction: f64,
    pub released: f64,
    pub exchange: f64,
    pub spill: f64,
    pub volume: f64,
    pub level: f64,
    pub area: f64,
    pub outflow: f64,
}
