use rivernet_macros::Fluxes;

#[derive(Debug, Clone, Fluxes)]
pub struct BadFluxes {
    pub outflow: f64,
    pub gauge: String,
}

fn main() {}
