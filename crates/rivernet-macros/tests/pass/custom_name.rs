use rivernet_macros::Fluxes;

#[derive(Debug, Clone, Copy, Fluxes)]
#[fluxes(history_name = "StorageTrace")]
pub struct StorageFluxes {
    pub volume: f64,
    pub level: f64,
}

fn main() {
    let mut trace = StorageTrace::default();
    trace.push(&StorageFluxes { volume: 120.0, level: 4.5 });
    trace.push(&StorageFluxes { volume: 118.0, level: 4.4 });
    assert_eq!(trace.len(), 2);
    assert_eq!(trace.level, vec![4.5, 4.4]);
}
