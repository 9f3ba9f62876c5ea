/// Reservoir (dam) node.
///
/// Explicit mass balance on a stored volume with inflow, rainfall,
/// evaporation, seepage, extraction, groundwater exchange and spill.
/// Level and surface area follow monotonic storage relations.
pub mod constants;
pub mod fluxes;
pub mod node;
pub mod params;
pub mod processes;
pub mod relation;

pub use node::DamNode;
pub use params::Parameters;
pub use relation::StorageRelation;
