pub mod commands;
pub mod pipeline;
pub mod state;

pub use pipeline::GeoDataPipeline;
pub use state::{GeoDataPayload, GeoDataState};
