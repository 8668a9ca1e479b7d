pub mod cluster;
pub mod layers;
pub mod symbology;

pub use cluster::{cluster_positions, Cluster};
pub use layers::{line_bounds, MapLayers, MapRenderer};
pub use symbology::{resolve_style, resolve_style_for, Severity, Style, DETAIL_STYLE};
