pub mod actions;
pub mod commands;
pub mod pipeline;
pub mod state;

pub use actions::SegmentActions;
pub use pipeline::SegmentPipeline;
pub use state::{SegmentDetailState, SegmentDetailView, SegmentFetchMode};
