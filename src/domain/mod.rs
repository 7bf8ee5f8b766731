pub mod estimate;
pub mod plan;
