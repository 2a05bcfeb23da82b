pub mod batch;
pub mod stats;
