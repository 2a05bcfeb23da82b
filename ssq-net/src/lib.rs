pub mod config;
pub mod encoding;
pub mod network;
pub mod predictor;
pub mod training;
