pub mod config;
pub mod error;
pub mod spectral;
pub mod weights;
pub mod reservoir;
pub mod linalg;
pub mod training;
pub mod metrics;
pub mod gridsearch;
pub mod display;
