pub mod dataset;
pub mod detection;
pub mod errors;
pub mod label;
pub mod model;
pub mod training;
