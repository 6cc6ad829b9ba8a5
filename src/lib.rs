pub mod assign;
pub mod config;
pub mod context;
pub mod cycle;
pub mod features;
pub mod forecast;
pub mod geo;
pub mod history;
pub mod model;
pub mod pool;
pub mod predictor;
pub mod store;
