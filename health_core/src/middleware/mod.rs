//! Middleware components for the probe server

pub mod logging;

pub use logging::logging_layer;
