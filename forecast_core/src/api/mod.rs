//! # API Module
//!
//! Data types exchanged between the orchestration core and its collaborators:
//! the remote analytics service on one side and the presentation layer on the
//! other. Nothing in here performs I/O.
//!
//! - [`types`]: training results, historical data, forecasts and derived views

pub mod types;

pub use types::*;
