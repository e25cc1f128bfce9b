//! Wiring and lifecycle of an integration.
//!
//! # Main Components
//!
//! - [`Integration`] - loads definitions and builds the registries and the
//!   dispatcher
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod integration;
pub mod tracing;

pub use integration::*;
pub use tracing::*;
