//! # Source Dispatch
//!
//! > **Configurable integration middleware: one dispatch entry point in front
//! > of many data sources.**
//!
//! Callers dispatch typed [`Action`](model::Action)s (`GET`, `SET`,
//! `DELETE`, ...). Each action runs through an ordered middleware chain into a
//! router, which either defers it to a queue backend or hands it to the
//! handler registered for its type. Handlers pick an endpoint on a configured
//! source, talk to it through an adapter and map the raw data to and from
//! canonical [`Item`](model::Item)s. Every outcome comes back as an
//! [`Envelope`](model::Envelope).
//!
//! ## 🏗️ Design Notes
//!
//! ### 1. Envelopes, not errors
//! Nothing a caller can send makes `dispatch` fail. Missing handlers, unknown
//! sources, refused access and adapter failures are all envelopes with a
//! [`Status`](model::Status). Only the load step returns Rust errors
//! ([`ConfigError`](error::ConfigError)).
//!
//! ### 2. Frozen registries
//! Datatypes, sources, endpoints and mappings are built once from definitions
//! and shared behind `Arc`. Dispatch calls never mutate them, so concurrent
//! calls need no locks.
//!
//! ### 3. Shorthand lives in one place
//! Definitions accept several shorthand forms. [`config::load`] normalizes
//! them; the runtime types only know the full form.
//!
//! ### 4. Observability
//! `tracing` with structured fields everywhere. The dispatcher can run under
//! an injected `tracing::Dispatch`. See the [`lifecycle::tracing`] module.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! - **Role**: Middleware composition, routing, the queue boundary and
//!   recursive dispatch.
//! - **Key items**: [`Dispatcher`](framework::Dispatcher),
//!   [`Middleware`](framework::Middleware),
//!   [`ActionHandler`](framework::ActionHandler).
//!
//! ### 2. The Handlers ([`actions`])
//! - **Role**: The built-in `GET`, `SET` and `DELETE` handlers.
//!
//! ### 3. The Data Layer ([`datatype`], [`mapping`], [`endpoint`], [`source`])
//! - **Role**: Casting to datatypes, moving values between source shapes and
//!   items, choosing endpoints, and the adapter boundary.
//!
//! ### 4. The Orchestrator ([`config`], [`lifecycle`])
//! - **Role**: Reads definitions and wires everything into an
//!   [`Integration`](lifecycle::Integration).
//!
//! ## 🚀 Quick Start
//!
//! ```ignore
//! let plugins = Plugins::new().with_adapter("json", JsonAdapter::new());
//! let integration = Integration::from_json(DEFS, plugins)?;
//!
//! let response = integration
//!     .dispatch(Some(Action::new("GET", json!({"type": "entry"}))))
//!     .await;
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod actions;
pub mod config;
pub mod datatype;
pub mod endpoint;
pub mod error;
pub mod framework;
pub mod lifecycle;
pub mod mapping;
pub mod model;
pub mod source;
