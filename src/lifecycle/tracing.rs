//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a global `tracing-subscriber` with a compact
//! format that hides the module prefix (`with_target(false)`). Verbosity comes
//! from `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Dispatch**: entry at debug with the full action, routing outcome at info
//! - **Handlers**: one span per `GET` / `SET` / `DELETE` call
//! - **Sources**: one span per `retrieve` / `send`, carrying the source id
//! - **Config**: skipped auth definitions, unknown formatters and pipeline
//!   stages at warn
//!
//! ## Usage Examples
//!
//! ```bash
//! # Outcomes only
//! RUST_LOG=info cargo test
//!
//! # Full actions and resolved endpoints
//! RUST_LOG=debug cargo test
//!
//! # Only the endpoint resolver
//! RUST_LOG=source_dispatch::endpoint=debug cargo test
//! ```
//!
//! With `RUST_LOG=debug` a `GET` reads like:
//!
//! ```text
//! DEBUG Dispatch action_type=GET payload=Object {"type": String("entry")}
//! DEBUG get: Resolved endpoint candidates=2 endpoint=Some("all")
//! DEBUG get:retrieve{source=entries}: retrieve called params={..}
//! INFO get:retrieve{source=entries}: Retrieved status=ok
//! INFO get: Got items source=entries count=2
//! INFO Handled action_type=GET status=ok
//! ```
//!
//! ## Injected Subscribers
//!
//! The global subscriber is optional. A dispatcher built with
//! [`DispatcherBuilder::subscriber`](crate::framework::DispatcherBuilder::subscriber)
//! runs every dispatch under its own `tracing::Dispatch`, which is how tests
//! capture output without touching global state.

/// Installs the global subscriber. Panics if one is already set.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
