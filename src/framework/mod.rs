//! Dispatch framework: the entry point every action goes through.
//!
//! # Main Components
//!
//! - [`Dispatcher`] - composes middleware around the router, built once by
//!   [`DispatcherBuilder`]
//! - [`Middleware`] / [`Next`] - interceptors and the rest of the chain
//! - [`ActionHandler`] / [`HandlerTable`] - handlers by action type
//! - [`Resources`] - registries and recursive dispatch for handlers
//! - [`Queue`] - boundary to the backend running deferred actions
//!
//! # Testing
//!
//! See the [`mock`] module for test doubles of adapters, queues and
//! authenticators.

pub mod dispatcher;
pub mod handler;
pub mod middleware;
pub mod mock;
pub mod queue;

pub use dispatcher::{Dispatcher, DispatcherBuilder, IdentOptions, Resources};
pub use handler::{ActionHandler, HandlerTable};
pub use middleware::{Middleware, Next};
pub use queue::Queue;
