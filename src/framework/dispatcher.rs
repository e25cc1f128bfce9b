//! # Dispatcher
//!
//! The single entry point of the system. An action goes through the
//! middleware chain into the router, which either hands it to the queue
//! backend or to the handler registered for its type.
//!
//! ```text
//! dispatch(action)
//!   -> middleware 1 -> ... -> middleware n
//!     -> router
//!        - action.queue set and a queue configured -> Queue::enqueue
//!        - otherwise                               -> ActionHandler::handle
//! ```
//!
//! Handlers get [`Resources`]: the registries and a handle for dispatching
//! further actions. Recursive dispatch re-enters the whole middleware chain.

use super::handler::HandlerTable;
use super::middleware::{compose, Middleware, Next};
use super::queue::Queue;
use crate::datatype::Datatypes;
use crate::model::{Action, Envelope};
use crate::source::Sources;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Weak};
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

/// Options for identity-aware handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdentOptions {
    /// The datatype representing idents.
    #[serde(default, rename = "type")]
    pub ident_type: Option<String>,
}

/// Request-scoped collaborators handed to every handler.
pub struct Resources {
    pub datatypes: Arc<Datatypes>,
    pub sources: Arc<Sources>,
    pub ident: IdentOptions,
    dispatcher: Weak<Inner>,
}

impl Resources {
    /// Dispatches another action through the full middleware chain.
    pub async fn dispatch(&self, action: Action) -> Envelope {
        match self.dispatcher.upgrade() {
            Some(inner) => Dispatcher { inner }.dispatch(Some(action)).await,
            None => {
                warn!(action_type = %action.action_type, "Dispatcher gone, dropping action");
                Envelope::no_action()
            }
        }
    }
}

/// Cheap to clone; clones share the same chain and registries.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    chain: Arc<dyn Next>,
    subscriber: Option<tracing::Dispatch>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Runs an action through the chain. A missing action is `noaction`
    /// without touching any middleware.
    pub async fn dispatch(&self, action: Option<Action>) -> Envelope {
        let Some(action) = action else {
            debug!("Dispatch called without action");
            return Envelope::no_action();
        };
        let chain = self.inner.chain.clone();
        match &self.inner.subscriber {
            Some(subscriber) => chain.run(action).with_subscriber(subscriber.clone()).await,
            None => chain.run(action).await,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscriber", &self.inner.subscriber.is_some())
            .finish()
    }
}

/// Collects everything the dispatcher needs, then freezes it.
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HandlerTable,
    middleware: Vec<Arc<dyn Middleware>>,
    queue: Option<Arc<dyn Queue>>,
    datatypes: Arc<Datatypes>,
    sources: Arc<Sources>,
    ident: IdentOptions,
    subscriber: Option<tracing::Dispatch>,
}

impl DispatcherBuilder {
    pub fn handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    /// Appends a middleware. Earlier ones wrap later ones.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn Queue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn datatypes(mut self, datatypes: Arc<Datatypes>) -> Self {
        self.datatypes = datatypes;
        self
    }

    pub fn sources(mut self, sources: Arc<Sources>) -> Self {
        self.sources = sources;
        self
    }

    pub fn ident(mut self, ident: IdentOptions) -> Self {
        self.ident = ident;
        self
    }

    /// Runs every dispatch under `subscriber` instead of the global default.
    pub fn subscriber(mut self, subscriber: tracing::Dispatch) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn build(self) -> Dispatcher {
        let Self {
            handlers,
            middleware,
            queue,
            datatypes,
            sources,
            ident,
            subscriber,
        } = self;

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let router: Arc<dyn Next> = Arc::new(Router {
                handlers,
                queue,
                datatypes,
                sources,
                ident,
                dispatcher: weak.clone(),
            });
            Inner {
                chain: compose(middleware, router),
                subscriber,
            }
        });
        Dispatcher { inner }
    }
}

/// Innermost step of the chain.
struct Router {
    handlers: HandlerTable,
    queue: Option<Arc<dyn Queue>>,
    datatypes: Arc<Datatypes>,
    sources: Arc<Sources>,
    ident: IdentOptions,
    dispatcher: Weak<Inner>,
}

impl Router {
    fn resources(&self) -> Resources {
        Resources {
            datatypes: self.datatypes.clone(),
            sources: self.sources.clone(),
            ident: self.ident.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

#[async_trait]
impl Next for Router {
    async fn run(&self, mut action: Action) -> Envelope {
        let action_type = action.action_type.clone();
        debug!(%action_type, payload = ?action.payload, "Dispatch");

        let Some(handler) = self.handlers.get(&action_type) else {
            debug!(%action_type, "No handler for action type");
            return Envelope::no_action();
        };

        if let Some(directive) = action.queue.take() {
            if let Some(queue) = &self.queue {
                let timestamp = directive.timestamp();
                return if queue.enqueue(action, timestamp).await {
                    info!(%action_type, ?timestamp, "Queued");
                    Envelope::queued()
                } else {
                    warn!(%action_type, "Queue refused action");
                    Envelope::error(format!("Could not queue action '{action_type}'"))
                };
            }
            debug!(%action_type, "No queue configured, running now");
        }

        let envelope = handler.handle(action, &self.resources()).await;
        info!(%action_type, status = %envelope.status, "Handled");
        envelope
    }
}
