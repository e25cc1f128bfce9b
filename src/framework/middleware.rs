//! Middleware: interceptors wrapped around the router.
//!
//! The chain is built once, when the dispatcher is constructed, by folding the
//! middleware list from the last entry to the first. The first middleware is
//! therefore the outermost one: it sees the action first and the envelope
//! last.

use crate::model::{Action, Envelope};
use async_trait::async_trait;
use std::sync::Arc;

/// The rest of the chain, as seen from a middleware.
#[async_trait]
pub trait Next: Send + Sync {
    async fn run(&self, action: Action) -> Envelope;
}

/// An interceptor around action handling. It may call `next` (possibly with a
/// modified action), transform the envelope it gets back, or answer without
/// calling `next` at all.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, action: Action, next: &dyn Next) -> Envelope;
}

struct Layer {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn Next>,
}

#[async_trait]
impl Next for Layer {
    async fn run(&self, action: Action) -> Envelope {
        self.middleware.handle(action, self.next.as_ref()).await
    }
}

/// Wraps `innermost` in every middleware, first one outermost.
pub(crate) fn compose(middleware: Vec<Arc<dyn Middleware>>, innermost: Arc<dyn Next>) -> Arc<dyn Next> {
    middleware
        .into_iter()
        .rev()
        .fold(innermost, |next, middleware| {
            let layer: Arc<dyn Next> = Arc::new(Layer { middleware, next });
            layer
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use serde_json::json;
    use std::sync::Mutex;

    struct Echo;

    #[async_trait]
    impl Next for Echo {
        async fn run(&self, action: Action) -> Envelope {
            Envelope::ok(action.payload)
        }
    }

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Record {
        async fn handle(&self, action: Action, next: &dyn Next) -> Envelope {
            self.log.lock().unwrap().push(format!("enter {}", self.name));
            let envelope = next.run(action).await;
            self.log.lock().unwrap().push(format!("leave {}", self.name));
            envelope
        }
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middleware: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Record { name: "a", log: log.clone() }),
            Arc::new(Record { name: "b", log: log.clone() }),
        ];
        let chain = compose(middleware, Arc::new(Echo));

        let envelope = chain.run(Action::new("GET", json!("payload"))).await;

        assert_eq!(envelope.status, Status::Ok);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter a", "enter b", "leave b", "leave a"]
        );
    }

    #[tokio::test]
    async fn empty_chain_is_the_innermost_step() {
        let chain = compose(Vec::new(), Arc::new(Echo));
        let envelope = chain.run(Action::new("GET", json!(1))).await;
        assert_eq!(envelope.data, Some(json!(1)));
    }
}
