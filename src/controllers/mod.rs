//! Domain controllers.
//!
//! Controllers implement the named actions the funnel dispatches to. They
//! delegate every logical piece of work to exactly one collaborator and
//! propagate collaborator failures unchanged; the funnel alone shapes the
//! outcome into a canonical response and fires the hook protocol;
//! controllers never call hooks.

pub mod read;
pub mod subscribe;
pub mod write;

pub use read::ReadController;
pub use subscribe::SubscribeController;
pub use write::WriteController;

use std::sync::Arc;

use crate::core::broker::Broker;
use crate::core::realtime::SubscriptionRegistry;
use crate::core::storage::StorageEngine;
use crate::funnel::{Funnel, FunnelBuilder};
use crate::plugin::HookPipeline;

/// Hook event domain for read/write data actions.
const DATA_DOMAIN: &str = "data";

/// Hook event domain for subscription actions.
const SUBSCRIPTION_DOMAIN: &str = "subscription";

/// Register `$method` of an `Arc`-owned controller as a funnel action.
macro_rules! route {
    ($builder:expr, $ctrl:expr, $controller:expr, $domain:expr, $action:expr, $method:ident) => {{
        let ctrl = Arc::clone(&$ctrl);
        $builder.action($controller, $domain, $action, move |request| {
            let ctrl = Arc::clone(&ctrl);
            Box::pin(async move { ctrl.$method(&request).await })
        });
    }};
}

/// Static controller/action table exposed by the `serverInfo` action.
///
/// Kept in lockstep with [`build_funnel`]; the module tests guard the two
/// against drifting apart.
pub fn api_route_table() -> serde_json::Value {
    serde_json::json!({
        "read": [
            "collectionExists", "count", "get", "indexExists", "listCollections",
            "listIndexes", "now", "search", "serverInfo",
        ],
        "subscribe": ["off", "on"],
        "write": ["create"],
    })
}

/// Build the funnel serving the full controller surface.
///
/// The returned funnel is immutable; this is the only place actions are
/// registered.
pub fn build_funnel(
    storage: Arc<dyn StorageEngine>,
    subscriptions: Arc<dyn SubscriptionRegistry>,
    broker: Arc<dyn Broker>,
    hooks: Arc<dyn HookPipeline>,
) -> Funnel {
    let read = Arc::new(ReadController::new(
        Arc::clone(&storage),
        Arc::clone(&subscriptions),
        broker,
    ));
    let write = Arc::new(WriteController::new(storage));
    let subscribe = Arc::new(SubscribeController::new(subscriptions));

    let mut builder = FunnelBuilder::new();
    route!(builder, read, "read", DATA_DOMAIN, "search", search);
    route!(builder, read, "read", DATA_DOMAIN, "get", get);
    route!(builder, read, "read", DATA_DOMAIN, "count", count);
    route!(builder, read, "read", DATA_DOMAIN, "listCollections", list_collections);
    route!(builder, read, "read", DATA_DOMAIN, "now", now);
    route!(builder, read, "read", DATA_DOMAIN, "listIndexes", list_indexes);
    route!(builder, read, "read", DATA_DOMAIN, "serverInfo", server_info);
    route!(builder, read, "read", DATA_DOMAIN, "collectionExists", collection_exists);
    route!(builder, read, "read", DATA_DOMAIN, "indexExists", index_exists);
    route!(builder, write, "write", DATA_DOMAIN, "create", create);
    route!(builder, subscribe, "subscribe", SUBSCRIPTION_DOMAIN, "on", on);
    route!(builder, subscribe, "subscribe", SUBSCRIPTION_DOMAIN, "off", off);
    builder.build(hooks)
}
