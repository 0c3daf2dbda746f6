//! Hybrid collection resolution.
//!
//! A collection listing reconciles two independently-owned sources of
//! truth: persisted collections held by the storage engine and ephemeral
//! realtime rooms held by the subscription registry. The resolver merges
//! both into one consistent view under a type filter. It never caches,
//! never mutates, and never returns a partial view when one side fails.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::realtime::SubscriptionRegistry;
use crate::core::storage::StorageEngine;
use crate::errors::{GatewayError, GatewayResult};

/// Filter applied to a collection listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    /// Both persisted collections and realtime rooms
    #[default]
    All,
    /// Persisted collections only
    Stored,
    /// Realtime rooms only
    Realtime,
}

impl CollectionType {
    /// Parse a caller-supplied type filter.
    ///
    /// Anything but `all`, `stored` or `realtime` is a validation error;
    /// the caller must not reach either collaborator with it.
    pub fn parse(raw: &str) -> GatewayResult<Self> {
        match raw {
            "all" => Ok(CollectionType::All),
            "stored" => Ok(CollectionType::Stored),
            "realtime" => Ok(CollectionType::Realtime),
            other => Err(GatewayError::Validation(format!(
                "unknown collection type '{other}', expected all, stored or realtime"
            ))),
        }
    }

    fn wants_stored(self) -> bool {
        matches!(self, CollectionType::All | CollectionType::Stored)
    }

    fn wants_realtime(self) -> bool {
        matches!(self, CollectionType::All | CollectionType::Realtime)
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionType::All => write!(f, "all"),
            CollectionType::Stored => write!(f, "stored"),
            CollectionType::Realtime => write!(f, "realtime"),
        }
    }
}

/// Named sets of a merged collection listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSets {
    /// Present when the filter includes persisted collections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<BTreeSet<String>>,
    /// Present when the filter includes realtime rooms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime: Option<BTreeSet<String>>,
}

/// Merged stored/realtime collection listing for one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionView {
    /// Echo of the requested filter
    #[serde(rename = "type")]
    pub view_type: CollectionType,
    /// The listed collection names, deduplicated and ordered per set
    pub collections: CollectionSets,
}

/// Merges the storage engine's and subscription registry's views.
#[derive(Clone)]
pub struct CollectionResolver {
    storage: Arc<dyn StorageEngine>,
    subscriptions: Arc<dyn SubscriptionRegistry>,
}

impl CollectionResolver {
    pub fn new(
        storage: Arc<dyn StorageEngine>,
        subscriptions: Arc<dyn SubscriptionRegistry>,
    ) -> Self {
        Self {
            storage,
            subscriptions,
        }
    }

    /// Resolve the collection view of `index` under a type filter.
    ///
    /// `stored` consults only the storage engine, `realtime` only the
    /// subscription registry, `all` runs both reads concurrently. A
    /// failure of either side fails the whole resolution; no partial
    /// view is ever returned.
    pub async fn resolve(
        &self,
        index: &str,
        view_type: CollectionType,
    ) -> GatewayResult<CollectionView> {
        let (stored, realtime) = match view_type {
            CollectionType::Stored => (Some(self.stored(index).await?), None),
            CollectionType::Realtime => (None, Some(self.realtime(index).await)),
            CollectionType::All => {
                let (stored, realtime) =
                    tokio::join!(self.stored(index), self.realtime(index));
                (Some(stored?), Some(realtime))
            }
        };
        debug_assert_eq!(stored.is_some(), view_type.wants_stored());
        debug_assert_eq!(realtime.is_some(), view_type.wants_realtime());

        Ok(CollectionView {
            view_type,
            collections: CollectionSets { stored, realtime },
        })
    }

    async fn stored(&self, index: &str) -> GatewayResult<BTreeSet<String>> {
        Ok(self.storage.list_collections(index).await?)
    }

    /// Rooms owned by another index are excluded, never merged in.
    async fn realtime(&self, index: &str) -> BTreeSet<String> {
        self.subscriptions
            .realtime_rooms()
            .await
            .into_iter()
            .filter(|room| room.index == index)
            .map(|room| room.name)
            .collect()
    }
}
