//! Host-provided key-value storage. The host platform persists values per
//! widget instance and pushes updates to subscribers; [MemoryStore] is an
//! in-process implementation of the same contract, used by tests and by
//! single-process hosts.

use anyhow::Context;
use async_trait::async_trait;
use log::{info, warn};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{collections::HashMap, marker::PhantomData};
use tokio::sync::{watch, RwLock};

/// Store key for the weather widget's configuration record
pub const CONFIG_KEY: &str = "weatherConfig";
/// Store key for the generic template's subtitle string
pub const SUBTITLE_KEY: &str = "subtitle";

/// Asynchronous key-value persistence with per-key change notifications.
/// Delivery to subscribers is eventual and latest-value-only: a subscriber
/// that lags simply sees the newest value, and concurrent writers resolve as
/// last-write-wins. The raw surface is JSON values so the trait stays
/// object-safe; typed access goes through [StoreExt].
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_value(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Persist a value. `Ok(false)` means the host refused the write without
    /// reporting a hard error.
    async fn set_value(&self, key: &str, value: Value) -> anyhow::Result<bool>;

    /// Register for change notifications on a key. Deregistration is
    /// dropping the returned handle, so release is tied to the subscriber's
    /// lifetime on every exit path.
    async fn subscribe_value(
        &self,
        key: &str,
    ) -> anyhow::Result<RawSubscription>;
}

/// Typed convenience layer over [Store], converting through JSON
#[async_trait]
pub trait StoreExt: Store {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> anyhow::Result<Option<T>> {
        match self.get_value(key).await? {
            Some(value) => {
                let parsed = serde_json::from_value(value).with_context(
                    || format!("Error parsing stored value for key `{key}`"),
                )?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> anyhow::Result<bool> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Error serializing value for key `{key}`"))?;
        self.set_value(key, value).await
    }

    async fn subscribe<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> anyhow::Result<Subscription<T>> {
        let raw = self.subscribe_value(key).await?;
        Ok(Subscription {
            key: key.to_owned(),
            raw,
            phantom: PhantomData,
        })
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// Change notifications for a single key, untyped
pub struct RawSubscription {
    rx: watch::Receiver<Option<Value>>,
}

impl RawSubscription {
    /// Wait for the next change to the key. Returns the latest value (which
    /// is `None` when the key has been cleared), or outer `None` once the
    /// store itself is gone and no further change can arrive.
    pub async fn changed(&mut self) -> Option<Option<Value>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Change notifications for a single key, deserialized to `T`. Values that
/// fail to parse are reported as absent rather than killing the
/// subscription.
pub struct Subscription<T> {
    key: String,
    raw: RawSubscription,
    phantom: PhantomData<T>,
}

impl<T: DeserializeOwned> Subscription<T> {
    /// See [RawSubscription::changed]
    pub async fn changed(&mut self) -> Option<Option<T>> {
        let value = self.raw.changed().await?;
        Some(value.and_then(|value| {
            match serde_json::from_value(value) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!(
                        "Ignoring unparseable value for key `{}`: {err}",
                        self.key
                    );
                    None
                }
            }
        }))
    }
}

/// In-process [Store]. One watch channel per key: the channel holds the
/// persisted value, and its receivers are the subscriptions. Lives for the
/// duration of the host process; nothing here touches disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    channels: RwLock<HashMap<String, watch::Sender<Option<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_value(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let channels = self.channels.read().await;
        Ok(channels.get(key).and_then(|tx| tx.borrow().clone()))
    }

    async fn set_value(&self, key: &str, value: Value) -> anyhow::Result<bool> {
        info!("Storing value for key `{key}`");
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(key.to_owned())
            .or_insert_with(|| watch::channel(None).0);
        tx.send_replace(Some(value));
        Ok(true)
    }

    async fn subscribe_value(
        &self,
        key: &str,
    ) -> anyhow::Result<RawSubscription> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(key.to_owned())
            .or_insert_with(|| watch::channel(None).0);
        Ok(RawSubscription { rx: tx.subscribe() })
    }
}
