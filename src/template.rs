//! Generic "hello world" template variant: same settings/render split as the
//! weather widget, reduced to a single subtitle string synchronized through
//! the store.

use crate::{
    error::{Error, Result},
    store::{Store, StoreExt, Subscription, SUBTITLE_KEY},
};
use anyhow::anyhow;
use log::{error, info};
use std::sync::Arc;

/// Shown until a subtitle has been configured
pub const DEFAULT_SUBTITLE: &str = "Hello World";

/// Settings side: edits a working copy, persists on save
#[derive(Debug)]
pub struct SubtitleSettings<S> {
    store: Arc<S>,
    subtitle: String,
}

impl<S: Store> SubtitleSettings<S> {
    pub async fn load(store: Arc<S>) -> Result<Self> {
        let subtitle = store
            .get::<String>(SUBTITLE_KEY)
            .await
            .map_err(Error::Persistence)?
            .unwrap_or_else(|| DEFAULT_SUBTITLE.to_owned());
        Ok(Self { store, subtitle })
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn set_subtitle(&mut self, subtitle: impl Into<String>) {
        self.subtitle = subtitle.into();
    }

    pub async fn save(&self) -> Result<()> {
        info!("Saving subtitle: {:?}", self.subtitle);
        match self.store.set(SUBTITLE_KEY, &self.subtitle).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                Err(Error::Persistence(anyhow!("Store rejected the write")))
            }
            Err(err) => Err(Error::Persistence(err)),
        }
    }
}

/// Render side: holds the current subtitle and follows store updates
pub struct SubtitleRender {
    subscription: Subscription<String>,
    subtitle: String,
}

impl SubtitleRender {
    pub async fn start<S: Store>(store: &S) -> Result<Self> {
        let subscription = store
            .subscribe::<String>(SUBTITLE_KEY)
            .await
            .map_err(Error::Persistence)?;
        let subtitle = match store.get::<String>(SUBTITLE_KEY).await {
            Ok(Some(subtitle)) => subtitle,
            Ok(None) => DEFAULT_SUBTITLE.to_owned(),
            Err(err) => {
                error!("Error loading subtitle: {err:?}");
                DEFAULT_SUBTITLE.to_owned()
            }
        };
        Ok(Self {
            subscription,
            subtitle,
        })
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    /// Wait for the next subtitle update. Returns `None` once the store is
    /// gone; cleared or unparseable values are skipped.
    pub async fn changed(&mut self) -> Option<&str> {
        loop {
            match self.subscription.changed().await? {
                Some(subtitle) => {
                    self.subtitle = subtitle;
                    return Some(&self.subtitle);
                }
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_default_subtitle() {
        let store = Arc::new(MemoryStore::new());
        let render = SubtitleRender::start(store.as_ref()).await.unwrap();
        assert_eq!(render.subtitle(), DEFAULT_SUBTITLE);
    }

    #[tokio::test]
    async fn test_save_reaches_render() {
        let store = Arc::new(MemoryStore::new());
        let mut render = SubtitleRender::start(store.as_ref()).await.unwrap();

        let mut settings =
            SubtitleSettings::load(Arc::clone(&store)).await.unwrap();
        settings.set_subtitle("Now playing");
        settings.save().await.unwrap();

        assert_eq!(render.changed().await, Some("Now playing"));
        assert_eq!(render.subtitle(), "Now playing");
    }

    #[tokio::test]
    async fn test_render_loads_existing_value() {
        let store = Arc::new(MemoryStore::new());
        store.set(SUBTITLE_KEY, &"Welcome".to_owned()).await.unwrap();
        let render = SubtitleRender::start(store.as_ref()).await.unwrap();
        assert_eq!(render.subtitle(), "Welcome");
    }
}
