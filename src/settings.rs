//! Settings controller: loads, edits, validates, and persists the widget
//! configuration. This is the only writer of the stored config; render
//! instances pick up changes through their store subscriptions.

use crate::{
    config::{ConfigPatch, WidgetConfig},
    error::{Error, Result},
    store::{Store, StoreExt, CONFIG_KEY},
};
use anyhow::anyhow;
use log::{error, info};
use std::{sync::Arc, time::Duration};

/// Which way to move a rotation location in the list
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Up,
    Down,
}

/// Backs the settings view. Edits mutate an in-memory working copy; nothing
/// reaches the store until [Self::save].
#[derive(Debug)]
pub struct SettingsController<S> {
    store: Arc<S>,
    config: WidgetConfig,
}

impl<S: Store> SettingsController<S> {
    /// How long the host should show the "saved" notice after a successful
    /// save
    pub const SAVED_NOTICE_DURATION: Duration = Duration::from_secs(3);

    /// Load the stored config, upgrading partial records from older schema
    /// versions. If no record exists yet, write the defaults back so the
    /// store always holds an explicit record after first load.
    pub async fn load(store: Arc<S>) -> Result<Self> {
        let config = match store.get::<ConfigPatch>(CONFIG_KEY).await {
            Ok(Some(stored)) => stored.merge_with_defaults(),
            Ok(None) => {
                let config = WidgetConfig::default();
                info!("No stored config, initializing defaults");
                // Best-effort: a failed initial write just means the next
                // save does it instead
                if let Err(err) = store.set(CONFIG_KEY, &config).await {
                    error!("Error initializing stored config: {err:?}");
                }
                config
            }
            Err(err) => return Err(Error::Persistence(err)),
        };
        Ok(Self { store, config })
    }

    /// The current working copy
    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Shallow-merge a patch into the working copy
    pub fn update(&mut self, patch: ConfigPatch) {
        self.config.apply(patch);
    }

    /// Append a rotation location. Input is trimmed; empty input is a no-op.
    /// Duplicates are allowed, matching the settings form.
    pub fn add_location(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.config.locations.push(name.to_owned());
    }

    /// Remove the location at `index`. Out of range is a no-op.
    pub fn remove_location(&mut self, index: usize) {
        if index < self.config.locations.len() {
            self.config.locations.remove(index);
        }
    }

    /// Swap the location at `index` with its neighbor. The first entry can't
    /// move up and the last can't move down; both are no-ops.
    pub fn move_location(&mut self, index: usize, direction: Direction) {
        let locations = &mut self.config.locations;
        match direction {
            Direction::Up if index > 0 && index < locations.len() => {
                locations.swap(index - 1, index);
            }
            Direction::Down if index + 1 < locations.len() => {
                locations.swap(index, index + 1);
            }
            _ => {}
        }
    }

    /// Validate and persist the working copy. On a validation failure
    /// nothing is written.
    pub async fn save(&self) -> Result<()> {
        self.validate()?;
        info!("Saving config: {:?}", self.config);
        match self.store.set(CONFIG_KEY, &self.config).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                Err(Error::Persistence(anyhow!("Store rejected the write")))
            }
            Err(err) => Err(Error::Persistence(err)),
        }
    }

    /// The mode-appropriate location requirement: rotation mode needs at
    /// least one non-blank location, single mode needs a non-blank city.
    /// Enforced at save time only, so intermediate edit states can be
    /// invalid.
    fn validate(&self) -> Result<()> {
        if self.config.enable_rotation {
            let usable = self
                .config
                .locations
                .iter()
                .any(|name| !name.trim().is_empty());
            if !usable {
                return Err(Error::Validation(
                    "Please provide at least one location for rotation"
                        .into(),
                ));
            }
        } else if self.config.city.trim().is_empty() {
            return Err(Error::Validation("Please provide a city name".into()));
        }
        Ok(())
    }
}
