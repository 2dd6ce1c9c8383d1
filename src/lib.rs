//! Core logic for an embeddable weather widget (plus a minimal "hello
//! world" template variant). The host platform supplies persistence
//! ([store::Store]) and weather data ([weather::WeatherProvider]); this
//! crate supplies everything between them: the configuration schema, the
//! settings controller that owns writes, and the render controller that
//! subscribes, fetches, and keeps a display model up to date.
//!
//! Rendering itself is out of scope. A host drives
//! [render::RenderController::run] on its event loop and draws
//! [display::DisplayFrame]s received through a
//! [render::DisplayHandle].

pub mod config;
pub mod display;
pub mod error;
pub mod mock;
pub mod render;
pub mod settings;
pub mod store;
pub mod template;
pub mod weather;

pub use error::{Error, Result};
