//! Display model and presentation derivation: what the host should draw,
//! derived from fetched data and the current configuration. Pure data and
//! pure functions; actual layout/markup is the host's problem.

use crate::{
    config::{ForecastType, WidgetConfig},
    weather::{Conditions, ForecastEntry},
};
use chrono::{DateTime, Local};

/// Hourly layouts always show a fixed number of entries, regardless of how
/// many hours were requested
const HOURLY_VISIBLE: usize = 6;

/// Everything the render view needs to draw one location. Conditions and
/// forecast are replaced per fetch cycle, never partially updated: a cycle
/// either applies a full conditions record or leaves the old one alone, and
/// likewise for the forecast.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayModel {
    /// Name of the location currently shown. Set alongside conditions, so it
    /// never gets ahead of the data on screen.
    pub location: String,
    pub conditions: Option<Conditions>,
    pub forecast: Vec<ForecastEntry>,
    /// Transient flag for the rotation transition; the host dims the view
    /// while this is set
    pub fading: bool,
}

impl DisplayModel {
    /// The forecast entries that should actually be drawn: the first
    /// `forecast_days` for a daily forecast, a fixed window for hourly.
    /// Empty when the forecast display is disabled.
    pub fn visible_forecast(&self, config: &WidgetConfig) -> &[ForecastEntry] {
        if !config.show_forecast {
            return &[];
        }
        let count = match config.forecast_type {
            ForecastType::Daily => config.forecast_days as usize,
            ForecastType::Hourly => HOURLY_VISIBLE,
        };
        &self.forecast[..self.forecast.len().min(count)]
    }
}

/// What the host should show right now
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DisplayView {
    /// First fetch still in flight
    #[default]
    Loading,
    /// Fetch failed and there's no stale data to fall back on
    Error(String),
    /// No usable location; prompt the user to open settings
    Unconfigured,
    /// Data available (possibly stale)
    Ready,
}

/// One drawable snapshot of the render controller's state, as published to
/// the host while the controller runs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayFrame {
    pub model: DisplayModel,
    pub view: DisplayView,
}

/// Layout class, selected by viewport aspect ratio. Recomputed by the host
/// on every resize.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    Landscape,
    Square,
    Tall,
}

impl Layout {
    pub fn for_viewport(width: u32, height: u32) -> Self {
        if height == 0 {
            return Self::Landscape;
        }
        let ratio = f64::from(width) / f64::from(height);
        if ratio >= 1.5 {
            Self::Landscape
        } else if (0.7..1.3).contains(&ratio) {
            Self::Square
        } else if ratio < 0.7 {
            Self::Tall
        } else {
            // The 1.3..1.5 band reads better as landscape than square
            Self::Landscape
        }
    }
}

/// Icon for a weather code, with a generic fallback for codes we don't know
pub fn weather_icon(code: &str) -> &'static str {
    match code {
        "clear-day" => "☀️",
        "clear-night" => "🌙",
        "partly-cloudy-day" => "⛅",
        "partly-cloudy-night" | "cloudy" => "☁️",
        "fog" => "🌫️",
        "wind" => "💨",
        "rain" => "🌧️",
        "sleet" => "🌨️",
        "snow" => "❄️",
        "thunderstorm" => "⛈️",
        _ => "🌤️",
    }
}

/// Label for a daily forecast entry: "Today" for the current date, short
/// weekday otherwise. Unparseable timestamps pass through unchanged.
pub fn day_label(datetime: &str) -> String {
    match DateTime::parse_from_rfc3339(datetime) {
        Ok(parsed) => {
            let local = parsed.with_timezone(&Local);
            if local.date_naive() == Local::now().date_naive() {
                "Today".into()
            } else {
                local.format("%a").to_string()
            }
        }
        Err(_) => datetime.to_owned(),
    }
}

/// Label for an hourly forecast entry, e.g. "5:00 PM"
pub fn time_label(datetime: &str) -> String {
    match DateTime::parse_from_rfc3339(datetime) {
        Ok(parsed) => {
            parsed.with_timezone(&Local).format("%-I:%M %p").to_string()
        }
        Err(_) => datetime.to_owned(),
    }
}
