//! Widget configuration: the record persisted in the host store, shared
//! between the settings and render views.

use serde::{Deserialize, Serialize};

/// Widget settings, as persisted under [crate::store::CONFIG_KEY]. Field
/// names match the host store's records, so the serde names are load-bearing.
///
/// Written exclusively by the settings controller; the render controller only
/// ever reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Single-location mode target
    pub city: String,
    /// Rotation mode targets, in display order
    pub locations: Vec<String>,
    pub enable_rotation: bool,
    /// Seconds between location changes in rotation mode (5-60)
    pub rotation_interval: u64,
    pub units: Units,
    pub theme: Theme,
    pub show_forecast: bool,
    pub forecast_type: ForecastType,
    /// 1-5, used when `forecast_type` is daily
    pub forecast_days: u32,
    /// 1-120, used when `forecast_type` is hourly
    pub forecast_hours: u32,
    /// Minutes between automatic refreshes (5-60)
    pub refresh_interval: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            city: "New York".into(),
            locations: vec![
                "New York".into(),
                "Los Angeles".into(),
                "Chicago".into(),
            ],
            enable_rotation: false,
            rotation_interval: 10,
            units: Units::default(),
            theme: Theme::default(),
            show_forecast: true,
            forecast_type: ForecastType::default(),
            forecast_days: 5,
            forecast_hours: 24,
            refresh_interval: 20,
        }
    }
}

impl WidgetConfig {
    /// Shallow-merge a patch into this config. Absent patch fields leave the
    /// current value untouched.
    pub fn apply(&mut self, patch: ConfigPatch) {
        let Self {
            city,
            locations,
            enable_rotation,
            rotation_interval,
            units,
            theme,
            show_forecast,
            forecast_type,
            forecast_days,
            forecast_hours,
            refresh_interval,
        } = self;
        merge(city, patch.city);
        merge(locations, patch.locations);
        merge(enable_rotation, patch.enable_rotation);
        merge(rotation_interval, patch.rotation_interval);
        merge(units, patch.units);
        merge(theme, patch.theme);
        merge(show_forecast, patch.show_forecast);
        merge(forecast_type, patch.forecast_type);
        merge(forecast_days, patch.forecast_days);
        merge(forecast_hours, patch.forecast_hours);
        merge(refresh_interval, patch.refresh_interval);
    }
}

fn merge<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

/// A partial [WidgetConfig]. Stored records are always read through this
/// type, so a record written by an older schema version deserializes cleanly
/// and picks up defaults for whatever it's missing. Also used as the patch
/// type for settings edits.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub city: Option<String>,
    pub locations: Option<Vec<String>>,
    pub enable_rotation: Option<bool>,
    pub rotation_interval: Option<u64>,
    pub units: Option<Units>,
    pub theme: Option<Theme>,
    pub show_forecast: Option<bool>,
    pub forecast_type: Option<ForecastType>,
    pub forecast_days: Option<u32>,
    pub forecast_hours: Option<u32>,
    pub refresh_interval: Option<u64>,
}

impl ConfigPatch {
    /// Fill every missing field from the default config. Each field defaults
    /// independently, so partial records from any schema vintage upgrade
    /// transparently. No validation happens here; that's the settings
    /// controller's job at save time.
    pub fn merge_with_defaults(self) -> WidgetConfig {
        let mut config = WidgetConfig::default();
        config.apply(self);
        config
    }
}

/// Unit system for all numeric weather values
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

impl Units {
    pub fn wind_label(self) -> &'static str {
        match self {
            Self::Imperial => "mph",
            Self::Metric => "km/h",
        }
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ForecastType {
    #[default]
    Daily,
    Hourly,
}
