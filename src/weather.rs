//! Weather provider collaborator: the host-supplied API that resolves a city
//! name to current conditions and forecasts. The widget never talks to a
//! weather service directly.

use crate::config::Units;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Host-provided weather API. The `units` parameter governs the unit system
/// of every numeric field in the response.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn conditions(
        &self,
        request: &ConditionsRequest,
    ) -> anyhow::Result<Conditions>;

    async fn forecast(
        &self,
        request: &ForecastRequest,
    ) -> anyhow::Result<Vec<ForecastEntry>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionsRequest {
    pub city: String,
    pub units: Units,
}

/// Forecast request, tagged by forecast shape
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForecastRequest {
    Daily {
        city: String,
        units: Units,
        /// Number of days requested (1-5)
        days: u32,
    },
    Hourly {
        city: String,
        units: Units,
        /// Number of hours requested (1-120)
        hours: u32,
    },
}

impl ForecastRequest {
    pub fn city(&self) -> &str {
        match self {
            Self::Daily { city, .. } | Self::Hourly { city, .. } => city,
        }
    }

    pub fn units(&self) -> Units {
        match self {
            Self::Daily { units, .. } | Self::Hourly { units, .. } => *units,
        }
    }
}

/// Current conditions for one location. The host API returns a much larger
/// payload; these are the fields the display actually uses. Serde names
/// match the host SDK's wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Conditions {
    /// Localized description, e.g. "Partly cloudy"
    pub weather_text: String,
    /// Icon selector, e.g. "partly-cloudy-day"
    pub weather_code: String,
    pub temp: f64,
    pub relative_humidity: f64,
    pub wind_speed: f64,
}

/// One period of a daily or hourly forecast
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForecastEntry {
    /// RFC 3339 timestamp for the start of the period
    pub datetime: String,
    pub weather_code: String,
    pub min_temp: f64,
    pub max_temp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// The host SDK sends a superset of what we model; extra fields must not
    /// break parsing
    #[test]
    fn test_conditions_from_sdk_payload() {
        let payload = json!({
            "CityLocalized": "Boston",
            "CityEnglish": "Boston",
            "CountryCode": "US",
            "WeatherText": "Light rain",
            "WeatherCode": "rain",
            "Temp": 54.0,
            "RelativeHumidity": 87.0,
            "WindSpeed": 12.5,
            "WindDirectionDegrees": "220",
            "Pressure": 1012.0,
            "Timestamp": 1714000000,
        });
        let conditions: Conditions =
            serde_json::from_value(payload).unwrap();
        assert_eq!(conditions.weather_text, "Light rain");
        assert_eq!(conditions.weather_code, "rain");
        assert_eq!(conditions.temp, 54.0);
        assert_eq!(conditions.relative_humidity, 87.0);
        assert_eq!(conditions.wind_speed, 12.5);
    }

    #[test]
    fn test_forecast_entry_from_sdk_payload() {
        let payload = json!({
            "Datetime": "2024-05-24T00:00:00Z",
            "Pod": "d",
            "Label": "Friday",
            "WeatherCode": "clear-day",
            "Temp": 70.0,
            "MinTemp": 58.0,
            "MaxTemp": 75.0,
        });
        let entry: ForecastEntry = serde_json::from_value(payload).unwrap();
        assert_eq!(entry.datetime, "2024-05-24T00:00:00Z");
        assert_eq!(entry.min_temp, 58.0);
        assert_eq!(entry.max_temp, 75.0);
    }

    #[test]
    fn test_forecast_request_accessors() {
        let request = ForecastRequest::Hourly {
            city: "Tokyo".into(),
            units: Units::Metric,
            hours: 24,
        };
        assert_eq!(request.city(), "Tokyo");
        assert_eq!(request.units(), Units::Metric);
    }
}
