//! Mock weather provider, to run the widget and its tests without a host
//! platform.

use crate::weather::{
    Conditions, ConditionsRequest, ForecastEntry, ForecastRequest,
    WeatherProvider,
};
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

/// Programmable [WeatherProvider]: serves canned responses, optionally fails
/// on demand, and records every request it receives.
#[derive(Debug)]
pub struct MockWeather {
    conditions: Mutex<Conditions>,
    forecast: Mutex<Vec<ForecastEntry>>,
    fail_conditions: AtomicBool,
    fail_forecast: AtomicBool,
    conditions_requests: Mutex<Vec<ConditionsRequest>>,
    forecast_requests: Mutex<Vec<ForecastRequest>>,
}

impl Default for MockWeather {
    fn default() -> Self {
        Self {
            conditions: Mutex::new(Conditions {
                weather_text: "Sunny".into(),
                weather_code: "clear-day".into(),
                temp: 72.0,
                relative_humidity: 40.0,
                wind_speed: 5.0,
            }),
            forecast: Mutex::new(Vec::new()),
            fail_conditions: AtomicBool::new(false),
            fail_forecast: AtomicBool::new(false),
            conditions_requests: Mutex::new(Vec::new()),
            forecast_requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockWeather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_conditions(&self, conditions: Conditions) {
        *self.conditions.lock().unwrap() = conditions;
    }

    pub fn set_forecast(&self, forecast: Vec<ForecastEntry>) {
        *self.forecast.lock().unwrap() = forecast;
    }

    pub fn fail_conditions(&self, fail: bool) {
        self.fail_conditions.store(fail, Ordering::Relaxed);
    }

    pub fn fail_forecast(&self, fail: bool) {
        self.fail_forecast.store(fail, Ordering::Relaxed);
    }

    pub fn conditions_requests(&self) -> Vec<ConditionsRequest> {
        self.conditions_requests.lock().unwrap().clone()
    }

    pub fn forecast_requests(&self) -> Vec<ForecastRequest> {
        self.forecast_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherProvider for MockWeather {
    async fn conditions(
        &self,
        request: &ConditionsRequest,
    ) -> anyhow::Result<Conditions> {
        self.conditions_requests.lock().unwrap().push(request.clone());
        if self.fail_conditions.load(Ordering::Relaxed) {
            return Err(anyhow!("Weather service unavailable"));
        }
        Ok(self.conditions.lock().unwrap().clone())
    }

    async fn forecast(
        &self,
        request: &ForecastRequest,
    ) -> anyhow::Result<Vec<ForecastEntry>> {
        self.forecast_requests.lock().unwrap().push(request.clone());
        if self.fail_forecast.load(Ordering::Relaxed) {
            return Err(anyhow!("Forecast service unavailable"));
        }
        Ok(self.forecast.lock().unwrap().clone())
    }
}

/// Build a forecast of `count` consecutive entries, for tests
pub fn sample_forecast(count: usize) -> Vec<ForecastEntry> {
    (0..count)
        .map(|i| ForecastEntry {
            datetime: format!("2024-05-{:02}T12:00:00Z", i + 1),
            weather_code: "clear-day".into(),
            min_temp: 50.0 + i as f64,
            max_temp: 70.0 + i as f64,
        })
        .collect()
}
