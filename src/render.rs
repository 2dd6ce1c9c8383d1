//! Render controller: subscribes to configuration changes, schedules fetch
//! cycles, and maintains the display model the host draws from.

use crate::{
    config::{ConfigPatch, ForecastType, WidgetConfig},
    display::{DisplayFrame, DisplayModel, DisplayView},
    error::{Error, Result},
    store::{Store, StoreExt, Subscription, CONFIG_KEY},
    weather::{
        Conditions, ConditionsRequest, ForecastEntry, ForecastRequest,
        WeatherProvider,
    },
};
use log::{debug, error, info, warn};
use std::{sync::Arc, time::Duration};
use tokio::{
    select,
    sync::watch,
    time::{self, Instant, MissedTickBehavior},
};

/// What triggered a fetch cycle. The two kinds differ in visible behavior:
/// a change-driven cycle shows a loading state and surfaces failures, a
/// silent cycle does neither.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Cycle {
    /// Config or location-index change
    Change,
    /// Periodic refresh timer
    Silent,
}

/// Backs the render view. Owns the config subscription and both recurring
/// timers; dropping the controller (or the future returned by [Self::run])
/// tears all of them down together, so a deactivated instance can never
/// apply a late fetch result.
pub struct RenderController<W> {
    weather: Arc<W>,
    subscription: Subscription<ConfigPatch>,
    config: WidgetConfig,
    /// Active entry in `config.locations` while rotating
    location_index: usize,
    model: DisplayModel,
    loading: bool,
    error: Option<Error>,
    /// Sequence number of the most recently started fetch cycle
    cycle_seq: u64,
    /// Sequence number of the cycle whose results are on display. Results
    /// from any older cycle are stale and get discarded.
    applied_seq: u64,
    /// Snapshots for [DisplayHandle]s; updated after every state change
    frames: watch::Sender<DisplayFrame>,
}

/// Read side of a running [RenderController]: the host draws from this while
/// [RenderController::run] owns the controller. Latest-frame-only, like the
/// store subscriptions.
pub struct DisplayHandle {
    rx: watch::Receiver<DisplayFrame>,
}

impl DisplayHandle {
    /// The newest published frame
    pub fn current(&self) -> DisplayFrame {
        self.rx.borrow().clone()
    }

    /// Wait for the next frame. `None` once the controller is gone.
    pub async fn changed(&mut self) -> Option<DisplayFrame> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Fade-out time before a rotation advances, matching the view transition
const FADE_OUT: Duration = Duration::from_millis(300);
/// Delay between advancing the location and fading back in
const FADE_IN: Duration = Duration::from_millis(50);

impl<W: WeatherProvider> RenderController<W> {
    /// Read the initial config (defaults if nothing is stored), register the
    /// change subscription, and run the first fetch cycle.
    pub async fn start<S: Store>(
        store: &S,
        weather: Arc<W>,
    ) -> Result<Self> {
        debug!("Setting up config subscription");
        // Subscribe before the initial read so a write landing in between
        // isn't lost
        let subscription = store
            .subscribe::<ConfigPatch>(CONFIG_KEY)
            .await
            .map_err(Error::Persistence)?;
        let config = match store.get::<ConfigPatch>(CONFIG_KEY).await {
            Ok(Some(stored)) => stored.merge_with_defaults(),
            Ok(None) => WidgetConfig::default(),
            Err(err) => {
                error!("Error loading initial config: {err:?}");
                WidgetConfig::default()
            }
        };
        debug!("Initial config: {config:?}");

        let (frames, _) = watch::channel(DisplayFrame::default());
        let mut controller = Self {
            weather,
            subscription,
            config,
            location_index: 0,
            model: DisplayModel::default(),
            loading: false,
            error: None,
            cycle_seq: 0,
            applied_seq: 0,
            frames,
        };
        controller.fetch_cycle(Cycle::Change).await;
        Ok(controller)
    }

    /// A handle the host keeps to draw from while [Self::run] owns the
    /// controller. Any number of handles may exist.
    pub fn display_handle(&self) -> DisplayHandle {
        DisplayHandle {
            rx: self.frames.subscribe(),
        }
    }

    /// Drive the controller until the store goes away: react to config
    /// changes, refresh on the configured interval, and rotate locations
    /// when rotation is enabled.
    pub async fn run(mut self) -> Result<()> {
        info!("Starting render controller");
        let mut refresh = self.refresh_interval();
        let mut rotation = self.rotation_interval();
        loop {
            select! {
                changed = self.subscription.changed() => match changed {
                    Some(Some(patch)) => {
                        self.apply_config(patch.merge_with_defaults());
                        // Intervals restart so new periods take effect now
                        refresh = self.refresh_interval();
                        rotation = self.rotation_interval();
                        self.fetch_cycle(Cycle::Change).await;
                    }
                    // Cleared or unparseable record; keep the last good
                    // config
                    Some(None) => {}
                    None => {
                        info!("Store closed, stopping render controller");
                        return Ok(());
                    }
                },
                _ = refresh.tick() => self.fetch_cycle(Cycle::Silent).await,
                _ = rotation.tick(), if self.rotating() => {
                    self.rotate().await;
                }
            }
        }
    }

    /// What the host should draw right now
    pub fn view(&self) -> DisplayView {
        if self.model.conditions.is_some() {
            // Stale data beats an error screen
            return DisplayView::Ready;
        }
        if self.loading {
            return DisplayView::Loading;
        }
        match &self.error {
            Some(Error::NoLocation) | None => DisplayView::Unconfigured,
            Some(error) => DisplayView::Error(error.to_string()),
        }
    }

    pub fn model(&self) -> &DisplayModel {
        &self.model
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Push the current state out to display handles
    fn publish(&self) {
        self.frames.send_replace(DisplayFrame {
            model: self.model.clone(),
            view: self.view(),
        });
    }

    /// Replace the working config in full (subscription updates are complete
    /// records, not patches to the current state)
    fn apply_config(&mut self, config: WidgetConfig) {
        debug!("Config updated: {config:?}");
        if self.location_index >= config.locations.len() {
            self.location_index = 0;
        }
        self.config = config;
    }

    fn rotating(&self) -> bool {
        self.config.enable_rotation && self.config.locations.len() > 1
    }

    /// The location a change-driven cycle should fetch, or `None` when
    /// nothing usable is configured
    fn active_location(&self) -> Option<&str> {
        let city = if self.config.enable_rotation
            && !self.config.locations.is_empty()
        {
            self.config
                .locations
                .get(self.location_index)
                .map(String::as_str)
                .unwrap_or_default()
        } else {
            &self.config.city
        };
        if city.trim().is_empty() {
            None
        } else {
            Some(city)
        }
    }

    /// One rotation tick: fade out, advance the location, fade back in, then
    /// fetch the new location
    async fn rotate(&mut self) {
        self.model.fading = true;
        self.publish();
        time::sleep(FADE_OUT).await;

        self.location_index =
            (self.location_index + 1) % self.config.locations.len();
        debug!(
            "Rotating to location {}: {}",
            self.location_index, self.config.locations[self.location_index]
        );

        time::sleep(FADE_IN).await;
        self.model.fading = false;
        self.fetch_cycle(Cycle::Change).await;
    }

    /// One logical unit of fetching: conditions, plus a forecast when
    /// enabled. A conditions failure abandons the cycle and keeps the stale
    /// model; a forecast failure still leaves the fresh conditions applied.
    async fn fetch_cycle(&mut self, cycle: Cycle) {
        self.cycle_seq += 1;
        let seq = self.cycle_seq;
        if cycle == Cycle::Change {
            self.loading = true;
            self.error = None;
            self.publish();
        }

        let result = self.run_cycle(cycle, seq).await;

        if cycle == Cycle::Change {
            self.loading = false;
        }
        if let Err(err) = result {
            match cycle {
                Cycle::Change => {
                    error!("Weather fetch error: {err:?}");
                    self.error = Some(err);
                }
                // Background refreshes never surface failures; the stale
                // display stays up
                Cycle::Silent => warn!("Auto-refresh error: {err:?}"),
            }
        }
        self.publish();
    }

    async fn run_cycle(&mut self, cycle: Cycle, seq: u64) -> Result<()> {
        let city = match cycle {
            Cycle::Change => self.active_location(),
            // The periodic refresh polls the primary city even in rotation
            // mode; rotation-aware fetching only happens on change-driven
            // cycles
            Cycle::Silent => {
                Some(self.config.city.as_str())
                    .filter(|city| !city.trim().is_empty())
            }
        };
        let city = city.ok_or(Error::NoLocation)?.to_owned();

        let request = ConditionsRequest {
            city: city.clone(),
            units: self.config.units,
        };
        let conditions = self
            .weather
            .conditions(&request)
            .await
            .map_err(Error::Fetch)?;
        // A silent refresh updates the data but not the displayed location
        // name, which may be a rotation entry
        let location = match cycle {
            Cycle::Change => Some(city.clone()),
            Cycle::Silent => None,
        };
        self.apply_conditions(seq, location, conditions);

        if self.config.show_forecast {
            let request = match self.config.forecast_type {
                ForecastType::Daily => ForecastRequest::Daily {
                    city,
                    units: self.config.units,
                    days: self.config.forecast_days,
                },
                ForecastType::Hourly => ForecastRequest::Hourly {
                    city,
                    units: self.config.units,
                    hours: self.config.forecast_hours,
                },
            };
            debug!(
                "Fetching forecast for {} in {:?} units",
                request.city(),
                request.units()
            );
            match self.weather.forecast(&request).await {
                Ok(entries) => self.apply_forecast(seq, entries),
                // Conditions already applied; the old forecast stays
                Err(err) => warn!("Forecast fetch error: {err:?}"),
            }
        }
        Ok(())
    }

    fn apply_conditions(
        &mut self,
        seq: u64,
        location: Option<String>,
        conditions: Conditions,
    ) {
        if seq < self.applied_seq {
            debug!("Discarding stale conditions from cycle {seq}");
            return;
        }
        self.applied_seq = seq;
        if let Some(location) = location {
            self.model.location = location;
        }
        self.model.conditions = Some(conditions);
        self.error = None;
    }

    fn apply_forecast(&mut self, seq: u64, entries: Vec<ForecastEntry>) {
        if seq < self.applied_seq {
            debug!("Discarding stale forecast from cycle {seq}");
            return;
        }
        self.applied_seq = seq;
        self.model.forecast = entries;
    }

    fn refresh_interval(&self) -> time::Interval {
        // Stored records aren't validated on this side; clamp to the
        // settings form's range so a bad value can't zero or overflow the
        // period
        let minutes = self.config.refresh_interval.clamp(5, 60);
        recurring(Duration::from_secs(minutes * 60))
    }

    fn rotation_interval(&self) -> time::Interval {
        let seconds = self.config.rotation_interval.clamp(5, 60);
        recurring(Duration::from_secs(seconds))
    }
}

/// An interval whose first tick is one full period away, so creating it
/// doesn't trigger an immediate cycle
fn recurring(period: Duration) -> time::Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Units,
        mock::{sample_forecast, MockWeather},
        store::MemoryStore,
    };
    use serde_json::json;

    async fn start_with(
        stored: serde_json::Value,
        forecast_len: usize,
    ) -> (Arc<MemoryStore>, Arc<MockWeather>, RenderController<MockWeather>)
    {
        let store = Arc::new(MemoryStore::new());
        store.set_value(CONFIG_KEY, stored).await.unwrap();
        let weather = Arc::new(MockWeather::new());
        weather.set_forecast(sample_forecast(forecast_len));
        let controller =
            RenderController::start(store.as_ref(), Arc::clone(&weather))
                .await
                .unwrap();
        (store, weather, controller)
    }

    fn boston_config() -> serde_json::Value {
        json!({
            "city": "Boston",
            "enableRotation": false,
            "units": "imperial",
            "showForecast": true,
            "forecastType": "daily",
            "forecastDays": 3,
            "refreshInterval": 5,
        })
    }

    #[tokio::test]
    async fn test_initial_fetch_cycle() {
        let (_store, weather, controller) =
            start_with(boston_config(), 5).await;

        // Exactly one cycle was issued, with the configured parameters
        assert_eq!(
            weather.conditions_requests(),
            vec![ConditionsRequest {
                city: "Boston".into(),
                units: Units::Imperial,
            }]
        );
        assert_eq!(
            weather.forecast_requests(),
            vec![ForecastRequest::Daily {
                city: "Boston".into(),
                units: Units::Imperial,
                days: 3,
            }]
        );

        assert_eq!(controller.view(), DisplayView::Ready);
        assert_eq!(controller.model().location, "Boston");
        // Daily layout shows the first `forecastDays` entries
        assert_eq!(
            controller.model().visible_forecast(controller.config()).len(),
            3
        );
    }

    #[tokio::test]
    async fn test_no_location_configured() {
        let (_store, weather, controller) =
            start_with(json!({"city": ""}), 0).await;
        assert_eq!(controller.view(), DisplayView::Unconfigured);
        // The fetch was never attempted
        assert!(weather.conditions_requests().is_empty());
    }

    #[tokio::test]
    async fn test_conditions_failure_without_prior_data() {
        let store = Arc::new(MemoryStore::new());
        store.set_value(CONFIG_KEY, boston_config()).await.unwrap();
        let weather = Arc::new(MockWeather::new());
        weather.fail_conditions(true);

        let controller =
            RenderController::start(store.as_ref(), Arc::clone(&weather))
                .await
                .unwrap();
        assert!(matches!(controller.view(), DisplayView::Error(_)));
    }

    #[tokio::test]
    async fn test_conditions_failure_retains_stale_model() {
        let (_store, weather, mut controller) =
            start_with(boston_config(), 5).await;
        let before = controller.model().clone();

        weather.fail_conditions(true);
        controller.fetch_cycle(Cycle::Change).await;

        // The failed cycle left the model exactly as it was, and the stale
        // data still renders
        assert_eq!(controller.model(), &before);
        assert_eq!(controller.view(), DisplayView::Ready);
    }

    #[tokio::test]
    async fn test_forecast_failure_applies_conditions() {
        let (_store, weather, mut controller) =
            start_with(boston_config(), 5).await;
        let old_forecast = controller.model().forecast.clone();

        weather.fail_forecast(true);
        weather.set_conditions(Conditions {
            weather_text: "Snow".into(),
            weather_code: "snow".into(),
            temp: 20.0,
            relative_humidity: 80.0,
            wind_speed: 15.0,
        });
        controller.fetch_cycle(Cycle::Change).await;

        let model = controller.model();
        assert_eq!(
            model.conditions.as_ref().unwrap().weather_code,
            "snow"
        );
        // Forecast untouched by the failed half of the cycle
        assert_eq!(model.forecast, old_forecast);
        assert_eq!(controller.view(), DisplayView::Ready);
    }

    #[tokio::test]
    async fn test_silent_cycle_uses_primary_city() {
        let stored = json!({
            "city": "Boston",
            "enableRotation": true,
            "locations": ["Paris", "Tokyo"],
        });
        let (_store, weather, mut controller) = start_with(stored, 5).await;

        // Change-driven cycle respects rotation
        assert_eq!(weather.conditions_requests()[0].city, "Paris");

        // The refresh timer's cycle always polls the plain city field
        controller.fetch_cycle(Cycle::Silent).await;
        let requests = weather.conditions_requests();
        assert_eq!(requests.last().unwrap().city, "Boston");
        // The displayed location name stays on the rotation entry
        assert_eq!(controller.model().location, "Paris");
    }

    #[tokio::test]
    async fn test_silent_cycle_failure_not_surfaced() {
        let (_store, weather, mut controller) =
            start_with(boston_config(), 5).await;

        weather.fail_conditions(true);
        controller.fetch_cycle(Cycle::Silent).await;

        assert!(controller.error.is_none());
        assert_eq!(controller.view(), DisplayView::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_cycles_back_to_start() {
        let stored = json!({
            "enableRotation": true,
            "locations": ["Paris", "Tokyo", "Lima"],
        });
        let (_store, weather, mut controller) = start_with(stored, 5).await;
        assert_eq!(controller.location_index, 0);

        for _ in 0..3 {
            controller.rotate().await;
            assert!(!controller.model().fading);
        }
        // N ticks over N locations lands back where it started
        assert_eq!(controller.location_index, 0);

        // Each advance triggered a change-driven fetch for the new location
        let cities: Vec<_> = weather
            .conditions_requests()
            .into_iter()
            .map(|request| request.city)
            .collect();
        assert_eq!(cities, vec!["Paris", "Tokyo", "Lima", "Paris"]);
    }

    #[tokio::test]
    async fn test_config_change_triggers_refetch() {
        let (store, weather, mut controller) =
            start_with(boston_config(), 5).await;

        let mut config = controller.config().clone();
        config.city = "Seattle".into();
        store.set(CONFIG_KEY, &config).await.unwrap();

        let patch = controller.subscription.changed().await.unwrap().unwrap();
        controller.apply_config(patch.merge_with_defaults());
        controller.fetch_cycle(Cycle::Change).await;

        assert_eq!(
            weather.conditions_requests().last().unwrap().city,
            "Seattle"
        );
        assert_eq!(controller.model().location, "Seattle");
    }

    #[tokio::test]
    async fn test_config_change_resets_out_of_range_index() {
        let stored = json!({
            "enableRotation": true,
            "locations": ["Paris", "Tokyo", "Lima"],
        });
        let (_store, _weather, mut controller) = start_with(stored, 0).await;
        controller.location_index = 2;

        let mut config = controller.config().clone();
        config.locations = vec!["Paris".into()];
        controller.apply_config(config);
        assert_eq!(controller.location_index, 0);
    }

    #[tokio::test]
    async fn test_stale_cycle_results_discarded() {
        let (_store, _weather, mut controller) =
            start_with(boston_config(), 5).await;
        let current = controller.model().clone();

        // A result from a cycle older than what's on display is dropped
        let stale_seq = controller.applied_seq - 1;
        controller.apply_conditions(
            stale_seq,
            Some("Nowhere".into()),
            Conditions {
                weather_text: "Stale".into(),
                weather_code: "fog".into(),
                temp: 0.0,
                relative_humidity: 0.0,
                wind_speed: 0.0,
            },
        );
        controller.apply_forecast(stale_seq, sample_forecast(1));

        assert_eq!(controller.model(), &current);
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_handle_observes_rotation() {
        let stored = json!({
            "enableRotation": true,
            "locations": ["Paris", "Tokyo"],
            "rotationInterval": 5,
        });
        let (store, _weather, controller) = start_with(stored, 5).await;
        let mut handle = controller.display_handle();
        assert_eq!(handle.current().view, DisplayView::Ready);
        assert_eq!(handle.current().model.location, "Paris");

        let task = tokio::spawn(controller.run());

        // First rotation tick fades the view out...
        let frame = handle.changed().await.unwrap();
        assert!(frame.model.fading);

        // ...and once the fade completes the next location lands
        let frame = loop {
            let frame = handle.changed().await.unwrap();
            if !frame.model.fading && frame.model.location == "Tokyo" {
                break frame;
            }
        };
        assert_eq!(frame.view, DisplayView::Ready);

        drop(store);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_hostile_intervals_clamped() {
        let stored = json!({
            "city": "Boston",
            "refreshInterval": u64::MAX,
            "rotationInterval": 0,
        });
        let (_store, _weather, controller) = start_with(stored, 0).await;
        // Interval creation must neither overflow nor panic on zero
        assert_eq!(
            controller.refresh_interval().period(),
            Duration::from_secs(60 * 60)
        );
        assert_eq!(
            controller.rotation_interval().period(),
            Duration::from_secs(5)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_store_closes() {
        let (store, _weather, controller) =
            start_with(boston_config(), 5).await;
        drop(store);
        // With every sender gone the subscription closes and the loop exits
        controller.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_store_uses_defaults() {
        let store = Arc::new(MemoryStore::new());
        let weather = Arc::new(MockWeather::new());
        let controller =
            RenderController::start(store.as_ref(), Arc::clone(&weather))
                .await
                .unwrap();
        // Defaults include a city, so the first cycle already resolved
        assert_eq!(controller.view(), DisplayView::Ready);
        assert_eq!(controller.model().location, "New York");
    }
}
