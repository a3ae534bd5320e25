use crate::audit::AuditLog;
use crate::config::ConfigHandle;
use crate::device::LocationSource;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
    Gps,
    Network,
}

/// A position fix. Serializes to the telemetry wire shape `{ts, lat, lon}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSample {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip)]
    pub accuracy_m: f32,
    #[serde(skip)]
    pub provider: LocationProvider,
    #[serde(rename = "ts")]
    pub timestamp_ms: i64,
}

impl LocationSample {
    pub fn new(lat: f64, lon: f64, provider: LocationProvider, timestamp_ms: i64) -> Self {
        Self {
            lat,
            lon,
            accuracy_m: 0.0,
            provider,
            timestamp_ms,
        }
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }

    /// `LOCATION|lat|lon|accuracy|provider|timestamp`
    pub fn log_line(&self) -> String {
        format!(
            "LOCATION|{:.6}|{:.6}|{:.1}|{}|{}",
            self.lat, self.lon, self.accuracy_m, self.provider, self.timestamp_ms
        )
    }
}

/// The more recent of two optional fixes.
pub fn best_of(a: Option<LocationSample>, b: Option<LocationSample>) -> Option<LocationSample> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a.timestamp_ms > b.timestamp_ms { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Best last-known fix across both providers.
pub fn best_last_known(source: &dyn LocationSource) -> Option<LocationSample> {
    best_of(
        source.last_known(LocationProvider::Gps),
        source.last_known(LocationProvider::Network),
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

/// Last forwarded fix and when it was forwarded.
#[derive(Debug, Default)]
struct RateLimitState {
    last: Option<(LocationSample, i64)>,
}

/// General-purpose location reporting with a minimum interval and
/// displacement. Thresholds are read from configuration on every sample and
/// are smaller under the emergency posture.
pub struct LocationReporter {
    config: ConfigHandle,
    audit: AuditLog,
    emergency_posture: AtomicBool,
    state: Mutex<RateLimitState>,
}

impl LocationReporter {
    pub fn new(config: ConfigHandle, audit: AuditLog) -> Self {
        let posture = config.load().location.emergency_posture;
        Self {
            config,
            audit,
            emergency_posture: AtomicBool::new(posture),
            state: Mutex::new(RateLimitState::default()),
        }
    }

    pub fn set_posture(&self, emergency: bool) {
        self.emergency_posture.store(emergency, Ordering::SeqCst);
    }

    pub fn is_emergency_posture(&self) -> bool {
        self.emergency_posture.load(Ordering::SeqCst)
    }

    pub fn thresholds(&self) -> Thresholds {
        let location = &self.config.load().location;
        if self.is_emergency_posture() {
            Thresholds {
                min_interval: Duration::from_millis(location.emergency_interval_ms),
                min_distance_m: location.emergency_min_distance_m,
            }
        } else {
            Thresholds {
                min_interval: Duration::from_millis(location.normal_interval_ms),
                min_distance_m: location.normal_min_distance_m,
            }
        }
    }

    /// Decide whether `sample`, observed at `now_ms`, is forwarded. Records
    /// it as the last forwarded fix when it is.
    ///
    /// A sample is dropped only when it is both too soon and too close.
    pub fn should_forward(&self, sample: &LocationSample, now_ms: i64) -> bool {
        let thresholds = self.thresholds();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some((last, at_ms)) = &state.last {
            let elapsed = u64::try_from(now_ms.saturating_sub(*at_ms)).unwrap_or(0);
            let too_soon = u128::from(elapsed) < thresholds.min_interval.as_millis();
            let too_close = last.distance_to(sample) < thresholds.min_distance_m;
            if too_soon && too_close {
                return false;
            }
        }
        state.last = Some((sample.clone(), now_ms));
        true
    }

    /// Rate-limit and, when forwarded, write the sample to the audit log.
    pub fn process(&self, sample: &LocationSample) -> bool {
        let now_ms = chrono::Utc::now().timestamp_millis();
        if !self.should_forward(sample, now_ms) {
            tracing::trace!("location sample rate-limited");
            return false;
        }
        self.audit.info(sample.log_line());
        true
    }

    /// Subscribe to continuous updates at the current interval and feed
    /// them through [`LocationReporter::process`] until `cancel` fires.
    pub fn spawn_tracking(
        self: &Arc<Self>,
        source: Arc<dyn LocationSource>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let reporter = Arc::clone(self);
        tokio::spawn(async move {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let interval = reporter.thresholds().min_interval;
            let registration = match source.request_updates(interval, tx) {
                Ok(id) => id,
                Err(e) => {
                    reporter
                        .audit
                        .warn(format!("Failed to start location tracking: {e}"));
                    return;
                }
            };
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    sample = rx.recv() => match sample {
                        Some(sample) => {
                            reporter.process(&sample);
                        }
                        None => break,
                    },
                }
            }
            source.remove_updates(registration);
        })
    }
}
