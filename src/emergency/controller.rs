use super::location::{LocationSample, best_last_known};
use crate::audit::AuditLog;
use crate::config::ConfigHandle;
use crate::device::{AlertTone, AudioControl, AudioStream, LocationSource, TelemetryUplink};
use crate::error::{AgentError, CommandError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Parsed `emergency-mode` payload: `on`, `on:<intervalMs>` or `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyDirective {
    On(Option<u64>),
    Off,
}

impl EmergencyDirective {
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let invalid = |message: String| CommandError::InvalidField {
            command: "emergency-mode".into(),
            field: "payload".into(),
            message,
        };
        let raw = raw.trim();
        let (verb, arg) = match raw.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg.trim())),
            None => (raw, None),
        };
        match (verb.to_ascii_lowercase().as_str(), arg) {
            ("off", _) => Ok(Self::Off),
            ("on", None) => Ok(Self::On(None)),
            ("on", Some(ms)) => ms
                .parse::<u64>()
                .map(|ms| Self::On(Some(ms)))
                .map_err(|_| invalid(format!("`{ms}` is not an interval in milliseconds"))),
            _ => Err(invalid(format!("expected on[:ms] or off, got `{raw}`"))),
        }
    }
}

/// Resources owned while active. Dropped only through `stop`.
struct ActiveSession {
    interval: Duration,
    prior_alarm_volume: Option<u32>,
    tone: Option<Box<dyn AlertTone>>,
    registration: Option<u64>,
    cancel: CancellationToken,
    ping_task: JoinHandle<()>,
    updates_task: JoinHandle<()>,
}

/// Shared pieces the spawned loops need.
#[derive(Clone)]
struct Forwarder {
    location: Arc<dyn LocationSource>,
    uplink: Arc<dyn TelemetryUplink>,
    audit: AuditLog,
    project: String,
    device_id: String,
    ping_attempts: Arc<AtomicU64>,
}

impl Forwarder {
    /// Send without waiting. Failures are logged, never retried.
    fn forward_detached(&self, sample: LocationSample) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.forward(&sample).await {
                this.audit
                    .warn(format!("Failed to send emergency location: {e}"));
            }
        });
    }

    async fn forward(&self, sample: &LocationSample) -> anyhow::Result<()> {
        self.uplink
            .send_locations(&self.project, &self.device_id, std::slice::from_ref(sample))
            .await
    }

    fn ping(&self) {
        self.ping_attempts.fetch_add(1, Ordering::SeqCst);
        match best_last_known(self.location.as_ref()) {
            Some(sample) => {
                tracing::debug!(lat = sample.lat, lon = sample.lon, "emergency ping");
                self.forward_detached(sample);
            }
            None => tracing::debug!("emergency ping: no location yet"),
        }
    }
}

/// Emergency alert mode: loud tone, maxed volume, continuous location
/// updates and a periodic ping of the best known position.
pub struct EmergencyController {
    audio: Arc<dyn AudioControl>,
    config: ConfigHandle,
    forwarder: Forwarder,
    session: Mutex<Option<ActiveSession>>,
}

impl EmergencyController {
    pub fn new(
        audio: Arc<dyn AudioControl>,
        location: Arc<dyn LocationSource>,
        uplink: Arc<dyn TelemetryUplink>,
        config: ConfigHandle,
        audit: AuditLog,
    ) -> Self {
        let (project, device_id) = {
            let snapshot = config.load();
            (snapshot.agent.project.clone(), snapshot.agent.device_id())
        };
        Self {
            audio,
            config,
            forwarder: Forwarder {
                location,
                uplink,
                audit,
                project,
                device_id,
                ping_attempts: Arc::new(AtomicU64::new(0)),
            },
            session: Mutex::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock_session().is_some()
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        self.lock_session().as_ref().map(|s| s.interval)
    }

    /// Total ping-loop ticks since construction.
    pub fn ping_attempts(&self) -> u64 {
        self.forwarder.ping_attempts.load(Ordering::SeqCst)
    }

    pub fn apply(&self, directive: EmergencyDirective) {
        match directive {
            EmergencyDirective::On(interval_ms) => self.start(interval_ms),
            EmergencyDirective::Off => {
                self.stop();
            }
        }
    }

    /// Enter the active state. When already active only the ping interval
    /// changes.
    pub fn start(&self, interval_ms: Option<u64>) {
        let interval = self.effective_interval(interval_ms);
        let mut guard = self.lock_session();

        if let Some(session) = guard.as_mut() {
            if session.interval != interval {
                session.cancel.cancel();
                session.ping_task.abort();
                session.updates_task.abort();
                if let Some(old) = session.registration.take() {
                    self.forwarder.location.remove_updates(old);
                }
                let cancel = CancellationToken::new();
                let (registration, updates_task) = self.start_updates(interval, &cancel);
                session.ping_task = self.spawn_ping_loop(interval, cancel.clone());
                session.updates_task = updates_task;
                session.registration = registration;
                session.cancel = cancel;
                session.interval = interval;
                tracing::info!(interval_ms = %interval.as_millis(), "emergency ping interval changed");
            }
            return;
        }

        self.forwarder.audit.warn(format!(
            "Emergency mode activated (ping every {} ms)",
            interval.as_millis()
        ));

        let prior_alarm_volume = self.maximize_volume();
        let tone = match self.audio.start_alert_tone() {
            Ok(tone) => Some(tone),
            Err(e) => {
                self.forwarder
                    .audit
                    .error(format!("Failed to play emergency alarm: {e}"));
                None
            }
        };

        let cancel = CancellationToken::new();
        let (registration, updates_task) = self.start_updates(interval, &cancel);
        let ping_task = self.spawn_ping_loop(interval, cancel.clone());

        *guard = Some(ActiveSession {
            interval,
            prior_alarm_volume,
            tone,
            registration,
            cancel,
            ping_task,
            updates_task,
        });
    }

    /// Leave the active state. Returns whether it was active.
    pub fn stop(&self) -> bool {
        let Some(session) = self.lock_session().take() else {
            return false;
        };

        session.cancel.cancel();
        session.ping_task.abort();
        session.updates_task.abort();

        if let Some(tone) = session.tone {
            tone.stop();
        }
        if let Some(volume) = session.prior_alarm_volume
            && let Err(e) = self.audio.set_stream_volume(AudioStream::Alarm, volume)
        {
            tracing::error!("failed to restore alarm volume: {e}");
        }
        if let Some(registration) = session.registration {
            self.forwarder.location.remove_updates(registration);
        }

        self.forwarder.audit.info("Emergency mode deactivated");
        true
    }

    /// One immediate forward of the best known location.
    pub async fn ping_once(&self) -> Result<(), AgentError> {
        let Some(sample) = best_last_known(self.forwarder.location.as_ref()) else {
            self.forwarder.audit.warn("No location available");
            return Ok(());
        };
        self.forwarder.forward(&sample).await?;
        tracing::debug!(lat = sample.lat, lon = sample.lon, "location ping sent");
        Ok(())
    }

    fn effective_interval(&self, requested_ms: Option<u64>) -> Duration {
        let emergency = &self.config.load().emergency;
        let ms = requested_ms
            .unwrap_or(emergency.default_ping_interval_ms)
            .max(emergency.min_ping_interval_ms);
        Duration::from_millis(ms)
    }

    /// Set alarm, media and ring streams to max. Returns the prior alarm volume.
    fn maximize_volume(&self) -> Option<u32> {
        let prior = match self.audio.stream_volume(AudioStream::Alarm) {
            Ok(volume) => Some(volume),
            Err(e) => {
                tracing::error!("failed to read alarm volume: {e}");
                None
            }
        };
        for stream in [AudioStream::Alarm, AudioStream::Music, AudioStream::Ring] {
            let result = self
                .audio
                .max_stream_volume(stream)
                .and_then(|max| self.audio.set_stream_volume(stream, max));
            if let Err(e) = result {
                tracing::error!(?stream, "failed to set max volume: {e}");
            }
        }
        prior
    }

    fn start_updates(
        &self,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> (Option<u64>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<LocationSample>();
        let registration = match self.forwarder.location.request_updates(interval, tx) {
            Ok(id) => Some(id),
            Err(e) => {
                self.forwarder
                    .audit
                    .warn(format!("Failed to start emergency location tracking: {e}"));
                None
            }
        };
        let forwarder = self.forwarder.clone();
        let cancel = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    sample = rx.recv() => match sample {
                        Some(sample) => forwarder.forward_detached(sample),
                        None => break,
                    },
                }
            }
        });
        (registration, task)
    }

    fn spawn_ping_loop(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let forwarder = self.forwarder.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => forwarder.ping(),
                }
            }
        })
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<ActiveSession>> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for EmergencyController {
    fn drop(&mut self) {
        self.stop();
    }
}
