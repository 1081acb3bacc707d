//! Tick scheduling aligned to wall-clock boundaries
//!
//! An interval of one minute, hour or day is shifted so ticks land on the
//! whole minute, hour or day instead of on process start. Any other interval
//! ticks immediately and then every interval.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Boundary the first tick is shifted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Minute,
    Hour,
    Day,
    None,
}

impl Alignment {
    /// Alignment for an interval, comparing it in whole (rounded) seconds
    pub fn for_interval(interval_ms: u64) -> Self {
        let secs = interval_ms.saturating_add(500) / 1000;
        match secs {
            60 => Alignment::Minute,
            3600 => Alignment::Hour,
            86_400 => Alignment::Day,
            _ => Alignment::None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Alignment::Minute => "minute",
            Alignment::Hour => "hour",
            Alignment::Day => "day",
            Alignment::None => "none",
        }
    }

    fn period_ms(&self) -> Option<u64> {
        match self {
            Alignment::Minute => Some(MINUTE_MS),
            Alignment::Hour => Some(HOUR_MS),
            Alignment::Day => Some(DAY_MS),
            Alignment::None => None,
        }
    }
}

/// Delay before the first tick so later ticks fall on round boundaries
///
/// Returns 0 for intervals that are not one minute, hour or day.
pub fn first_delay_ms(interval_ms: u64, epoch_ms: i64) -> u64 {
    match Alignment::for_interval(interval_ms).period_ms() {
        Some(period) => {
            let shift = epoch_ms.rem_euclid(period as i64) as u64;
            interval_ms.saturating_sub(shift)
        }
        None => 0,
    }
}

/// Work performed on every tick
pub trait TickHandler: Send + 'static {
    fn on_tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Computes the first delay and drives ticks
pub struct ScheduleAligner {
    interval: Duration,
    clock: Arc<dyn Clock>,
}

impl ScheduleAligner {
    pub fn new(interval_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms.max(1)),
            clock,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn alignment(&self) -> Alignment {
        Alignment::for_interval(self.interval.as_millis() as u64)
    }

    /// Delay before the first tick, measured from the clock's current time
    pub fn first_delay(&self) -> Duration {
        let interval_ms = self.interval.as_millis() as u64;
        Duration::from_millis(first_delay_ms(interval_ms, self.clock.epoch_millis()))
    }

    fn log_alignment(&self, first_delay: Duration) {
        match self.alignment() {
            Alignment::None => {
                info!("No 'update_interval' found that is either 1 minute, 1 hour or 1 day long");
            }
            alignment => {
                let delay = first_delay.as_secs();
                let shift = self.interval.as_secs().saturating_sub(delay);
                info!(
                    "Found an 'update_interval' that is exactly 1 {}; first interval will last {}s (shift {}s)",
                    alignment.name(),
                    delay,
                    shift
                );
            }
        }
    }

    /// Start ticking on the current tokio runtime
    ///
    /// Ticks run one at a time; a tick that overruns delays the next one.
    pub fn spawn<H: TickHandler>(self, mut handler: H) -> ScheduleHandle {
        let first_delay = self.first_delay();
        self.log_alignment(first_delay);
        let start = Instant::now() + first_delay;
        let period = self.interval;
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("Schedule tick");
                        handler.on_tick().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Schedule stopped");
                        break;
                    }
                }
            }
        });

        ScheduleHandle {
            first_delay,
            shutdown_tx,
            task,
        }
    }
}

/// Running schedule
pub struct ScheduleHandle {
    first_delay: Duration,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    pub fn first_delay(&self) -> Duration {
        self.first_delay
    }

    /// Stop ticking and wait for the loop to exit
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}
