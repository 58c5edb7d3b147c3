//! Fixed-rate tick driver.
//!
//! Deadlines sit on an absolute schedule (`origin + n * period`), so a slow
//! tick shortens the following sleep instead of pushing every later tick
//! back. The simulation only ever sees the fixed `dt_ms`.

use log::{error, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Behind-schedule periods tolerated before missed deadlines are dropped.
pub const DEFAULT_MAX_CATCH_UP: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("tick faulted: {0}")]
    TickFault(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInfo {
    /// 1-based count of ticks fired by this scheduler.
    pub tick: u64,
    pub dt_ms: f64,
    /// How far past its deadline this tick woke up.
    pub lateness: Duration,
}

/// Cloneable stop switch. Once `stop` returns, the scheduler invokes no
/// further callbacks.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

pub struct TickScheduler {
    period: Duration,
    dt_ms: f64,
    started: Instant,
    origin: Instant,
    since_origin: u64,
    tick: u64,
    max_catch_up: u32,
    rebases: u64,
    stop_rx: watch::Receiver<bool>,
    handle: SchedulerHandle,
}

impl TickScheduler {
    pub fn new(rate_hz: u32) -> Self {
        let rate = rate_hz.max(1);
        let (stop_tx, stop_rx) = watch::channel(false);
        let now = Instant::now();
        Self {
            period: Duration::from_secs_f64(1.0 / rate as f64),
            dt_ms: 1000.0 / rate as f64,
            started: now,
            origin: now,
            since_origin: 0,
            tick: 0,
            max_catch_up: DEFAULT_MAX_CATCH_UP,
            rebases: 0,
            stop_rx,
            handle: SchedulerHandle {
                stop_tx: Arc::new(stop_tx),
            },
        }
    }

    pub fn with_max_catch_up(mut self, periods: u32) -> Self {
        self.max_catch_up = periods;
        self
    }

    pub fn dt_ms(&self) -> f64 {
        self.dt_ms
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Times the schedule was rebased after falling too far behind.
    pub fn rebases(&self) -> u64 {
        self.rebases
    }

    /// Monotonic time since construction; rebasing does not affect it.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    fn stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    fn deadline(&self, n: u64) -> Instant {
        self.origin + self.period.mul_f64(n as f64)
    }

    /// Waits for the next deadline. Returns `None` once stopped.
    pub async fn next_tick(&mut self) -> Option<TickInfo> {
        if self.stopped() {
            return None;
        }

        let mut deadline = self.deadline(self.since_origin + 1);
        let mut rebased = false;
        let now = Instant::now();
        let limit = self.period.mul_f64(self.max_catch_up as f64);
        if now > deadline + limit {
            let behind = now.duration_since(deadline);
            warn!(
                "Tick scheduler {:.1}ms behind ({:.0} periods), skipping missed ticks",
                behind.as_secs_f64() * 1000.0,
                behind.as_secs_f64() / self.period.as_secs_f64()
            );
            self.origin = now;
            self.since_origin = 0;
            self.rebases += 1;
            rebased = true;
            deadline = now;
        }

        loop {
            tokio::select! {
                _ = sleep_until(deadline) => break,
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || self.stopped() {
                        return None;
                    }
                }
            }
        }
        if self.stopped() {
            return None;
        }

        // A rebased tick fires at the new origin itself.
        if !rebased {
            self.since_origin += 1;
        }
        self.tick += 1;
        Some(TickInfo {
            tick: self.tick,
            dt_ms: self.dt_ms,
            lateness: Instant::now().saturating_duration_since(deadline),
        })
    }

    /// Invokes `callback` once per tick until stopped. A callback error
    /// stops the scheduler and is returned. Returns the number of ticks run.
    pub async fn run<F, E>(&mut self, mut callback: F) -> Result<u64, SchedulerError>
    where
        F: FnMut(TickInfo) -> Result<(), E>,
        E: std::fmt::Display,
    {
        let mut ran = 0;
        while let Some(info) = self.next_tick().await {
            if let Err(e) = callback(info) {
                error!("Tick {} faulted, stopping scheduler: {}", info.tick, e);
                self.handle.stop();
                return Err(SchedulerError::TickFault(e.to_string()));
            }
            ran += 1;
        }
        Ok(ran)
    }
}
