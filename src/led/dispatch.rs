use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::config::{ChannelConfig, ChannelId};
use crate::led::output::LedOutput;
use crate::led::validate::DurationSecs;

/// Brightness in percent, always within `0..=100`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Brightness(u8);

impl Brightness {
    pub const MAX: u8 = 100;

    pub fn new(percent: u8) -> Option<Self> {
        (percent <= Self::MAX).then_some(Self(percent))
    }

    pub fn saturating(percent: u8) -> Self {
        Self(percent.min(Self::MAX))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn duty(self) -> f64 {
        f64::from(self.0) / f64::from(Self::MAX)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionRequest {
    pub channel: ChannelId,
    pub address: u8,
    pub duration: DurationSecs,
    pub brightness: Brightness,
}

impl ActionRequest {
    pub fn new(channel: &ChannelConfig, duration: DurationSecs, brightness: Brightness) -> Self {
        Self {
            channel: channel.id,
            address: channel.address,
            duration,
            brightness,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusRecord {
    pub channel: ChannelId,
    pub address: u8,
    pub duration: DurationSecs,
    pub brightness: Brightness,
    pub finished_at: DateTime<Local>,
}

impl StatusRecord {
    pub fn status_line(&self) -> String {
        format!(
            "LED {}: {} сек, {}%",
            self.address,
            self.duration,
            self.brightness.percent()
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    Completed(StatusRecord),
    Failed(String),
}

pub struct Dispatcher {
    output: Box<dyn LedOutput>,
}

impl Dispatcher {
    pub fn new(output: Box<dyn LedOutput>) -> Self {
        Self { output }
    }

    /// Lights the channel, blocks the calling thread for the requested
    /// duration, switches it off and prints one status line.
    pub fn dispatch(&mut self, request: &ActionRequest) -> DispatchOutcome {
        self.run(request, |duration| {
            thread::sleep(duration);
            true
        })
        .unwrap_or_else(|| DispatchOutcome::Failed("dispatch was cancelled".to_string()))
    }

    /// Same as [`Dispatcher::dispatch`], but the wait ends early once
    /// `shutdown` receives a message or its sender is dropped. A cancelled
    /// dispatch switches the LED off, prints nothing and returns `None`.
    pub fn dispatch_until(
        &mut self,
        request: &ActionRequest,
        shutdown: &Receiver<()>,
    ) -> Option<DispatchOutcome> {
        self.run(request, |duration| {
            matches!(
                shutdown.recv_timeout(duration),
                Err(RecvTimeoutError::Timeout)
            )
        })
    }

    /// `wait` returns false when the wait was interrupted.
    fn run(
        &mut self,
        request: &ActionRequest,
        wait: impl FnOnce(Duration) -> bool,
    ) -> Option<DispatchOutcome> {
        let started = Instant::now();
        if let Err(err) = self
            .output
            .set_level(request.address, request.brightness.duty())
        {
            tracing::error!(channel = %request.channel, "LED write failed: {err:#}");
            return Some(DispatchOutcome::Failed(format!("{err:#}")));
        }

        let completed = wait(request.duration.as_duration());

        if let Err(err) = self.output.set_level(request.address, 0.0) {
            tracing::error!(channel = %request.channel, "LED switch-off failed: {err:#}");
            return Some(DispatchOutcome::Failed(format!("{err:#}")));
        }
        if !completed {
            tracing::info!(
                channel = %request.channel,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "LED action cancelled"
            );
            return None;
        }

        let record = StatusRecord {
            channel: request.channel,
            address: request.address,
            duration: request.duration,
            brightness: request.brightness,
            finished_at: Local::now(),
        };
        println!("{}", record.status_line());
        tracing::info!(
            channel = %record.channel,
            address = record.address,
            duration_s = record.duration.get(),
            brightness = record.brightness.percent(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            finished_at = %record.finished_at.to_rfc3339(),
            "LED action completed"
        );
        Some(DispatchOutcome::Completed(record))
    }
}
