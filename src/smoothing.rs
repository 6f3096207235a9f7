//! Temporal smoothing of the output buffer.
//!
//! Decouples the hardware write rate from the upstream update rate and
//! animates transitions between successive target buffers instead of
//! snapping. Each tick moves the emitted buffer a bounded step toward the
//! latest target, reaching it exactly once the settling time has elapsed.
//! An optional frame queue adds a fixed pipeline delay.

use embassy_time::{Duration, Instant};
use heapless::{Deque, Vec};

use crate::color::{BLACK, Rgb, blend_colors};
use crate::math8::progress8;
use crate::muxer::ConfigId;

/// Maximum number of registered smoothing profiles.
pub const MAX_CONFIGS: usize = 8;

/// Maximum extra update delay, in frames.
pub const MAX_DELAY: usize = 8;

const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(1);

/// A named smoothing profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingConfig {
    /// Time after which the emitted buffer equals the target.
    pub settling_time: Duration,
    /// Hardware write rate.
    pub update_frequency_hz: f32,
    /// Fixed pipeline latency in output frames.
    pub update_delay: usize,
}

impl SmoothingConfig {
    pub fn new(settling_time: Duration, update_frequency_hz: f32, update_delay: usize) -> Self {
        Self {
            settling_time,
            update_frequency_hz,
            update_delay,
        }
    }

    /// Tick period derived from the target frequency.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn update_interval(&self) -> Duration {
        if self.update_frequency_hz <= 0.0 {
            return MIN_UPDATE_INTERVAL;
        }
        let millis = libm::roundf(1000.0 / self.update_frequency_hz) as u64;
        Duration::from_millis(millis).max(MIN_UPDATE_INTERVAL)
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), 50.0, 0)
    }
}

/// The smoothing stage.
///
/// Disabled: callers bypass it entirely. Paused: targets are still
/// tracked, nothing is emitted. Active: one interpolated frame per tick.
pub struct Smoothing<const MAX_LEDS: usize> {
    configs: Vec<SmoothingConfig, MAX_CONFIGS>,
    selected: ConfigId,
    /// Profile switch requested for the next tick.
    pending: Option<ConfigId>,
    enabled: bool,
    paused: bool,

    led_count: usize,
    target: [Rgb; MAX_LEDS],
    emitted: [Rgb; MAX_LEDS],
    output: [Rgb; MAX_LEDS],
    has_target: bool,

    previous_time: Instant,
    target_time: Instant,
    next_update: Instant,

    queue: Deque<[Rgb; MAX_LEDS], MAX_DELAY>,
}

impl<const MAX_LEDS: usize> Smoothing<MAX_LEDS> {
    /// Create the stage with the base profile at config id 0.
    pub fn new(base: SmoothingConfig, led_count: usize) -> Self {
        let mut configs = Vec::new();
        let _ = configs.push(base);
        Self {
            configs,
            selected: 0,
            pending: None,
            enabled: true,
            paused: false,
            led_count: led_count.min(MAX_LEDS),
            target: [BLACK; MAX_LEDS],
            emitted: [BLACK; MAX_LEDS],
            output: [BLACK; MAX_LEDS],
            has_target: false,
            previous_time: Instant::from_millis(0),
            target_time: Instant::from_millis(0),
            next_update: Instant::from_millis(0),
            queue: Deque::new(),
        }
    }

    /// Register a profile and return its stable id.
    ///
    /// Returns `None` when the profile table is full.
    pub fn add_config(&mut self, config: SmoothingConfig) -> Option<ConfigId> {
        let id = self.configs.len();
        self.configs.push(config).ok()?;
        Some(id)
    }

    /// Modify a profile in place. Returns false for unknown ids.
    pub fn update_config(&mut self, id: ConfigId, config: SmoothingConfig) -> bool {
        match self.configs.get_mut(id) {
            Some(slot) => {
                *slot = config;
                true
            }
            None => false,
        }
    }

    /// Switch the active profile. Takes effect on the next tick, not
    /// retroactively. Unknown ids fall back to the base profile.
    pub fn select_config(&mut self, id: ConfigId) {
        let id = if id < self.configs.len() { id } else { 0 };
        self.pending = (id != self.selected).then_some(id);
    }

    pub const fn selected_config(&self) -> ConfigId {
        self.selected
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Pause or resume without losing interpolation state.
    pub fn set_pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub const fn paused(&self) -> bool {
        self.paused
    }

    /// Resize for a new LED layout; interpolation state restarts.
    pub fn set_led_count(&mut self, led_count: usize) {
        self.led_count = led_count.min(MAX_LEDS);
        self.target = [BLACK; MAX_LEDS];
        self.emitted = [BLACK; MAX_LEDS];
        self.has_target = false;
        self.queue.clear();
    }

    /// Replace the interpolation target. Non-blocking; the next tick
    /// starts moving toward it.
    pub fn update_target(&mut self, colors: &[Rgb], now: Instant) {
        let n = colors.len().min(MAX_LEDS);
        self.target[..n].copy_from_slice(&colors[..n]);
        self.led_count = n;
        self.target_time = now + self.active_config().settling_time;

        if !self.has_target {
            // First frame: nothing to interpolate from, emit as-is.
            self.emitted[..n].copy_from_slice(&colors[..n]);
            self.previous_time = now;
            self.has_target = true;
        }
    }

    /// Produce the next output frame, if one is due.
    ///
    /// Returns `None` while disabled, paused, between ticks, or while the
    /// delay queue is still filling.
    pub fn tick(&mut self, now: Instant) -> Option<&[Rgb]> {
        if let Some(pending) = self.pending.take() {
            self.selected = pending;
        }
        if !self.enabled || self.paused || !self.has_target {
            return None;
        }
        if now.as_millis() < self.next_update.as_millis() {
            return None;
        }
        self.next_update = now + self.active_config().update_interval();

        self.interpolate(now);

        let delay = self.active_config().update_delay.min(MAX_DELAY - 1);
        if delay == 0 {
            self.output[..self.led_count].copy_from_slice(&self.emitted[..self.led_count]);
            return Some(&self.output[..self.led_count]);
        }

        // Fixed latency: emit the frame queued `delay` ticks ago.
        let _ = self.queue.push_back(self.emitted);
        if self.queue.len() > delay {
            let frame = self.queue.pop_front()?;
            self.output = frame;
            return Some(&self.output[..self.led_count]);
        }
        None
    }

    /// When the next frame is due, if the stage is running.
    pub fn next_deadline(&self) -> Option<Instant> {
        (self.enabled && !self.paused && self.has_target).then_some(self.next_update)
    }

    fn active_config(&self) -> &SmoothingConfig {
        &self.configs[self.selected.min(self.configs.len() - 1)]
    }

    /// Move the emitted buffer toward the target.
    ///
    /// Step fraction is elapsed/remaining settling time; once the
    /// settling deadline has passed the target is copied exactly, so
    /// there is no overshoot and no infinite approach.
    fn interpolate(&mut self, now: Instant) {
        let n = self.led_count;
        if now.as_millis() >= self.target_time.as_millis() {
            self.emitted[..n].copy_from_slice(&self.target[..n]);
        } else {
            let window = self.target_time - self.previous_time;
            let elapsed = Duration::from_millis(now.as_millis() - self.previous_time.as_millis());
            let progress = progress8(elapsed, window);
            for i in 0..n {
                self.emitted[i] = blend_colors(self.emitted[i], self.target[i], progress);
            }
        }
        self.previous_time = now;
    }
}
