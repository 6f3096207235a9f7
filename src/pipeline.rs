//! The composition root driving the per-frame update cycle.
//!
//! Owns the muxer, image processor, color adjustment and smoothing stages
//! by value, drains producer commands, reacts to settings changes and
//! hands finished buffers to the output driver. One pipeline coordinates
//! one physical LED installation; instances share nothing.

use embassy_time::{Duration, Instant};
use heapless::{Deque, Vec};

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::OutputDriver;
use crate::adjustment::ColorAdjustment;
use crate::color::{BLACK, Rgb};
use crate::command::{CommandReceiver, InputCommand};
use crate::config::{ColorConfig, DeviceConfig, LedSpec, SmoothingSettings};
use crate::geometry::{LedString, build_led_string};
use crate::image::ImageView;
use crate::muxer::{
    ComponentKind, ConfigId, LOWEST_PRIORITY, MuxerError, MuxerEvent, PayloadRef, PriorityMuxer,
};
use crate::processor::{ImageProcessor, MappingType};
use crate::smoothing::{Smoothing, SmoothingConfig};

/// How often passive timeout expiry is checked at minimum.
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(100);

const EVENT_QUEUE: usize = 8;

/// Notifications for external collaborators tapping the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    /// An image arrived for an unknown priority; the producer must
    /// register before its frames are accepted.
    RegistrationRequired(u8),
    /// The LED layout is about to be rebuilt; effect runners should
    /// snapshot their state now.
    LayoutChanging,
    /// The LED layout was rebuilt; snapshotted effects can restart.
    LayoutChanged,
    /// Device configuration changed; the transport should reinitialize.
    DeviceChanged,
    /// At least one LED has no color calibration; output continues with
    /// defaults.
    CalibrationIncomplete,
    /// The user-selected image mapping strategy changed.
    MappingChanged(MappingType),
}

/// Everything the pipeline needs at construction, already parsed.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig<'a> {
    pub leds: &'a [LedSpec],
    pub device: DeviceConfig,
    pub color: ColorConfig<'a>,
    pub smoothing: SmoothingSettings,
}

/// Result of a pipeline tick, for the platform loop's pacing.
#[derive(Debug, Clone, Copy)]
pub struct TickResult {
    /// When `tick` wants to run again at the latest.
    pub next_deadline: Instant,
    /// How long to wait until then (zero if behind schedule).
    pub sleep_duration: Duration,
}

/// The orchestrator.
pub struct LightPipeline<
    'a,
    O: OutputDriver,
    const MAX_LEDS: usize,
    const MAX_PIXELS: usize,
    const MAX_INPUTS: usize,
    const COMMANDS: usize,
> {
    commands: CommandReceiver<'a, MAX_LEDS, MAX_PIXELS, COMMANDS>,

    muxer: PriorityMuxer<MAX_LEDS, MAX_PIXELS, MAX_INPUTS>,
    processor: ImageProcessor<MAX_LEDS>,
    adjustment: ColorAdjustment<MAX_LEDS>,
    smoothing: Smoothing<MAX_LEDS>,

    led_specs: Vec<LedSpec, MAX_LEDS>,
    leds: LedString<MAX_LEDS>,
    device: DeviceConfig,

    driver: O,
    output_enabled: bool,

    buffer: [Rgb; MAX_LEDS],
    raw_tap: [Rgb; MAX_LEDS],
    raw_fresh: bool,
    out_tap: [Rgb; MAX_LEDS],
    out_fresh: bool,

    events: Deque<PipelineEvent, EVENT_QUEUE>,
}

impl<
    'a,
    O: OutputDriver,
    const MAX_LEDS: usize,
    const MAX_PIXELS: usize,
    const MAX_INPUTS: usize,
    const COMMANDS: usize,
> LightPipeline<'a, O, MAX_LEDS, MAX_PIXELS, MAX_INPUTS, COMMANDS>
{
    pub fn new(
        commands: CommandReceiver<'a, MAX_LEDS, MAX_PIXELS, COMMANDS>,
        config: &PipelineConfig<'_>,
        driver: O,
    ) -> Self {
        let leds = build_led_string::<MAX_LEDS>(config.leds, config.device.color_order);
        let led_count = leds.len();

        let mut led_specs = Vec::new();
        for spec in config.leds.iter().take(MAX_LEDS) {
            let _ = led_specs.push(*spec);
        }

        let adjustment = ColorAdjustment::new(config.color.adjustments, led_count);

        let mut smoothing = Smoothing::new(config.smoothing.config, led_count);
        smoothing.set_enabled(config.smoothing.enabled);
        // Start paused; the first visible source resumes output.
        smoothing.set_pause(true);

        let mut pipeline = Self {
            commands,
            muxer: PriorityMuxer::new(led_count),
            processor: ImageProcessor::new(&leds),
            adjustment,
            smoothing,
            led_specs,
            leds,
            device: config.device,
            driver,
            output_enabled: true,
            buffer: [BLACK; MAX_LEDS],
            raw_tap: [BLACK; MAX_LEDS],
            raw_fresh: false,
            out_tap: [BLACK; MAX_LEDS],
            out_fresh: false,
            events: Deque::new(),
        };
        pipeline.warn_if_uncalibrated();
        pipeline
    }

    pub fn led_count(&self) -> usize {
        self.leds.len()
    }

    /// Physical LED count; logical LEDs beyond it are padded black.
    pub fn hardware_led_count(&self) -> usize {
        self.device
            .hardware_led_count
            .unwrap_or(self.leds.len())
            .min(MAX_LEDS)
    }

    pub const fn current_priority(&self) -> u8 {
        self.muxer.current_priority()
    }

    pub const fn muxer(&self) -> &PriorityMuxer<MAX_LEDS, MAX_PIXELS, MAX_INPUTS> {
        &self.muxer
    }

    pub const fn smoothing(&self) -> &Smoothing<MAX_LEDS> {
        &self.smoothing
    }

    pub const fn adjustment(&self) -> &ColorAdjustment<MAX_LEDS> {
        &self.adjustment
    }

    pub const fn driver(&self) -> &O {
        &self.driver
    }

    pub const fn driver_mut(&mut self) -> &mut O {
        &mut self.driver
    }

    // --- producer API -----------------------------------------------------

    pub fn register_input(
        &mut self,
        priority: u8,
        kind: ComponentKind,
        origin: &str,
        owner: &str,
        smooth_cfg: ConfigId,
    ) -> Result<(), MuxerError> {
        self.muxer
            .register_input(priority, kind, origin, owner, smooth_cfg)
    }

    /// Store a full-length color payload on a registered channel.
    pub fn set_input(
        &mut self,
        priority: u8,
        colors: &[Rgb],
        timeout_ms: i64,
        now: Instant,
    ) -> Result<(), MuxerError> {
        self.muxer.set_colors(priority, colors, timeout_ms, now)?;
        self.update_if_visible(priority, now);
        Ok(())
    }

    /// Register-and-set convenience for literal colors.
    ///
    /// Short color lists are repeated cyclically to cover the strip. A
    /// channel previously owned by a different component kind is cleared
    /// first so stale payloads cannot leak through.
    pub fn set_color(
        &mut self,
        priority: u8,
        colors: &[Rgb],
        timeout_ms: i64,
        origin: &str,
        now: Instant,
    ) -> Result<(), MuxerError> {
        if colors.is_empty() {
            return Err(MuxerError::GeometryMismatch);
        }

        let mut full: Vec<Rgb, MAX_LEDS> = Vec::new();
        while full.len() < self.muxer.led_count() {
            for color in colors {
                if full.len() == self.muxer.led_count() {
                    break;
                }
                let _ = full.push(*color);
            }
        }

        if self.muxer.has_priority(priority)
            && self.muxer.input_info(priority).kind != ComponentKind::Color
        {
            self.muxer.clear(priority, now);
        }
        self.muxer
            .register_input(priority, ComponentKind::Color, origin, "system", 0)?;
        self.set_input(priority, &full, timeout_ms, now)
    }

    /// Store an image payload on a registered channel.
    ///
    /// Unknown priorities are rejected and a [`PipelineEvent::RegistrationRequired`]
    /// is queued so the external-API gate can ask the producer to register.
    pub fn set_input_image(
        &mut self,
        priority: u8,
        image: &ImageView<'_>,
        timeout_ms: i64,
        now: Instant,
    ) -> Result<(), MuxerError> {
        match self.muxer.set_image(priority, image, timeout_ms, now) {
            Ok(()) => {
                self.update_if_visible(priority, now);
                Ok(())
            }
            Err(MuxerError::NotRegistered) => {
                self.push_event(PipelineEvent::RegistrationRequired(priority));
                Err(MuxerError::NotRegistered)
            }
            Err(err) => Err(err),
        }
    }

    pub fn set_input_inactive(&mut self, priority: u8, now: Instant) -> bool {
        self.muxer.set_input_inactive(priority, now)
    }

    pub fn clear(&mut self, priority: u8, now: Instant) -> bool {
        self.muxer.clear(priority, now)
    }

    pub fn clear_all(&mut self, force: bool, now: Instant) {
        self.muxer.clear_all(force, now);
    }

    pub fn set_auto_select(&mut self, enabled: bool, now: Instant) {
        self.muxer.set_auto_select(enabled, now);
    }

    pub fn select_priority(&mut self, priority: u8, now: Instant) -> bool {
        self.muxer.select_priority(priority, now)
    }

    pub fn set_led_mapping_type(&mut self, mapping: MappingType) {
        if mapping != self.processor.user_mapping_type() {
            self.processor.set_mapping_type(mapping);
            self.push_event(PipelineEvent::MappingChanged(mapping));
        }
    }

    // --- smoothing profile management -------------------------------------

    pub fn add_smoothing_config(&mut self, config: SmoothingConfig) -> Option<ConfigId> {
        self.smoothing.add_config(config)
    }

    pub fn update_smoothing_config(&mut self, id: ConfigId, config: SmoothingConfig) -> bool {
        self.smoothing.update_config(id, config)
    }

    // --- settings handlers ------------------------------------------------

    /// New color calibration; the adjustment table is rebuilt atomically.
    pub fn handle_color_config(&mut self, color: &ColorConfig<'_>, now: Instant) {
        self.adjustment.rebuild(color.adjustments, self.leds.len());
        self.warn_if_uncalibrated();
        self.update(now);
    }

    /// New LED layout.
    ///
    /// Effects depend heavily on the layout, so collaborators get a
    /// [`PipelineEvent::LayoutChanging`] to snapshot running effects and a
    /// [`PipelineEvent::LayoutChanged`] to restart them. The color config
    /// is taken again because the calibration table is per-LED.
    pub fn handle_led_layout(&mut self, leds: &[LedSpec], color: &ColorConfig<'_>, now: Instant) {
        self.push_event(PipelineEvent::LayoutChanging);

        self.led_specs.clear();
        for spec in leds.iter().take(MAX_LEDS) {
            let _ = self.led_specs.push(*spec);
        }
        self.rebuild_geometry();

        self.adjustment.rebuild(color.adjustments, self.leds.len());
        self.warn_if_uncalibrated();

        self.buffer = [BLACK; MAX_LEDS];
        self.smoothing.set_led_count(self.write_len());

        self.push_event(PipelineEvent::LayoutChanged);
        self.update(now);
    }

    /// New device configuration: byte order and hardware LED count.
    ///
    /// The transport collaborator reinitializes on the queued
    /// [`PipelineEvent::DeviceChanged`].
    pub fn handle_device_config(&mut self, device: DeviceConfig, now: Instant) {
        let order_changed = device.color_order != self.device.color_order;
        self.device = device;
        if order_changed {
            self.rebuild_geometry();
        }
        self.smoothing.set_led_count(self.write_len());
        self.push_event(PipelineEvent::DeviceChanged);
        self.update(now);
    }

    /// New base smoothing profile and enablement.
    pub fn handle_smoothing_settings(&mut self, settings: &SmoothingSettings, now: Instant) {
        self.smoothing.update_config(0, settings.config);
        self.smoothing.set_enabled(settings.enabled);
        self.update(now);
    }

    /// Model the device transport being unavailable or switched off.
    pub fn set_output_enabled(&mut self, enabled: bool, now: Instant) {
        self.output_enabled = enabled;
        if enabled {
            self.driver.switch_on();
            self.update(now);
        } else {
            self.driver.switch_off();
        }
    }

    pub const fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    // --- observation ------------------------------------------------------

    /// Pre-adjustment colors of the last `update`, at most once.
    pub fn take_raw_colors(&mut self) -> Option<&[Rgb]> {
        if !self.raw_fresh {
            return None;
        }
        self.raw_fresh = false;
        Some(&self.raw_tap[..self.leds.len()])
    }

    /// Final device colors of the last `update`, at most once.
    pub fn take_output_colors(&mut self) -> Option<&[Rgb]> {
        if !self.out_fresh {
            return None;
        }
        self.out_fresh = false;
        Some(&self.out_tap[..self.write_len()])
    }

    /// Next queued collaborator notification, oldest first.
    pub fn poll_event(&mut self) -> Option<PipelineEvent> {
        self.events.pop_front()
    }

    // --- frame cycle ------------------------------------------------------

    /// Run one pipeline step: drain producer commands, sweep timeouts,
    /// react to visibility changes and pump smoothing toward the driver.
    pub fn tick(&mut self, now: Instant) -> TickResult {
        let mut need_update = self.process_commands(now);
        self.muxer.sweep(now);

        while let Some(event) = self.muxer.poll_event() {
            match event {
                MuxerEvent::VisiblePriorityChanged(priority) => {
                    self.handle_source_availability(priority);
                    need_update = true;
                }
                MuxerEvent::VisibleComponentChanged(kind) => {
                    self.handle_visible_component(kind);
                    need_update = true;
                }
            }
        }

        if need_update {
            self.update(now);
        }

        if self.output_enabled && self.smoothing.enabled() {
            if let Some(frame) = self.smoothing.tick(now) {
                self.driver.write(frame);
            }
        }

        let sweep_deadline = now + SWEEP_INTERVAL;
        let next_deadline = match self.smoothing.next_deadline() {
            Some(deadline) if deadline.as_millis() < sweep_deadline.as_millis() => deadline,
            _ => sweep_deadline,
        };
        let sleep_duration = if next_deadline.as_millis() > now.as_millis() {
            Duration::from_millis(next_deadline.as_millis() - now.as_millis())
        } else {
            Duration::from_millis(0)
        };
        TickResult {
            next_deadline,
            sleep_duration,
        }
    }

    /// One update pass: visible channel in, device buffer out.
    pub fn update(&mut self, now: Instant) {
        let led_count = self.leds.len();
        let priority = self.muxer.current_priority();
        let info = self.muxer.input_info(priority);
        let smooth_cfg = info.smooth_cfg;

        match info.payload {
            PayloadRef::Image(image) => {
                if self
                    .processor
                    .process(&image, &mut self.buffer[..led_count])
                    .is_err()
                {
                    // Shape mismatch: drop the frame, keep the previous buffer.
                    return;
                }
            }
            PayloadRef::Colors(colors) => {
                // A payload can predate a layout change; never over-read it.
                let n = colors.len().min(led_count);
                self.buffer[..n].copy_from_slice(&colors[..n]);
                self.buffer[n..led_count].fill(BLACK);
            }
            PayloadRef::None => {
                self.buffer[..led_count].fill(BLACK);
            }
        }

        self.raw_tap[..led_count].copy_from_slice(&self.buffer[..led_count]);
        self.raw_fresh = true;

        self.adjustment.apply(&mut self.buffer[..led_count]);

        for (color, led) in self.buffer[..led_count].iter_mut().zip(self.leds.iter()) {
            led.order.apply(color);
        }

        let write_len = self.write_len();
        self.buffer[led_count..write_len].fill(BLACK);

        self.out_tap[..write_len].copy_from_slice(&self.buffer[..write_len]);
        self.out_fresh = true;

        if !self.output_enabled {
            return;
        }
        if self.smoothing.enabled() {
            self.smoothing.select_config(smooth_cfg);
            // Feed targets even while paused so resuming stays smooth.
            self.smoothing
                .update_target(&self.buffer[..write_len], now);
        } else {
            self.driver.write(&self.buffer[..write_len]);
        }
    }

    // --- internals --------------------------------------------------------

    fn write_len(&self) -> usize {
        self.hardware_led_count().max(self.leds.len()).min(MAX_LEDS)
    }

    fn rebuild_geometry(&mut self) {
        self.leds = build_led_string::<MAX_LEDS>(&self.led_specs, self.device.color_order);
        self.processor.set_led_string(&self.leds);
        self.muxer.set_led_count(self.leds.len());
    }

    fn warn_if_uncalibrated(&mut self) {
        if !self.adjustment.verify() {
            #[cfg(feature = "esp32-log")]
            println!("lightmux: at least one LED has no color calibration");
            self.push_event(PipelineEvent::CalibrationIncomplete);
        }
    }

    fn update_if_visible(&mut self, priority: u8, now: Instant) {
        if priority == self.muxer.current_priority() {
            self.update(now);
        }
    }

    /// Power management on visibility changes: the sentinel means no
    /// source is left and the hardware goes dark until one returns.
    fn handle_source_availability(&mut self, priority: u8) {
        if priority == LOWEST_PRIORITY {
            #[cfg(feature = "esp32-log")]
            println!("lightmux: no source left, switching output off");
            self.driver.switch_off();
            self.smoothing.set_pause(true);
        } else if self.muxer.previous_priority() == LOWEST_PRIORITY {
            #[cfg(feature = "esp32-log")]
            println!("lightmux: source available, switching output on");
            self.driver.switch_on();
            self.smoothing.set_pause(false);
        }
    }

    /// Per-component policy: effects bypass border detection and get a
    /// fixed mapping; literal colors and effects skip the backlight floor.
    fn handle_visible_component(&mut self, kind: ComponentKind) {
        let is_effect = kind == ComponentKind::Effect;
        self.processor.set_blackborder_detect_disabled(is_effect);
        self.processor
            .set_hard_mapping_type(is_effect.then_some(MappingType::MulticolorMean));
        self.adjustment
            .set_backlight_enabled(!matches!(kind, ComponentKind::Color | ComponentKind::Effect));
    }

    /// Drain the producer command channel. Returns whether the visible
    /// channel's data changed.
    fn process_commands(&mut self, now: Instant) -> bool {
        let mut need_update = false;
        while let Some(command) = self.commands.try_receive() {
            match command {
                InputCommand::Register {
                    priority,
                    kind,
                    origin,
                    owner,
                    smooth_cfg,
                } => {
                    let _ = self.muxer.register_input(
                        priority,
                        kind,
                        origin.as_str(),
                        owner.as_str(),
                        smooth_cfg,
                    );
                }
                InputCommand::SetColor {
                    priority,
                    colors,
                    timeout_ms,
                    origin,
                } => {
                    if self
                        .set_color(priority, &colors, timeout_ms, origin.as_str(), now)
                        .is_ok()
                    {
                        need_update |= priority == self.muxer.current_priority();
                    }
                }
                InputCommand::SetImage {
                    priority,
                    frame,
                    timeout_ms,
                } => {
                    let Some(view) = frame.as_view() else {
                        continue;
                    };
                    if self.set_input_image(priority, &view, timeout_ms, now).is_ok() {
                        need_update |= priority == self.muxer.current_priority();
                    }
                }
                InputCommand::SetInactive { priority } => {
                    self.muxer.set_input_inactive(priority, now);
                }
                InputCommand::Clear { priority } => {
                    self.muxer.clear(priority, now);
                }
                InputCommand::ClearAll { force } => {
                    self.muxer.clear_all(force, now);
                }
                InputCommand::SetAutoSelect { enabled } => {
                    self.muxer.set_auto_select(enabled, now);
                }
                InputCommand::SelectPriority { priority } => {
                    self.muxer.select_priority(priority, now);
                }
                InputCommand::SetMappingType(mapping) => {
                    self.set_led_mapping_type(mapping);
                }
            }
        }
        need_update
    }

    fn push_event(&mut self, event: PipelineEvent) {
        if self.events.push_back(event).is_err() {
            self.events.pop_front();
            let _ = self.events.push_back(event);
        }
    }
}
