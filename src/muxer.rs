//! Priority-based input arbitration.
//!
//! Producers (grabbers, effects, network handlers) register prioritized
//! channels and feed them color or image payloads with an optional timeout.
//! The muxer keeps the channels sorted by priority and caches the currently
//! visible one: the lowest-valued priority among channels that hold a
//! payload and have not expired. Changes to the visible priority or its
//! component kind are queued as events for the pipeline to consume.

use embassy_time::Instant;
use heapless::{Deque, String, Vec};

use crate::color::Rgb;
use crate::image::{ImageFrame, ImageView};

/// Reserved priority meaning "no active source". Lowest possible precedence.
pub const LOWEST_PRIORITY: u8 = 255;

/// Maximum length of origin/owner provenance strings.
pub const NAME_LEN: usize = 32;

/// Provenance string attached to a channel for diagnostics.
pub type Name = String<NAME_LEN>;

/// Build a provenance string, truncating oversized input.
pub fn name_from(s: &str) -> Name {
    let mut name = Name::new();
    for c in s.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}

/// Identifies a smoothing configuration profile.
pub type ConfigId = usize;

/// Producer category of a channel, used for policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Literal color set by a user or API call.
    Color,
    /// Procedural effect output.
    Effect,
    /// Screen capture frames.
    Grabber,
    /// Video capture frames.
    Video,
    /// External network client.
    Network,
    /// Always-on baseline, survives a non-forced clear-all.
    Background,
}

/// Errors returned to producers. Never fatal to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxerError {
    /// Payload update for a priority that was never registered.
    NotRegistered,
    /// Timeout value below -1.
    InvalidTimeout,
    /// Payload length or image shape does not fit the configuration.
    GeometryMismatch,
    /// The sentinel priority cannot be registered.
    Reserved,
    /// The bounded channel table is full.
    CapacityExceeded,
}

/// Notifications produced by visibility recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxerEvent {
    /// A different channel became visible (or the sentinel, if none left).
    VisiblePriorityChanged(u8),
    /// The visible channel's component kind differs from before.
    VisibleComponentChanged(ComponentKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    /// Persistent until explicitly cleared.
    Never,
    /// Expires at the given instant; the sweep removes it afterwards.
    At(Instant),
    /// Marked inactive by hand; kept but never visible.
    Inactive,
}

impl Deadline {
    fn is_expired(self, now: Instant) -> bool {
        match self {
            Self::Never => false,
            Self::At(t) => now.as_millis() >= t.as_millis(),
            Self::Inactive => true,
        }
    }
}

#[derive(Debug, Clone)]
enum Payload<const MAX_LEDS: usize, const MAX_PIXELS: usize> {
    /// Registered but no data yet; does not contribute to visibility.
    None,
    Colors(Vec<Rgb, MAX_LEDS>),
    Image(ImageFrame<MAX_PIXELS>),
}

#[derive(Debug, Clone)]
struct InputChannel<const MAX_LEDS: usize, const MAX_PIXELS: usize> {
    priority: u8,
    kind: ComponentKind,
    origin: Name,
    owner: Name,
    smooth_cfg: ConfigId,
    payload: Payload<MAX_LEDS, MAX_PIXELS>,
    deadline: Deadline,
}

impl<const MAX_LEDS: usize, const MAX_PIXELS: usize> InputChannel<MAX_LEDS, MAX_PIXELS> {
    fn is_visible_candidate(&self, now: Instant) -> bool {
        !matches!(self.payload, Payload::None) && !self.deadline.is_expired(now)
    }
}

/// Borrowed snapshot of a channel's payload.
#[derive(Debug, Clone, Copy)]
pub enum PayloadRef<'a> {
    None,
    Colors(&'a [Rgb]),
    Image(ImageView<'a>),
}

/// Borrowed snapshot of a channel, or the sentinel for unknown priorities.
#[derive(Debug, Clone, Copy)]
pub struct InputInfo<'a> {
    pub priority: u8,
    pub kind: ComponentKind,
    pub origin: &'a str,
    pub owner: &'a str,
    pub smooth_cfg: ConfigId,
    pub payload: PayloadRef<'a>,
}

impl InputInfo<'_> {
    /// The "no active source" snapshot.
    pub const fn sentinel() -> Self {
        InputInfo {
            priority: LOWEST_PRIORITY,
            kind: ComponentKind::Color,
            origin: "system",
            owner: "system",
            smooth_cfg: 0,
            payload: PayloadRef::None,
        }
    }
}

const EVENT_QUEUE: usize = 4;

/// The channel table plus the cached visible priority.
///
/// Single-writer: all mutations go through `&mut self` and recompute
/// visibility before returning, so readers never observe a stale winner.
pub struct PriorityMuxer<const MAX_LEDS: usize, const MAX_PIXELS: usize, const MAX_INPUTS: usize> {
    /// Sorted by ascending priority.
    inputs: Vec<InputChannel<MAX_LEDS, MAX_PIXELS>, MAX_INPUTS>,
    led_count: usize,
    current_priority: u8,
    previous_priority: u8,
    current_kind: ComponentKind,
    auto_select: bool,
    events: Deque<MuxerEvent, EVENT_QUEUE>,
}

impl<const MAX_LEDS: usize, const MAX_PIXELS: usize, const MAX_INPUTS: usize>
    PriorityMuxer<MAX_LEDS, MAX_PIXELS, MAX_INPUTS>
{
    pub fn new(led_count: usize) -> Self {
        Self {
            inputs: Vec::new(),
            led_count: led_count.min(MAX_LEDS),
            current_priority: LOWEST_PRIORITY,
            previous_priority: LOWEST_PRIORITY,
            current_kind: ComponentKind::Color,
            auto_select: true,
            events: Deque::new(),
        }
    }

    /// Update the expected payload length after a layout change.
    pub fn set_led_count(&mut self, led_count: usize) {
        self.led_count = led_count.min(MAX_LEDS);
    }

    pub const fn led_count(&self) -> usize {
        self.led_count
    }

    /// Create a channel, or refresh the metadata of an existing one.
    ///
    /// New channels start without payload and without deadline; they do
    /// not contribute to visibility until the first payload arrives.
    pub fn register_input(
        &mut self,
        priority: u8,
        kind: ComponentKind,
        origin: &str,
        owner: &str,
        smooth_cfg: ConfigId,
    ) -> Result<(), MuxerError> {
        if priority == LOWEST_PRIORITY {
            return Err(MuxerError::Reserved);
        }
        match self.position_of(priority) {
            Ok(idx) => {
                let input = &mut self.inputs[idx];
                input.kind = kind;
                input.origin = name_from(origin);
                input.owner = name_from(owner);
                input.smooth_cfg = smooth_cfg;
                Ok(())
            }
            Err(idx) => {
                let channel = InputChannel {
                    priority,
                    kind,
                    origin: name_from(origin),
                    owner: name_from(owner),
                    smooth_cfg,
                    payload: Payload::None,
                    deadline: Deadline::Never,
                };
                self.inputs
                    .insert(idx, channel)
                    .map_err(|_| MuxerError::CapacityExceeded)
            }
        }
    }

    /// Store a color payload on a registered channel.
    pub fn set_colors(
        &mut self,
        priority: u8,
        colors: &[Rgb],
        timeout_ms: i64,
        now: Instant,
    ) -> Result<(), MuxerError> {
        let deadline = Self::deadline_from(timeout_ms, now)?;
        if colors.len() != self.led_count {
            return Err(MuxerError::GeometryMismatch);
        }
        let idx = self
            .position_of(priority)
            .map_err(|_| MuxerError::NotRegistered)?;
        let payload = Vec::from_slice(colors).map_err(|()| MuxerError::GeometryMismatch)?;
        self.inputs[idx].payload = Payload::Colors(payload);
        self.inputs[idx].deadline = deadline;
        self.recompute(now);
        Ok(())
    }

    /// Store an image payload on a registered channel.
    ///
    /// Producers not yet known to the muxer are rejected with
    /// `NotRegistered` and must request registration first.
    pub fn set_image(
        &mut self,
        priority: u8,
        image: &ImageView<'_>,
        timeout_ms: i64,
        now: Instant,
    ) -> Result<(), MuxerError> {
        let deadline = Self::deadline_from(timeout_ms, now)?;
        let idx = self
            .position_of(priority)
            .map_err(|_| MuxerError::NotRegistered)?;
        let frame = ImageFrame::from_view(image).ok_or(MuxerError::GeometryMismatch)?;
        self.inputs[idx].payload = Payload::Image(frame);
        self.inputs[idx].deadline = deadline;
        self.recompute(now);
        Ok(())
    }

    /// Mark a channel non-contributing without removing it.
    ///
    /// Used when a producer pauses but may resume; the next payload
    /// reactivates the channel.
    pub fn set_input_inactive(&mut self, priority: u8, now: Instant) -> bool {
        let Ok(idx) = self.position_of(priority) else {
            return false;
        };
        self.inputs[idx].deadline = Deadline::Inactive;
        self.recompute(now);
        true
    }

    /// Remove one channel. No-op on unknown priorities.
    pub fn clear(&mut self, priority: u8, now: Instant) -> bool {
        let Ok(idx) = self.position_of(priority) else {
            return false;
        };
        self.inputs.remove(idx);
        self.recompute(now);
        true
    }

    /// Remove all channels. Without `force`, baseline channels survive.
    pub fn clear_all(&mut self, force: bool, now: Instant) {
        if force {
            self.inputs.clear();
        } else {
            self.inputs
                .retain(|input| input.kind == ComponentKind::Background);
        }
        self.recompute(now);
    }

    /// Enable or disable automatic source selection.
    ///
    /// While disabled, the visible priority stays pinned to its current
    /// value even if a higher-precedence channel shows up.
    pub fn set_auto_select(&mut self, enabled: bool, now: Instant) {
        self.auto_select = enabled;
        self.recompute(now);
    }

    pub const fn auto_select_enabled(&self) -> bool {
        self.auto_select
    }

    /// Pin visibility to one channel, disabling auto-select.
    ///
    /// Fails when the priority is unknown.
    pub fn select_priority(&mut self, priority: u8, now: Instant) -> bool {
        if self.position_of(priority).is_err() {
            return false;
        }
        self.auto_select = false;
        self.apply_current(priority);
        self.recompute(now);
        true
    }

    /// Drop channels whose deadline has passed and recompute visibility.
    ///
    /// Runs periodically so passive expiry is caught even with no new
    /// producer events. Manually inactivated channels are kept.
    pub fn sweep(&mut self, now: Instant) {
        self.inputs
            .retain(|input| !matches!(input.deadline, Deadline::At(t) if now.as_millis() >= t.as_millis()));
        self.recompute(now);
    }

    pub const fn current_priority(&self) -> u8 {
        self.current_priority
    }

    pub const fn previous_priority(&self) -> u8 {
        self.previous_priority
    }

    pub fn has_priority(&self, priority: u8) -> bool {
        self.position_of(priority).is_ok()
    }

    /// Priorities of all registered channels, ascending.
    pub fn active_priorities(&self) -> impl Iterator<Item = u8> + '_ {
        self.inputs.iter().map(|input| input.priority)
    }

    /// Snapshot of one channel, or the sentinel for unknown priorities.
    pub fn input_info(&self, priority: u8) -> InputInfo<'_> {
        let Ok(idx) = self.position_of(priority) else {
            return InputInfo::sentinel();
        };
        let input = &self.inputs[idx];
        InputInfo {
            priority: input.priority,
            kind: input.kind,
            origin: input.origin.as_str(),
            owner: input.owner.as_str(),
            smooth_cfg: input.smooth_cfg,
            payload: match &input.payload {
                Payload::None => PayloadRef::None,
                Payload::Colors(colors) => PayloadRef::Colors(colors),
                Payload::Image(frame) => match frame.as_view() {
                    Some(view) => PayloadRef::Image(view),
                    None => PayloadRef::None,
                },
            },
        }
    }

    /// Next queued visibility notification, oldest first.
    pub fn poll_event(&mut self) -> Option<MuxerEvent> {
        self.events.pop_front()
    }

    fn position_of(&self, priority: u8) -> Result<usize, usize> {
        self.inputs
            .binary_search_by_key(&priority, |input| input.priority)
    }

    fn deadline_from(timeout_ms: i64, now: Instant) -> Result<Deadline, MuxerError> {
        match timeout_ms {
            t if t < -1 => Err(MuxerError::InvalidTimeout),
            -1 => Ok(Deadline::Never),
            t => Ok(Deadline::At(
                now + embassy_time::Duration::from_millis(t as u64),
            )),
        }
    }

    fn visible_candidate(&self, now: Instant) -> u8 {
        self.inputs
            .iter()
            .find(|input| input.is_visible_candidate(now))
            .map_or(LOWEST_PRIORITY, |input| input.priority)
    }

    /// Recompute the visible priority and queue change notifications.
    fn recompute(&mut self, now: Instant) {
        let new_priority = if self.auto_select {
            self.visible_candidate(now)
        } else {
            // Pinned. Fall through (and resume auto-select) once the
            // pinned channel is gone or stopped contributing.
            let pinned_alive = self
                .position_of(self.current_priority)
                .is_ok_and(|idx| self.inputs[idx].is_visible_candidate(now));
            if pinned_alive {
                self.current_priority
            } else {
                self.auto_select = true;
                self.visible_candidate(now)
            }
        };
        self.apply_current(new_priority);
    }

    fn apply_current(&mut self, new_priority: u8) {
        if new_priority != self.current_priority {
            self.previous_priority = self.current_priority;
            self.current_priority = new_priority;
            self.push_event(MuxerEvent::VisiblePriorityChanged(new_priority));
        }
        let new_kind = self.input_info(self.current_priority).kind;
        if new_kind != self.current_kind {
            self.current_kind = new_kind;
            self.push_event(MuxerEvent::VisibleComponentChanged(new_kind));
        }
    }

    fn push_event(&mut self, event: MuxerEvent) {
        if self.events.push_back(event).is_err() {
            // Queue full: drop the oldest, the newest state matters most.
            self.events.pop_front();
            let _ = self.events.push_back(event);
        }
    }
}
