//! Producer command channel.
//!
//! Grabbers, effect runners and network handlers run in their own
//! execution contexts and must not touch muxer state directly. They queue
//! [`InputCommand`]s through this bounded channel; the pipeline drains it
//! at the start of every tick, so every mutation happens inside the
//! single-writer core. Built on `critical-section`, usable from threads
//! and interrupt handlers alike.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{Deque, Vec};

use crate::color::Rgb;
use crate::image::ImageFrame;
use crate::muxer::{ComponentKind, ConfigId, Name};
use crate::processor::MappingType;

/// One producer request toward the core.
#[derive(Debug, Clone)]
pub enum InputCommand<const MAX_LEDS: usize, const MAX_PIXELS: usize> {
    /// Create or refresh a channel before sending payloads.
    Register {
        priority: u8,
        kind: ComponentKind,
        origin: Name,
        owner: Name,
        smooth_cfg: ConfigId,
    },
    /// Set a color payload. Short color lists are repeated cyclically to
    /// cover the whole strip.
    SetColor {
        priority: u8,
        colors: Vec<Rgb, MAX_LEDS>,
        timeout_ms: i64,
        origin: Name,
    },
    /// Set an image payload on an already-registered channel.
    SetImage {
        priority: u8,
        frame: ImageFrame<MAX_PIXELS>,
        timeout_ms: i64,
    },
    /// Pause a channel without removing it.
    SetInactive { priority: u8 },
    /// Remove one channel.
    Clear { priority: u8 },
    /// Remove all channels; `force` removes the baseline too.
    ClearAll { force: bool },
    /// Toggle automatic source selection.
    SetAutoSelect { enabled: bool },
    /// Pin visibility to one priority.
    SelectPriority { priority: u8 },
    /// Change the user-selected image mapping strategy.
    SetMappingType(MappingType),
}

/// Error returned when trying to send to a full channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrySendError<T>(pub T);

/// A bounded, thread-safe command queue.
///
/// Synchronized with critical sections, so it works in embedded
/// environments without an OS. Multiple senders may share it; one
/// receiver (the pipeline) drains it.
pub struct CommandChannel<const MAX_LEDS: usize, const MAX_PIXELS: usize, const SIZE: usize> {
    inner: Mutex<RefCell<Deque<InputCommand<MAX_LEDS, MAX_PIXELS>, SIZE>>>,
}

impl<const MAX_LEDS: usize, const MAX_PIXELS: usize, const SIZE: usize>
    CommandChannel<MAX_LEDS, MAX_PIXELS, SIZE>
{
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Get a sender handle for producers.
    pub const fn sender(&self) -> CommandSender<'_, MAX_LEDS, MAX_PIXELS, SIZE> {
        CommandSender { channel: self }
    }

    /// Get the receiver handle for the pipeline.
    pub const fn receiver(&self) -> CommandReceiver<'_, MAX_LEDS, MAX_PIXELS, SIZE> {
        CommandReceiver { channel: self }
    }

    fn try_send(
        &self,
        command: InputCommand<MAX_LEDS, MAX_PIXELS>,
    ) -> Result<(), TrySendError<InputCommand<MAX_LEDS, MAX_PIXELS>>> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.push_back(command).map_err(TrySendError)
        })
    }

    fn try_receive(&self) -> Option<InputCommand<MAX_LEDS, MAX_PIXELS>> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.pop_front()
        })
    }
}

impl<const MAX_LEDS: usize, const MAX_PIXELS: usize, const SIZE: usize> Default
    for CommandChannel<MAX_LEDS, MAX_PIXELS, SIZE>
{
    fn default() -> Self {
        Self::new()
    }
}

/// Producer-side handle for a [`CommandChannel`].
#[derive(Clone, Copy)]
pub struct CommandSender<'a, const MAX_LEDS: usize, const MAX_PIXELS: usize, const SIZE: usize> {
    channel: &'a CommandChannel<MAX_LEDS, MAX_PIXELS, SIZE>,
}

impl<const MAX_LEDS: usize, const MAX_PIXELS: usize, const SIZE: usize>
    CommandSender<'_, MAX_LEDS, MAX_PIXELS, SIZE>
{
    /// Queue a command. Returns it back when the channel is full.
    pub fn try_send(
        &self,
        command: InputCommand<MAX_LEDS, MAX_PIXELS>,
    ) -> Result<(), TrySendError<InputCommand<MAX_LEDS, MAX_PIXELS>>> {
        self.channel.try_send(command)
    }
}

/// Pipeline-side handle for a [`CommandChannel`].
#[derive(Clone, Copy)]
pub struct CommandReceiver<'a, const MAX_LEDS: usize, const MAX_PIXELS: usize, const SIZE: usize> {
    channel: &'a CommandChannel<MAX_LEDS, MAX_PIXELS, SIZE>,
}

impl<const MAX_LEDS: usize, const MAX_PIXELS: usize, const SIZE: usize>
    CommandReceiver<'_, MAX_LEDS, MAX_PIXELS, SIZE>
{
    /// Take the oldest pending command, if any.
    pub fn try_receive(&self) -> Option<InputCommand<MAX_LEDS, MAX_PIXELS>> {
        self.channel.try_receive()
    }
}
