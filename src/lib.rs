#![no_std]

pub mod adjustment;
pub mod blackborder;
pub mod color;
pub mod command;
pub mod config;
pub mod geometry;
pub mod image;
pub mod math8;
pub mod muxer;
pub mod pipeline;
pub mod processor;
pub mod smoothing;

pub use adjustment::ColorAdjustment;
pub use command::{CommandChannel, CommandReceiver, CommandSender, InputCommand};
pub use config::{AdjustmentSpec, ColorConfig, DeviceConfig, LedSpec, SmoothingSettings};
pub use geometry::{Led, LedString, build_led_string};
pub use image::{ImageFrame, ImageView};
pub use muxer::{
    ComponentKind, ConfigId, InputInfo, LOWEST_PRIORITY, MuxerError, MuxerEvent, PayloadRef,
    PriorityMuxer,
};
pub use pipeline::{LightPipeline, PipelineConfig, PipelineEvent, TickResult};
pub use processor::{ImageProcessor, MappingType, ProcessError};
pub use smoothing::{Smoothing, SmoothingConfig};

pub use color::{BLACK, ColorOrder, Rgb};
pub use embassy_time::{Duration, Instant};

/// Abstract LED device transport trait
///
/// Implement this trait to support different hardware platforms.
/// The pipeline is generic over this trait and never blocks on it.
pub trait OutputDriver {
    /// Write colors to the LED strip
    fn write(&mut self, colors: &[Rgb]);

    /// Power the device on when a source becomes available
    fn switch_on(&mut self) {}

    /// Power the device off when no source is left
    fn switch_off(&mut self) {}
}
