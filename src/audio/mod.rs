//! Audio module - capture, chunk storage, averaging and export
//!
//! This module provides:
//! - The append-only chunk store
//! - Background averaging of chunks for the waveform
//! - AIFF encoding
//! - cpal device streams and the transport thread between them and the looper

mod averager;
mod chunk;
mod device;
mod encoder;
mod transport;

pub use averager::{AverageRequest, Averager, AveragerError};
pub use chunk::{Chunk, SampleStore};
pub use device::AudioDevice;
pub use encoder::{encode, AiffFormat, EncodeError};
pub use transport::{lock, SharedLooper, Transport};
