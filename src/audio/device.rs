//! Audio device streams
//!
//! Opens the default input and output devices. Neither callback touches the
//! looper: the input callback pushes captured samples into a lock-free ring
//! and the output callback pops rendered samples from another one. The
//! [`Transport`](super::Transport) thread moves whole blocks between those
//! rings and the looper.
//!
//! Samples in both rings use the looper's channel layout (mono or
//! interleaved stereo), independent of how many channels the devices have.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use thiserror::Error;

/// Blocks of headroom in the capture ring
const INPUT_RING_BLOCKS: usize = 64;

/// Blocks of headroom in the playback ring
const OUTPUT_RING_BLOCKS: usize = 8;

/// Errors that can occur while opening audio devices
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No input device available")]
    NoInputDevice,

    #[error("No output device available")]
    NoOutputDevice,

    #[error("Failed to query device config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u16),
}

/// Ring buffer ends handed to the transport
pub struct DeviceIo {
    /// Captured samples, looper layout
    pub input: ringbuf::HeapCons<f32>,
    /// Samples to play, looper layout
    pub output: ringbuf::HeapProd<f32>,
}

/// Open capture and playback streams
pub struct AudioDevice {
    _input_stream: cpal::Stream,
    _output_stream: cpal::Stream,
    pub input_name: String,
    pub output_name: String,
    /// Capture sample rate; exports are tagged with it
    pub sample_rate: u32,
    /// Input gain (shared atomically with the audio thread)
    gain_atomic: Arc<AtomicU32>,
}

impl AudioDevice {
    /// Open the default devices.
    ///
    /// `block_len` is the interleaved block length used to size the rings,
    /// `channels` the looper channel count (1 or 2).
    pub fn open(block_len: usize, channels: u16, gain: f32) -> Result<(Self, DeviceIo), DeviceError> {
        if !(1..=2).contains(&channels) {
            return Err(DeviceError::UnsupportedChannels(channels));
        }
        let loop_channels = channels as usize;

        let host = cpal::default_host();
        let input_device = host.default_input_device().ok_or(DeviceError::NoInputDevice)?;
        let output_device = host.default_output_device().ok_or(DeviceError::NoOutputDevice)?;

        let input_name = input_device.name().unwrap_or_else(|_| "Unknown".to_string());
        let output_name = output_device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using input device: {}", input_name);
        log::info!("Using output device: {}", output_name);

        let input_config = input_device.default_input_config()?;
        log::info!("Input config: {:?}", input_config);
        let sample_rate = input_config.sample_rate().0;

        let (input_prod, input_cons) = HeapRb::<f32>::new(block_len * INPUT_RING_BLOCKS).split();
        let (output_prod, output_cons) =
            HeapRb::<f32>::new(block_len * OUTPUT_RING_BLOCKS).split();

        let gain_atomic = Arc::new(AtomicU32::new(gain.to_bits()));

        let input_format = input_config.sample_format();
        let input_config: StreamConfig = input_config.into();
        let input_stream = match input_format {
            SampleFormat::F32 => build_input::<f32>(&input_device, &input_config, loop_channels, input_prod, Arc::clone(&gain_atomic)),
            SampleFormat::I16 => build_input::<i16>(&input_device, &input_config, loop_channels, input_prod, Arc::clone(&gain_atomic)),
            SampleFormat::U16 => build_input::<u16>(&input_device, &input_config, loop_channels, input_prod, Arc::clone(&gain_atomic)),
            format => return Err(DeviceError::UnsupportedFormat(format)),
        }?;

        let output_default = output_device.default_output_config()?;
        let output_format = output_default.sample_format();
        if output_default.sample_rate().0 != sample_rate {
            log::warn!(
                "Output runs at {} Hz, input at {} Hz; playback pitch will differ",
                output_default.sample_rate().0,
                sample_rate
            );
        }
        let output_config: StreamConfig = output_default.into();
        let output_stream = match output_format {
            SampleFormat::F32 => build_output::<f32>(&output_device, &output_config, loop_channels, output_cons),
            SampleFormat::I16 => build_output::<i16>(&output_device, &output_config, loop_channels, output_cons),
            SampleFormat::U16 => build_output::<u16>(&output_device, &output_config, loop_channels, output_cons),
            format => return Err(DeviceError::UnsupportedFormat(format)),
        }?;

        input_stream.play()?;
        output_stream.play()?;
        log::info!("Audio streams started at {} Hz", sample_rate);

        let device = Self {
            _input_stream: input_stream,
            _output_stream: output_stream,
            input_name,
            output_name,
            sample_rate,
            gain_atomic,
        };
        let io = DeviceIo {
            input: input_cons,
            output: output_prod,
        };
        Ok((device, io))
    }

    /// Change the input gain applied in the capture callback
    pub fn set_gain(&self, gain: f32) {
        self.gain_atomic.store(gain.to_bits(), Ordering::Relaxed);
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    loop_channels: usize,
    mut producer: ringbuf::HeapProd<f32>,
    gain_atomic: Arc<AtomicU32>,
) -> Result<cpal::Stream, DeviceError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let device_channels = config.channels as usize;

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let gain = f32::from_bits(gain_atomic.load(Ordering::Relaxed));
            for frame in data.chunks(device_channels) {
                push_frame(&mut producer, frame, loop_channels, gain);
            }
        },
        |err| log::error!("Audio input error: {}", err),
        None,
    )?;
    Ok(stream)
}

fn build_output<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    loop_channels: usize,
    mut consumer: ringbuf::HeapCons<f32>,
) -> Result<cpal::Stream, DeviceError>
where
    T: SizedSample + FromSample<f32>,
{
    let device_channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(device_channels) {
                let mut loop_frame = [0.0_f32; 2];
                // Underrun: play silence, never a partial frame
                if consumer.occupied_len() >= loop_channels {
                    for value in loop_frame.iter_mut().take(loop_channels) {
                        *value = consumer.try_pop().unwrap_or(0.0);
                    }
                }
                spread_frame(&loop_frame[..loop_channels], frame);
            }
        },
        |err| log::error!("Audio output error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Push one device frame into the capture ring as a looper frame.
///
/// A full ring drops the whole frame, never part of one, so the ring stays
/// frame-aligned. Returns whether the frame was queued.
fn push_frame<T, P>(producer: &mut P, frame: &[T], loop_channels: usize, gain: f32) -> bool
where
    T: SizedSample,
    f32: FromSample<T>,
    P: Producer<Item = f32>,
{
    if frame.is_empty() || producer.vacant_len() < loop_channels {
        return false;
    }
    for c in 0..loop_channels {
        // Mono devices feed both looper channels
        let s = frame.get(c).unwrap_or(&frame[0]);
        let _ = producer.try_push(f32::from_sample(*s) * gain);
    }
    true
}

/// Map one looper frame onto a device frame
fn spread_frame<T: SizedSample + FromSample<f32>>(loop_frame: &[f32], out: &mut [T]) {
    match (loop_frame, out.len()) {
        ([mono], _) => out.iter_mut().for_each(|s| *s = T::from_sample(*mono)),
        ([left, right], 1) => out[0] = T::from_sample((left + right) * 0.5),
        ([left, right, ..], _) => {
            for (c, s) in out.iter_mut().enumerate() {
                let value = match c {
                    0 => *left,
                    1 => *right,
                    _ => 0.0,
                };
                *s = T::from_sample(value);
            }
        }
        _ => out.iter_mut().for_each(|s| *s = T::from_sample(0.0)),
    }
}
