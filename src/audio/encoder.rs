//! AIFF export
//!
//! Serializes a range of chunks into a minimal AIFF container:
//!
//! - `FORM` header with form type `AIFF`
//! - `COMM` chunk: channel count, frame count, bit depth, sample rate
//!   (80-bit IEEE extended)
//! - `SSND` chunk: zero offset/block size, then the sample data
//!
//! All multi-byte fields are big-endian. Samples in `[-1, 1]` are mapped to
//! the fixed-point range with `floor((2^(bits-1) - 1) * (1 + sample))`.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use thiserror::Error;

use super::chunk::Chunk;

/// Errors that can occur while encoding
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Invalid range {start}..{end}")]
    InvalidRange { start: usize, end: usize },

    #[error("Range end {end} is past the last chunk ({count})")]
    OutOfBounds { end: usize, count: usize },

    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    #[error("Invalid channel count: {0}")]
    InvalidChannels(u16),

    #[error("Encoded data does not fit in an AIFF file")]
    TooLarge,

    #[error("Write error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output format of an encoded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiffFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AiffFormat {
    pub const SUPPORTED_BITS: &'static [u16] = &[8, 16, 24, 32];

    fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }
}

/// Size of the COMM chunk body
const COMM_SIZE: u32 = 18;

/// Offset + block size fields at the start of SSND
const SSND_HEADER_SIZE: u32 = 8;

/// Encode chunks `start..end` (end exclusive) as an AIFF byte blob.
///
/// An empty range yields a well-formed file with zero frames.
pub fn encode(
    chunks: &[Chunk],
    start: usize,
    end: usize,
    format: &AiffFormat,
) -> Result<Vec<u8>, EncodeError> {
    if end < start {
        return Err(EncodeError::InvalidRange { start, end });
    }
    if end > chunks.len() {
        return Err(EncodeError::OutOfBounds {
            end,
            count: chunks.len(),
        });
    }
    if !AiffFormat::SUPPORTED_BITS.contains(&format.bits_per_sample) {
        return Err(EncodeError::UnsupportedBitDepth(format.bits_per_sample));
    }
    if format.channels == 0 {
        return Err(EncodeError::InvalidChannels(format.channels));
    }

    let range = &chunks[start..end];
    let channels = format.channels as usize;
    let total_samples: usize = range.iter().map(|c| c.samples.len()).sum();
    let frames = total_samples / channels;
    let sample_count = frames * channels;

    let data_len = sample_count
        .checked_mul(format.bytes_per_sample())
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(EncodeError::TooLarge)?;
    let pad = data_len % 2;
    let ssnd_size = SSND_HEADER_SIZE
        .checked_add(data_len)
        .ok_or(EncodeError::TooLarge)?;
    let form_size = (4 + 8 + COMM_SIZE)
        .checked_add(8)
        .and_then(|n| n.checked_add(ssnd_size))
        .and_then(|n| n.checked_add(pad))
        .ok_or(EncodeError::TooLarge)?;
    let frames = u32::try_from(frames).map_err(|_| EncodeError::TooLarge)?;

    let mut out = Vec::with_capacity(form_size as usize + 8);

    out.write_all(b"FORM")?;
    out.write_u32::<BigEndian>(form_size)?;
    out.write_all(b"AIFF")?;

    out.write_all(b"COMM")?;
    out.write_u32::<BigEndian>(COMM_SIZE)?;
    out.write_u16::<BigEndian>(format.channels)?;
    out.write_u32::<BigEndian>(frames)?;
    out.write_u16::<BigEndian>(format.bits_per_sample)?;
    out.write_all(&extended_from_rate(format.sample_rate))?;

    out.write_all(b"SSND")?;
    out.write_u32::<BigEndian>(ssnd_size)?;
    out.write_u32::<BigEndian>(0)?; // offset
    out.write_u32::<BigEndian>(0)?; // block size

    let samples = range.iter().flat_map(|c| c.samples.iter()).take(sample_count);
    for &sample in samples {
        let value = to_fixed_point(sample, format.bits_per_sample);
        match format.bits_per_sample {
            8 => out.write_u8(value as u8)?,
            16 => out.write_u16::<BigEndian>(value as u16)?,
            24 => out.write_u24::<BigEndian>(value)?,
            _ => out.write_u32::<BigEndian>(value)?,
        }
    }
    if pad == 1 {
        out.write_u8(0)?;
    }

    Ok(out)
}

/// Map a float sample to the container's fixed-point value
pub fn to_fixed_point(sample: f32, bits: u16) -> u32 {
    let scale = ((1_u64 << (bits - 1)) - 1) as f64;
    let sample = if sample.is_finite() {
        (sample as f64).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    (scale * (1.0 + sample)).floor() as u32
}

/// Sample rate as an 80-bit IEEE 754 extended float
fn extended_from_rate(rate: u32) -> [u8; 10] {
    let mut bytes = [0u8; 10];
    if rate == 0 {
        return bytes;
    }
    let exponent = 31 - rate.leading_zeros();
    let biased = (16383 + exponent) as u16;
    let mantissa = (rate as u64) << (63 - exponent);
    bytes[..2].copy_from_slice(&biased.to_be_bytes());
    bytes[2..].copy_from_slice(&mantissa.to_be_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::chunk::SampleStore;
    use byteorder::ReadBytesExt;
    use std::io::{Cursor, Read};

    /// Minimal standalone AIFF reader for verifying the encoder output
    struct Decoded {
        channels: u16,
        frames: u32,
        bits: u16,
        sample_rate: f64,
        data: Vec<u32>,
    }

    fn decode(bytes: &[u8]) -> Decoded {
        let mut r = Cursor::new(bytes);
        let mut tag = [0u8; 4];

        r.read_exact(&mut tag).unwrap();
        assert_eq!(&tag, b"FORM");
        let form_size = r.read_u32::<BigEndian>().unwrap();
        assert_eq!(form_size as usize + 8, bytes.len());
        r.read_exact(&mut tag).unwrap();
        assert_eq!(&tag, b"AIFF");

        let mut comm = None;
        let mut data = Vec::new();

        while (r.position() as usize) < bytes.len() {
            r.read_exact(&mut tag).unwrap();
            let size = r.read_u32::<BigEndian>().unwrap();
            match &tag {
                b"COMM" => {
                    let channels = r.read_u16::<BigEndian>().unwrap();
                    let frames = r.read_u32::<BigEndian>().unwrap();
                    let bits = r.read_u16::<BigEndian>().unwrap();
                    let exp = r.read_u16::<BigEndian>().unwrap();
                    let mantissa = r.read_u64::<BigEndian>().unwrap();
                    let rate = mantissa as f64 * 2f64.powi(exp as i32 - 16383 - 63);
                    comm = Some((channels, frames, bits, rate));
                }
                b"SSND" => {
                    let (_, _, bits, _) = comm.expect("COMM before SSND");
                    assert_eq!(r.read_u32::<BigEndian>().unwrap(), 0);
                    assert_eq!(r.read_u32::<BigEndian>().unwrap(), 0);
                    let count = (size - 8) as usize / (bits as usize / 8);
                    for _ in 0..count {
                        let v = match bits {
                            8 => r.read_u8().unwrap() as u32,
                            16 => r.read_u16::<BigEndian>().unwrap() as u32,
                            24 => r.read_u24::<BigEndian>().unwrap(),
                            _ => r.read_u32::<BigEndian>().unwrap(),
                        };
                        data.push(v);
                    }
                    if size % 2 == 1 {
                        r.read_u8().unwrap();
                    }
                }
                _ => panic!("unexpected chunk"),
            }
        }

        let (channels, frames, bits, sample_rate) = comm.expect("missing COMM");
        Decoded {
            channels,
            frames,
            bits,
            sample_rate,
            data,
        }
    }

    fn store_with(values: &[f32], block_size: usize) -> SampleStore {
        let mut store = SampleStore::new();
        for &v in values {
            store.append(&vec![v; block_size]);
        }
        store
    }

    const MONO_16: AiffFormat = AiffFormat {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
    };

    #[test]
    fn test_encode_constant_chunks() {
        let block_size = 512;
        let values = [0.0_f32, 0.5, -0.5, 1.0];
        let store = store_with(&values, block_size);

        let bytes = encode(store.chunks(), 0, 3, &MONO_16).unwrap();
        let decoded = decode(&bytes);

        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.bits, 16);
        assert_eq!(decoded.frames as usize, 3 * block_size);
        assert_eq!(decoded.sample_rate, 44100.0);
        assert_eq!(decoded.data.len(), 3 * block_size);

        for (i, &v) in decoded.data.iter().enumerate() {
            let source = values[i / block_size] as f64;
            let expected = (32767.0 * (1.0 + source)).floor() as u32;
            assert_eq!(v, expected, "frame {}", i);
        }
    }

    #[test]
    fn test_encode_empty_range() {
        let store = store_with(&[0.1, 0.2], 64);
        let bytes = encode(store.chunks(), 1, 1, &MONO_16).unwrap();
        let decoded = decode(&bytes);
        assert_eq!(decoded.frames, 0);
        assert!(decoded.data.is_empty());
        assert_eq!(bytes.len(), 12 + 8 + 18 + 8 + 8);
    }

    #[test]
    fn test_encode_rejects_bad_ranges() {
        let store = store_with(&[0.1, 0.2], 64);
        assert!(matches!(
            encode(store.chunks(), 2, 1, &MONO_16),
            Err(EncodeError::InvalidRange { start: 2, end: 1 })
        ));
        assert!(matches!(
            encode(store.chunks(), 0, 3, &MONO_16),
            Err(EncodeError::OutOfBounds { end: 3, count: 2 })
        ));

        let format = AiffFormat {
            bits_per_sample: 12,
            ..MONO_16
        };
        assert!(matches!(
            encode(store.chunks(), 0, 1, &format),
            Err(EncodeError::UnsupportedBitDepth(12))
        ));
    }

    #[test]
    fn test_encode_stereo_frames() {
        let store = store_with(&[0.25, -0.25], 256);
        let format = AiffFormat {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 24,
        };
        let decoded = decode(&encode(store.chunks(), 0, 2, &format).unwrap());
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.frames, 256);
        assert_eq!(decoded.sample_rate, 48000.0);
        assert_eq!(decoded.data[0], to_fixed_point(0.25, 24));
        assert_eq!(decoded.data[511], to_fixed_point(-0.25, 24));
    }

    #[test]
    fn test_odd_data_is_padded() {
        let store = store_with(&[0.0], 3);
        let format = AiffFormat {
            bits_per_sample: 8,
            ..MONO_16
        };
        let bytes = encode(store.chunks(), 0, 1, &format).unwrap();
        assert_eq!(bytes.len() % 2, 0);
        let decoded = decode(&bytes);
        assert_eq!(decoded.data, vec![127, 127, 127]);
    }

    #[test]
    fn test_fixed_point_extremes() {
        assert_eq!(to_fixed_point(-1.0, 16), 0);
        assert_eq!(to_fixed_point(1.0, 16), 65534);
        assert_eq!(to_fixed_point(2.0, 16), 65534);
        assert_eq!(to_fixed_point(f32::NAN, 16), 32767);
        assert_eq!(to_fixed_point(1.0, 32), u32::MAX - 1);
    }
}
