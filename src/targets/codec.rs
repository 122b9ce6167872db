//! Byte codecs: base64, deflate-family compression and CRC-32.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::GeneralPurpose;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use flate2::Compression;

use crate::diagnostics::RegistryError;
use crate::generator::{Generator, bytes, int_range, one_of, select, vec_of};
use crate::oracle::{Oracle, TargetError, TargetResult};
use crate::property::Property;
use crate::registry::Registry;

pub const PAYLOAD_TAG: &str = "codec.payload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Standard,
    StandardNoPad,
    UrlSafe,
    UrlSafeNoPad,
}

impl Alphabet {
    const ALL: [Alphabet; 4] = [
        Alphabet::Standard,
        Alphabet::StandardNoPad,
        Alphabet::UrlSafe,
        Alphabet::UrlSafeNoPad,
    ];

    fn engine(self) -> &'static GeneralPurpose {
        match self {
            Alphabet::Standard => &STANDARD,
            Alphabet::StandardNoPad => &STANDARD_NO_PAD,
            Alphabet::UrlSafe => &URL_SAFE,
            Alphabet::UrlSafeNoPad => &URL_SAFE_NO_PAD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Zlib,
    Gzip,
    Deflate,
}

impl Format {
    const ALL: [Format; 3] = [Format::Zlib, Format::Gzip, Format::Deflate];
}

/// Arbitrary bytes, or a short pattern repeated so the compressors have
/// something to find.
fn payload() -> impl Generator<Value = Vec<u8>> {
    one_of(vec![
        (2, bytes(0, 96).boxed()),
        (1, (bytes(1, 12), int_range(1, 60)).map(|(unit, n)| unit.repeat(n as usize)).boxed()),
        (1, vec_of(select(vec![0u8, 0xff, b'a']), 0, 200).boxed()),
    ])
}

fn io_failed(err: std::io::Error) -> TargetError {
    TargetError::failed(err)
}

pub fn compress(format: Format, level: u32, data: &[u8]) -> TargetResult<Vec<u8>> {
    let level = Compression::new(level);
    let out = match format {
        Format::Zlib => {
            let mut e = flate2::write::ZlibEncoder::new(Vec::new(), level);
            e.write_all(data).map_err(io_failed)?;
            e.finish()
        }
        Format::Gzip => {
            let mut e = flate2::write::GzEncoder::new(Vec::new(), level);
            e.write_all(data).map_err(io_failed)?;
            e.finish()
        }
        Format::Deflate => {
            let mut e = flate2::write::DeflateEncoder::new(Vec::new(), level);
            e.write_all(data).map_err(io_failed)?;
            e.finish()
        }
    };
    out.map_err(io_failed)
}

/// One-shot decompression through a reader.
pub fn decompress(format: Format, data: &[u8]) -> TargetResult<Vec<u8>> {
    let mut out = Vec::new();
    let read = match format {
        Format::Zlib => flate2::read::ZlibDecoder::new(data).read_to_end(&mut out),
        Format::Gzip => flate2::read::GzDecoder::new(data).read_to_end(&mut out),
        Format::Deflate => flate2::read::DeflateDecoder::new(data).read_to_end(&mut out),
    };
    read.map_err(io_failed)?;
    Ok(out)
}

/// Streaming decompression, fed `chunk` bytes at a time.
pub fn decompress_chunked(format: Format, data: &[u8], chunk: usize) -> TargetResult<Vec<u8>> {
    fn feed<W: Write>(mut w: W, data: &[u8], chunk: usize) -> TargetResult<W> {
        for piece in data.chunks(chunk.max(1)) {
            w.write_all(piece).map_err(io_failed)?;
        }
        Ok(w)
    }
    let out = match format {
        Format::Zlib => feed(flate2::write::ZlibDecoder::new(Vec::new()), data, chunk)?.finish(),
        Format::Gzip => feed(flate2::write::GzDecoder::new(Vec::new()), data, chunk)?.finish(),
        Format::Deflate => {
            feed(flate2::write::DeflateDecoder::new(Vec::new()), data, chunk)?.finish()
        }
    };
    out.map_err(io_failed)
}

/// Bit-at-a-time CRC-32 (IEEE, reflected polynomial 0xEDB88320).
pub fn crc32_reference(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

fn crc32_incremental(data: &[u8], split: usize) -> u32 {
    let (head, tail) = data.split_at(split.min(data.len()));
    let mut crc = flate2::Crc::new();
    crc.update(head);
    crc.update(tail);
    crc.sum()
}

#[derive(Debug)]
pub struct Compressed {
    format: Format,
    level: u32,
    bytes: Vec<u8>,
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.generators.register(PAYLOAD_TAG, payload().boxed())?;
    let payload = registry.generators.get::<Vec<u8>>(PAYLOAD_TAG)?;

    registry.properties.register(Property::new(
        "codec.base64_round_trip",
        "base64 decode(encode(b)) == b for every standard engine",
        (select(Alphabet::ALL.to_vec()), payload.clone()),
        Oracle::round_trip(
            |(alphabet, data): &(Alphabet, Vec<u8>)| {
                Ok((*alphabet, alphabet.engine().encode(data)))
            },
            |(alphabet, text): &(Alphabet, String)| {
                let data = alphabet.engine().decode(text).map_err(TargetError::failed)?;
                Ok((*alphabet, data))
            },
        ),
    ))?;

    registry.properties.register(Property::new(
        "compress.round_trip",
        "decompress(compress(b, level)) == b for zlib, gzip and raw deflate",
        (select(Format::ALL.to_vec()), int_range(0, 9), payload.clone()),
        Oracle::round_trip(
            |(format, level, data): &(Format, i64, Vec<u8>)| {
                let level = *level as u32;
                Ok(Compressed { format: *format, level, bytes: compress(*format, level, data)? })
            },
            |c: &Compressed| Ok((c.format, i64::from(c.level), decompress(c.format, &c.bytes)?)),
        ),
    ))?;

    registry.properties.register(Property::new(
        "compress.chunked_decompress",
        "chunk-fed streaming decompression matches one-shot decompression",
        (select(Format::ALL.to_vec()), payload.clone(), int_range(1, 64)),
        Oracle::differential(
            "one-shot",
            |(format, data, _): &(Format, Vec<u8>, i64)| {
                decompress(*format, &compress(*format, 6, data)?)
            },
            "chunked",
            |(format, data, chunk): &(Format, Vec<u8>, i64)| {
                decompress_chunked(*format, &compress(*format, 6, data)?, *chunk as usize)
            },
        ),
    ))?;

    registry.properties.register(Property::new(
        "checksum.crc32_incremental",
        "CRC-32 over two updates equals a bitwise reference over the whole input",
        (payload, int_range(0, 200)),
        Oracle::differential(
            "incremental",
            |(data, split): &(Vec<u8>, i64)| Ok(crc32_incremental(data, *split as usize)),
            "bitwise",
            |(data, _): &(Vec<u8>, i64)| Ok(crc32_reference(data)),
        ),
    ))?;

    Ok(())
}
