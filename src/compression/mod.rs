// src/compression/mod.rs
//! Decompression of fetched package streams
//!
//! Packages are written gzip-compressed, but a location may serve a tar that
//! was recompressed with xz or zstd, or not compressed at all. The codec is
//! sniffed from the first bytes of the stream, which stay buffered and are
//! fed to the decoder, so unseekable sources (HTTP bodies, a child's stdout)
//! work the same as files.

use crate::error::{Error, Result};
use std::fmt;
use std::io::{BufRead, BufReader, Read};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Codec wrapped around a package tar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Plain,
    Gzip,
    Xz,
    Zstd,
}

impl Codec {
    /// Identify the codec from a stream's leading bytes; anything unknown
    /// is taken to be a bare tar
    pub fn sniff(head: &[u8]) -> Self {
        [(GZIP_MAGIC, Self::Gzip), (XZ_MAGIC, Self::Xz), (ZSTD_MAGIC, Self::Zstd)]
            .into_iter()
            .find(|(magic, _)| head.starts_with(magic))
            .map_or(Self::Plain, |(_, codec)| codec)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "uncompressed",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        })
    }
}

/// Sniff `reader` and wrap it in the matching decoder
///
/// `source` only names the stream in errors.
pub fn open_stream<'a, R: Read + 'a>(reader: R, source: &str) -> Result<(Codec, Box<dyn Read + 'a>)> {
    let mut buffered = BufReader::new(reader);
    let head = buffered
        .fill_buf()
        .map_err(|e| Error::Archive(format!("{}: reading header: {}", source, e)))?;
    let codec = Codec::sniff(head);

    let decoded: Box<dyn Read + 'a> = match codec {
        Codec::Plain => Box::new(buffered),
        Codec::Gzip => Box::new(flate2::bufread::GzDecoder::new(buffered)),
        Codec::Xz => Box::new(xz2::bufread::XzDecoder::new(buffered)),
        Codec::Zstd => Box::new(
            zstd::Decoder::with_buffer(buffered)
                .map_err(|e| Error::Archive(format!("{}: zstd decoder: {}", source, e)))?,
        ),
    };
    Ok((codec, decoded))
}
