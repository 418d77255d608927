//! Metadata extraction for slide sources.
//!
//! Reads only headers: image dimensions through `image::ImageReader`,
//! video dimensions by sniffing the container, document page counts by
//! scanning the PDF object table.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, ImageReader};
use tracing::{debug, trace, warn};

use crate::models::{Size, SlideKind};

/// Bytes read from the head of a video container.
const VIDEO_HEAD_BYTES: u64 = 128 * 1024;

/// Largest PDF scanned for page objects.
const MAX_DOCUMENT_BYTES: u64 = 64 * 1024 * 1024;

/// Error state marker for broken media files.
pub const ERROR_DIMENSION: u32 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediaMetadata {
    pub natural_size: Option<Size>,
    pub page_count: Option<u32>,
}

pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Lenient extraction used while scanning: unreadable files yield empty
    /// metadata so the slide still shows up with a placeholder.
    pub fn extract(path: &Path, kind: SlideKind) -> MediaMetadata {
        match Self::probe(path, kind) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Failed to read metadata for {:?}: {:#}", path, e);
                MediaMetadata::default()
            }
        }
    }

    /// Strict probe used by the media loader. Fails when the source cannot
    /// be read as the given kind.
    pub fn probe(path: &Path, kind: SlideKind) -> Result<MediaMetadata> {
        match kind {
            SlideKind::Image => {
                let (width, height) = Self::image_dimensions(path)?;
                Ok(MediaMetadata {
                    natural_size: Size::from_pixels(width, height),
                    page_count: None,
                })
            }
            SlideKind::Video => {
                let (width, height) = Self::video_dimensions(path)?;
                Ok(MediaMetadata {
                    natural_size: Size::from_pixels(width, height),
                    page_count: None,
                })
            }
            SlideKind::Document => Ok(MediaMetadata {
                natural_size: None,
                page_count: Some(Self::document_pages(path)?),
            }),
        }
    }

    /// Reads image dimensions without decoding pixel data. Animated GIFs
    /// report the size of their first frame.
    pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
        trace!("Extracting image dimensions from {:?}", path);
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
        let format = image::guess_format(&bytes).ok();

        if format == Some(ImageFormat::Gif) {
            let decoder = GifDecoder::new(Cursor::new(bytes))
                .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
            let mut frames = decoder.into_frames();
            if let Some(frame) = frames.next() {
                let frame = frame.context("Failed to decode GIF frame")?;
                let buf = frame.into_buffer();
                return Ok((buf.width(), buf.height()));
            }
            return Err(anyhow!("GIF has no frames: {:?}", path));
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .context("Failed to guess image format")?;
        reader
            .into_dimensions()
            .with_context(|| format!("Failed to read dimensions: {:?}", path))
    }

    /// Video dimensions from the container header. A readable file with an
    /// unrecognised layout yields `ERROR_DIMENSION`s rather than an error.
    pub fn video_dimensions(path: &Path) -> Result<(u32, u32)> {
        trace!("Extracting video dimensions from {:?}", path);
        let head = read_head(path, VIDEO_HEAD_BYTES)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let parsed = match ext.as_str() {
            "webm" | "mkv" => parse_matroska_dimensions(&head),
            "mp4" | "mov" => parse_mp4_dimensions(&head),
            "avi" => parse_avi_dimensions(&head),
            _ => {
                debug!("No specific parser for video format: {}", ext);
                None
            }
        };

        Ok(parsed.unwrap_or_else(|| {
            debug!("Could not parse video dimensions for {:?}", path);
            (ERROR_DIMENSION, ERROR_DIMENSION)
        }))
    }

    /// Counts `/Type /Page` objects. At least one page is reported for any
    /// file that carries a PDF header.
    pub fn document_pages(path: &Path) -> Result<u32> {
        let bytes = read_head(path, MAX_DOCUMENT_BYTES)?;
        if !bytes.starts_with(b"%PDF-") {
            bail!("{:?} is not a PDF document", path);
        }
        let pages = count_pdf_pages(&bytes);
        trace!("PDF {:?} has {} page objects", path, pages);
        Ok(pages.max(1))
    }
}

fn read_head(path: &Path, limit: u64) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut buffer = Vec::new();
    file.take(limit)
        .read_to_end(&mut buffer)
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(buffer)
}

fn count_pdf_pages(bytes: &[u8]) -> u32 {
    let mut count = 0;
    let mut i = 0;
    while i + 5 <= bytes.len() {
        if &bytes[i..i + 5] != b"/Type" {
            i += 1;
            continue;
        }
        let mut j = i + 5;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if bytes.get(j..j + 5) == Some(b"/Page") && bytes.get(j + 5) != Some(&b's') {
            count += 1;
        }
        i = j.max(i + 1);
    }
    count
}

/// Matroska/WebM: looks for the PixelWidth (0xB0) and PixelHeight (0xBA)
/// elements of the video track. Pattern search, not a full EBML parser.
fn parse_matroska_dimensions(buffer: &[u8]) -> Option<(u32, u32)> {
    let mut width = 0u32;
    let mut height = 0u32;

    for i in 0..buffer.len() {
        match buffer[i] {
            0xB0 if width == 0 => {
                if let Some(value) = read_ebml_uint(&buffer[i + 1..]) {
                    width = value as u32;
                }
            }
            0xBA if height == 0 => {
                if let Some(value) = read_ebml_uint(&buffer[i + 1..]) {
                    height = value as u32;
                }
            }
            _ => {}
        }
        if width > 0 && height > 0 {
            trace!("Matroska parsed dimensions: {}x{}", width, height);
            return Some((width, height));
        }
    }
    None
}

/// Reads an EBML size vint followed by an unsigned value of that size.
fn read_ebml_uint(data: &[u8]) -> Option<u64> {
    let first = *data.first()?;
    if first == 0 {
        return None;
    }
    let len = first.leading_zeros() as usize + 1;
    let mut size = u64::from(first) & (0xFF >> len);
    for &byte in data.get(1..len)? {
        size = (size << 8) | u64::from(byte);
    }
    let size = size as usize;
    if size == 0 || size > 4 {
        return None;
    }
    let value = data
        .get(len..len + size)?
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    (value > 0 && value < 65536).then_some(value)
}

/// MP4/MOV: the `tkhd` box carries 16.16 fixed-point dimensions; sample
/// entries in `stsd` are the fallback.
fn parse_mp4_dimensions(buffer: &[u8]) -> Option<(u32, u32)> {
    for i in 0..buffer.len().saturating_sub(92) {
        if &buffer[i..i + 4] != b"tkhd" {
            continue;
        }
        let offset = if buffer[i + 4] == 0 { i + 80 } else { i + 92 };
        let Some(dims) = buffer.get(offset..offset + 8) else {
            continue;
        };
        let width = u32::from_be_bytes([dims[0], dims[1], dims[2], dims[3]]) >> 16;
        let height = u32::from_be_bytes([dims[4], dims[5], dims[6], dims[7]]) >> 16;
        if width > 0 && height > 0 {
            trace!("MP4 parsed dimensions: {}x{}", width, height);
            return Some((width, height));
        }
    }

    for i in 0..buffer.len().saturating_sub(40) {
        let tag = &buffer[i..i + 4];
        if tag == b"avc1" || tag == b"hvc1" || tag == b"mp4v" || tag == b"vp09" {
            let width = u16::from_be_bytes([buffer[i + 28], buffer[i + 29]]) as u32;
            let height = u16::from_be_bytes([buffer[i + 30], buffer[i + 31]]) as u32;
            if width > 0 && height > 0 {
                trace!("MP4 stsd parsed dimensions: {}x{}", width, height);
                return Some((width, height));
            }
        }
    }
    None
}

/// AVI: the BITMAPINFOHEADER inside the video stream's `strf` chunk.
fn parse_avi_dimensions(buffer: &[u8]) -> Option<(u32, u32)> {
    for i in 0..buffer.len().saturating_sub(20) {
        if &buffer[i..i + 4] != b"strf" {
            continue;
        }
        let header = &buffer[i + 8..i + 20];
        let width = i32::from_le_bytes([header[4], header[5], header[6], header[7]]).unsigned_abs();
        // Negative height marks a top-down bitmap.
        let height = i32::from_le_bytes([header[8], header[9], header[10], header[11]]).unsigned_abs();
        if width > 0 && height > 0 && width < 65536 && height < 65536 {
            trace!("AVI parsed dimensions: {}x{}", width, height);
            return Some((width, height));
        }
    }
    None
}
