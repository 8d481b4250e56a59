//! Banner and animated-icon addressing.
//!
//! A save's banner and icon frames live inside its own data blocks, at an
//! offset the directory entry points to. This module only works out
//! *where* those pixels are and what format they're in; decoding CI8
//! palette indices or RGB5A3 halfwords into RGBA8 is handed off to a
//! caller-supplied [`PixelDecoder`] (out of scope here — see
//! [`crate::collaborators`]).

use crate::collaborators::PixelDecoder;
use crate::layout::DirectoryEntry;

pub const BANNER_WIDTH: u32 = 96;
pub const BANNER_HEIGHT: u32 = 32;
pub const ICON_WIDTH: u32 = 32;
pub const ICON_HEIGHT: u32 = 32;

const CI8_PALETTE_ENTRIES: usize = 256;

/// Banner pixel format, decoded from the low bits of `bi_flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerFormat {
    None,
    Ci8,
    Rgb5A3,
}

impl BannerFormat {
    fn from_bi_flags(bi_flags: u8) -> Self {
        match bi_flags & 0x03 {
            1 => Self::Ci8,
            2 => Self::Rgb5A3,
            _ => Self::None,
        }
    }

    fn byte_len(self, width: u32, height: u32) -> usize {
        match self {
            Self::None => 0,
            Self::Ci8 => (width * height) as usize,
            Self::Rgb5A3 => (width * height) as usize * 2,
        }
    }
}

/// Whether `entry` carries an animated icon rather than a single still
/// frame, per the `0xFB` flag mask the original reserves for this.
fn is_animated(entry: &DirectoryEntry) -> bool {
    entry.bi_flags() & 0xFB != 0
}

/// Number of icon animation frames `entry.anim_speed` encodes across its
/// 2-bit-per-frame table, stopping at the first "blank" (`0`) speed.
fn icon_frame_count(entry: &DirectoryEntry) -> usize {
    let speed = entry.anim_speed();
    (0..8)
        .take_while(|i| (speed >> (i * 2)) & 0x3 != 0)
        .count()
        .max(1)
}

/// Decodes `entry`'s banner (if it has one) out of `save_data`, the raw
/// bytes starting at the save's first data block.
pub fn decode_banner(
    entry: &DirectoryEntry,
    save_data: &[u8],
    decoder: &dyn PixelDecoder,
) -> Option<Vec<u8>> {
    let format = BannerFormat::from_bi_flags(entry.bi_flags());
    if format == BannerFormat::None {
        return None;
    }
    let offset = entry.image_offset() as usize;
    let len = format.byte_len(BANNER_WIDTH, BANNER_HEIGHT);
    let palette_len = match format {
        BannerFormat::Ci8 => CI8_PALETTE_ENTRIES * 2,
        _ => 0,
    };
    if offset + len + palette_len > save_data.len() {
        return None;
    }

    let mut rgba = vec![0u8; (BANNER_WIDTH * BANNER_HEIGHT * 4) as usize];
    match format {
        BannerFormat::Ci8 => {
            let pixels = &save_data[offset..offset + len];
            let palette_bytes = &save_data[offset + len..offset + len + palette_len];
            let palette = be_u16_palette(palette_bytes);
            decoder.decode_ci8(&mut rgba, pixels, &palette, BANNER_WIDTH, BANNER_HEIGHT);
        }
        BannerFormat::Rgb5A3 => {
            let pixels = be_u16_pixels(&save_data[offset..offset + len]);
            decoder.decode_rgb5a3(&mut rgba, &pixels, BANNER_WIDTH, BANNER_HEIGHT);
        }
        BannerFormat::None => unreachable!(),
    }
    Some(rgba)
}

/// Decodes every icon animation frame `entry` carries, in display order.
/// A frame whose data would be all-zero repeats the previous frame
/// rather than being decoded, matching the console's own animation
/// playback for "blank" frames.
pub fn decode_icon_frames(
    entry: &DirectoryEntry,
    save_data: &[u8],
    decoder: &dyn PixelDecoder,
) -> Vec<Vec<u8>> {
    let icon_fmt = entry.icon_fmt();
    let frame_count = if is_animated(entry) { icon_frame_count(entry) } else { 1 };

    let mut offset = entry.image_offset() as usize;
    // The banner, if present, sits ahead of the icon frames.
    let banner_format = BannerFormat::from_bi_flags(entry.bi_flags());
    offset += banner_format.byte_len(BANNER_WIDTH, BANNER_HEIGHT);
    if banner_format == BannerFormat::Ci8 {
        offset += CI8_PALETTE_ENTRIES * 2;
    }

    let shared_palette_len = if icon_fmt_is_ci8(icon_fmt) { CI8_PALETTE_ENTRIES * 2 } else { 0 };
    let frame_byte_len = icon_frame_byte_len(icon_fmt);

    let mut frames = Vec::with_capacity(frame_count);
    let mut last_frame: Option<Vec<u8>> = None;
    for frame in 0..frame_count {
        let frame_fmt = (icon_fmt >> (frame * 2)) & 0x3;
        if frame_fmt == 0 {
            if let Some(prev) = &last_frame {
                frames.push(prev.clone());
            }
            continue;
        }

        if offset + frame_byte_len > save_data.len() {
            break;
        }
        let mut rgba = vec![0u8; (ICON_WIDTH * ICON_HEIGHT * 4) as usize];
        if frame_fmt == 1 {
            let pixels = &save_data[offset..offset + frame_byte_len];
            let palette_offset = if shared_palette_len > 0 {
                // Shared palette lives right after every frame's pixel data.
                offset + frame_byte_len * (frame_count - frame)
            } else {
                offset + frame_byte_len
            };
            const ZERO_PALETTE: [u8; 512] = [0u8; 512];
            let palette_bytes = save_data
                .get(palette_offset..palette_offset + 512)
                .unwrap_or(&ZERO_PALETTE);
            let palette = be_u16_palette(palette_bytes);
            decoder.decode_ci8(&mut rgba, pixels, &palette, ICON_WIDTH, ICON_HEIGHT);
        } else {
            let pixels = be_u16_pixels(&save_data[offset..offset + frame_byte_len]);
            decoder.decode_rgb5a3(&mut rgba, &pixels, ICON_WIDTH, ICON_HEIGHT);
        }

        offset += frame_byte_len;
        last_frame = Some(rgba.clone());
        frames.push(rgba);
    }
    frames
}

fn icon_fmt_is_ci8(icon_fmt: u16) -> bool {
    (0..8).any(|i| (icon_fmt >> (i * 2)) & 0x3 == 1)
}

fn icon_frame_byte_len(icon_fmt: u16) -> usize {
    if icon_fmt_is_ci8(icon_fmt) {
        (ICON_WIDTH * ICON_HEIGHT) as usize
    } else {
        (ICON_WIDTH * ICON_HEIGHT) as usize * 2
    }
}

fn be_u16_pixels(bytes: &[u8]) -> Vec<u16> {
    bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect()
}

fn be_u16_palette(bytes: &[u8]) -> Vec<u16> {
    be_u16_pixels(bytes)
}
