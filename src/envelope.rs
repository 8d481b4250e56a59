//! Single-save exchange envelopes: the three formats individual saves get
//! shared as (rather than a whole card image) — GCI (a bare directory
//! entry plus data), GCS (`"GCSAVE"` magic, fixed 0x110-byte prefix), and
//! SAV (`"DATELGC_SAVE"` magic, fixed 0x2C0-byte prefix, fields swapped).

use crate::error::{Error, Result};
use crate::layout::{DirectoryEntry, BLOCK_SIZE, DENTRY_SIZE};
use crate::primitives::{swap_byte_pair, swap_bytes};

pub const GCI_PREFIX_SIZE: usize = 0;
pub const GCS_PREFIX_SIZE: usize = 0x110;
pub const SAV_PREFIX_SIZE: usize = 0x2C0;

const GCS_MAGIC: &[u8] = b"GCSAVE";
const SAV_MAGIC: &[u8] = b"DATELGC_SAVE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFormat {
    Gci,
    Gcs,
    Sav,
}

impl EnvelopeFormat {
    /// Picks a format from a file's extension (case-insensitive).
    pub fn from_extension(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "gci" => Some(Self::Gci),
            "gcs" => Some(Self::Gcs),
            "sav" => Some(Self::Sav),
            _ => None,
        }
    }

    fn prefix_size(self) -> usize {
        match self {
            Self::Gci => GCI_PREFIX_SIZE,
            Self::Gcs => GCS_PREFIX_SIZE,
            Self::Sav => SAV_PREFIX_SIZE,
        }
    }

    fn magic(self) -> &'static [u8] {
        match self {
            Self::Gci => &[],
            Self::Gcs => GCS_MAGIC,
            Self::Sav => SAV_MAGIC,
        }
    }
}

/// Applies the SAV envelope's field-swap list to a raw 64-byte directory
/// entry, in place. Self-inverse: the same call takes a canonical entry
/// to SAV field order, or a SAV-order entry back to canonical.
pub(crate) fn gcs_sav_convert(bytes: &mut [u8; DENTRY_SIZE]) {
    swap_bytes(bytes, 0x06, 0x07); // Unused1 <-> BIFlags
    swap_bytes(bytes, 0x34, 0x35); // Permissions <-> CopyCounter
    for offset in [0x2C, 0x2E, 0x30, 0x32, 0x36, 0x38, 0x3A, 0x3C, 0x3E] {
        swap_byte_pair(bytes, offset);
    }
}

/// Parses a single-save envelope into its directory entry and raw save
/// data (banner/icon/comment/save bytes, concatenated as the card would
/// lay them out in its data blocks).
pub fn import_file(bytes: &[u8], format: EnvelopeFormat) -> Result<(DirectoryEntry, Vec<u8>)> {
    let prefix = format.prefix_size();
    if bytes.len() < prefix + DENTRY_SIZE {
        return Err(Error::LengthFail);
    }
    let magic = format.magic();
    if !magic.is_empty() && &bytes[..magic.len()] != magic {
        return Err(match format {
            EnvelopeFormat::Gcs => Error::GcsFail,
            EnvelopeFormat::Sav => Error::SavFail,
            EnvelopeFormat::Gci => unreachable!(),
        });
    }

    let mut entry_bytes: [u8; DENTRY_SIZE] =
        bytes[prefix..prefix + DENTRY_SIZE].try_into().unwrap();
    if matches!(format, EnvelopeFormat::Gcs | EnvelopeFormat::Sav) {
        gcs_sav_convert(&mut entry_bytes);
    }
    let mut entry = DirectoryEntry::from_bytes(entry_bytes);
    let data = bytes[prefix + DENTRY_SIZE..].to_vec();

    if format == EnvelopeFormat::Gcs {
        // GCS doesn't reliably carry a block count; derive it from the
        // envelope's actual length instead of trusting the stored field.
        let blocks = (data.len() + BLOCK_SIZE - 1) / BLOCK_SIZE;
        entry.set_block_count(blocks as u16);
    }

    if entry.block_count() as usize * BLOCK_SIZE != data.len().next_multiple_of(BLOCK_SIZE) {
        return Err(Error::InvalidFileSize);
    }

    Ok((entry, data))
}

/// Builds a single-save envelope for `entry`/`data` in `format`.
pub fn export_file(entry: &DirectoryEntry, data: &[u8], format: EnvelopeFormat) -> Vec<u8> {
    let prefix = format.prefix_size();
    let mut out = vec![0u8; prefix];
    out[..format.magic().len()].copy_from_slice(format.magic());

    let mut entry_bytes = *entry.as_bytes();
    if matches!(format, EnvelopeFormat::Gcs | EnvelopeFormat::Sav) {
        gcs_sav_convert(&mut entry_bytes);
    }
    out.extend_from_slice(&entry_bytes);
    out.extend_from_slice(data);
    out
}
