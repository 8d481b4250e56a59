//! On-disk structures: byte-exact layouts for the header, directory
//! entries, directories, the block-allocation table, and the optional
//! MCI envelope header.
//!
//! Every structure here wraps a fixed-size byte array and exposes typed
//! `get`/`set` accessors built on [`crate::primitives`], rather than a
//! native `#[repr(C)]` record transmuted over the bytes — several of the
//! checksummed regions start at offsets that don't line up with a plain
//! struct's field order (the BAT checksum skips its own leading 4 bytes),
//! so a byte-array-plus-accessors representation is the one that can
//! actually express that without lying about its layout.

pub(crate) mod bat;
pub(crate) mod directory;
pub(crate) mod header;
pub(crate) mod mci;

pub use bat::BlockAlloc;
pub use directory::{Directory, DirectoryEntry};
pub use header::Header;
pub use mci::MciHeader;

/// Size in bytes of a single memory-card data block.
pub const BLOCK_SIZE: usize = 8192;
/// The first five blocks of a card (header, dir, dir_backup, bat, bat_backup).
pub const MC_FST_BLOCKS: usize = 5;
/// Blocks per megabit, as defined by this format.
pub const MBIT_TO_BLOCKS: usize = 17;
/// Number of directory entries per directory block.
pub const DIRLEN: usize = 127;
/// Size in bytes of a single directory entry.
pub const DENTRY_SIZE: usize = 64;
/// Number of BAT map entries (`0xFFB`), plus the 5 system blocks they're offset by.
pub const BAT_SIZE: usize = 0xFFB + MC_FST_BLOCKS;

pub(crate) type BlockBytes = [u8; BLOCK_SIZE];

/// The whitelisted card sizes, named by their megabit capacity.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSize {
    Mb4 = 4,
    Mb8 = 8,
    Mb16 = 16,
    Mb32 = 32,
    Mb64 = 64,
    Mb128 = 128,
}

impl CardSize {
    pub(crate) fn from_mbit(mbit: u16) -> Option<Self> {
        use CardSize::*;
        Some(match mbit {
            4 => Mb4,
            8 => Mb8,
            16 => Mb16,
            32 => Mb32,
            64 => Mb64,
            128 => Mb128,
            _ => return None,
        })
    }

    pub(crate) fn mbit(self) -> u16 {
        self as u16
    }

    /// Total block count (system + data) for this size.
    pub(crate) fn total_blocks(self) -> usize {
        self.mbit() as usize * MBIT_TO_BLOCKS
    }
}
