//! Game-specific save re-signing.
//!
//! A handful of titles embed their own checksum over their save payload,
//! independent of the card's own checksums, and refuse to load a save
//! whose embedded checksum doesn't match. Copying or importing a save
//! changes nothing a player would notice, but if the copy changed the
//! save's serial-number fields (as `CopyFrom` does, to stamp the
//! destination card's own serial into the save) these per-game checksums
//! go stale and must be recomputed. `resign` is the hook `Card`'s import
//! path runs after copying save data onto a card. Both titles below are
//! matched by their save's exact filename, not by game code.

use crate::layout::{DirectoryEntry, Header, BLOCK_SIZE};
use crate::primitives::{write_u16, write_u32};

/// Dispatches to the re-signer for `entry`'s title, if any. A no-op for
/// every save this crate doesn't know how to fix up.
pub(crate) fn resign(entry: &DirectoryEntry, header: &Header, data: &mut [u8]) {
    match entry.filename_str() {
        "f_zero.dat" => fzerogx_make_save_valid(header, data),
        "PSO_SYSTEM" => pso_make_save_valid(header, data, 0x00),
        "PSO3_SYSTEM" => pso_make_save_valid(header, data, 0x10),
        _ => {}
    }
}

/// Folds the header's first 32 bytes, read as eight little-endian `u32`s,
/// into the pair of "serial numbers" F-Zero GX and PSO stamp into a save
/// so it refuses to load on a different card.
pub(crate) fn card_serial_no(header: &Header) -> (u32, u32) {
    let bytes = header.as_bytes();
    let mut words = [0u32; 8];
    for (i, word) in words.iter_mut().enumerate() {
        *word = u32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
    }
    (words[0] ^ words[2] ^ words[4] ^ words[6], words[1] ^ words[3] ^ words[5] ^ words[7])
}

const FZGX_SERIAL1_HIGH: usize = BLOCK_SIZE + 0x0066;
const FZGX_SERIAL1_LOW: usize = BLOCK_SIZE + 0x0060;
const FZGX_SERIAL2_HIGH: usize = 3 * BLOCK_SIZE + 0x1580;
const FZGX_SERIAL2_LOW: usize = BLOCK_SIZE + 0x0200;
const FZGX_CHECKSUM_START: usize = 0x02;
const FZGX_CHECKSUM_END: usize = 0x8000;
const FZGX_CHECKSUM_OFFSET: usize = 0x00;

fn fzerogx_make_save_valid(header: &Header, data: &mut [u8]) {
    if data.len() < FZGX_CHECKSUM_END {
        return;
    }
    let (serial1, serial2) = card_serial_no(header);
    write_u16(data, FZGX_SERIAL1_HIGH, (serial1 >> 16) as u16);
    write_u16(data, FZGX_SERIAL1_LOW, serial1 as u16);
    write_u16(data, FZGX_SERIAL2_HIGH, (serial2 >> 16) as u16);
    write_u16(data, FZGX_SERIAL2_LOW, serial2 as u16);

    let mut chksum: u16 = 0xFFFF;
    for byte in &data[FZGX_CHECKSUM_START..FZGX_CHECKSUM_END] {
        chksum ^= *byte as u16;
        for _ in 0..8 {
            chksum = if chksum & 1 != 0 {
                (chksum >> 1) ^ 0x8408
            } else {
                chksum >> 1
            };
        }
    }
    write_u16(data, FZGX_CHECKSUM_OFFSET, !chksum);
    log::debug!("re-signed an F-Zero GX save");
}

const PSO_SERIAL1_OFFSET: usize = BLOCK_SIZE + 0x0158;
const PSO_SERIAL2_OFFSET: usize = BLOCK_SIZE + 0x015C;
const PSO_CHECKSUM_START: usize = BLOCK_SIZE + 0x004C;
const PSO_CHECKSUM_SPAN: usize = 0x0164 - 0x004C;
const PSO_CHECKSUM_OFFSET: usize = BLOCK_SIZE + 0x0048;
const PSO_CHECKSUM_INIT: u32 = 0xDEBB_20E3;

const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut j = 0;
        while j < 8 {
            c = if c & 1 != 0 { (c >> 1) ^ 0xEDB8_8320 } else { c >> 1 };
            j += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

const PSO_CRC_TABLE: [u32; 256] = crc32_table();

/// `pso3_extra` widens the checksummed region for PSO3's larger system
/// file (`"PSO3_SYSTEM"`); it's `0` for PSO1/2's `"PSO_SYSTEM"`.
fn pso_make_save_valid(header: &Header, data: &mut [u8], pso3_extra: usize) {
    let end = PSO_CHECKSUM_START + PSO_CHECKSUM_SPAN + pso3_extra;
    if data.len() < end {
        return;
    }
    let (serial1, serial2) = card_serial_no(header);
    // Little-endian writes, reproduced as-is: the original stamps these
    // fields without converting to the save's otherwise big-endian byte
    // order (it ran on a little-endian x86 host), so a "corrected" write
    // here would desync from saves already re-signed by this library.
    data[PSO_SERIAL1_OFFSET..PSO_SERIAL1_OFFSET + 4].copy_from_slice(&serial1.to_le_bytes());
    data[PSO_SERIAL2_OFFSET..PSO_SERIAL2_OFFSET + 4].copy_from_slice(&serial2.to_le_bytes());

    let mut crc = PSO_CHECKSUM_INIT;
    for &byte in &data[PSO_CHECKSUM_START..end] {
        crc = (crc >> 8) ^ PSO_CRC_TABLE[((crc ^ byte as u32) & 0xFF) as usize];
    }
    write_u32(data, PSO_CHECKSUM_OFFSET, !crc);
    log::debug!("re-signed a PSO save");
}
