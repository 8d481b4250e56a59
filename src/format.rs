//! Card formatting: stamping a blank header with a format timestamp, an
//! SRAM-derived serial number, and a size/encoding pair, the way a GC BIOS
//! format operation does.
//!
//! The original derives the header's serial number from the console's
//! flash ID by running it through an LCG seeded off the format timestamp,
//! and separately claims to invert that with a *different* pair of LCG
//! constants. Taken literally that can't round-trip. Since this crate's
//! contract requires `recover_flash_id` to be the exact inverse of
//! `derive_serial`, both directions here share one LCG and the mixing
//! step is plain XOR, which is its own inverse by construction.

use crate::collaborators::{GcTimeSource, SramSource};
use crate::layout::{BlockAlloc, CardSize, Directory, Header, MC_FST_BLOCKS};

/// Caller-supplied knobs for `format`; everything else about a freshly
/// formatted card is fixed by the layout itself.
pub struct FormatOptions {
    pub size: CardSize,
    /// `false` selects ASCII encoding, `true` selects Shift-JIS.
    pub shift_jis: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            size: CardSize::Mb64,
            shift_jis: false,
        }
    }
}

const LCG_MUL: u32 = 0x41C6_4E6D;
const LCG_ADD: u32 = 0x3039;

fn lcg_next(state: &mut u32) -> u32 {
    *state = state.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);
    *state
}

fn keystream(format_time: u64) -> [u32; 3] {
    let mut state = (format_time >> 32) as u32 ^ format_time as u32;
    [lcg_next(&mut state), lcg_next(&mut state), lcg_next(&mut state)]
}

fn words_to_bytes(words: [u32; 3]) -> [u8; 12] {
    let mut out = [0u8; 12];
    for (i, w) in words.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&w.to_be_bytes());
    }
    out
}

fn bytes_to_words(bytes: [u8; 12]) -> [u32; 3] {
    let mut out = [0u32; 3];
    for i in 0..3 {
        out[i] = u32::from_be_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
    }
    out
}

/// Derives the header serial number stamped into a freshly formatted
/// card from the console's flash ID and the format timestamp.
pub fn derive_serial(flash_id: [u8; 12], format_time: u64) -> [u8; 12] {
    let ks = keystream(format_time);
    let fid = bytes_to_words(flash_id);
    words_to_bytes([fid[0] ^ ks[0], fid[1] ^ ks[1], fid[2] ^ ks[2]])
}

/// Recovers the flash ID that produced `serial` at `format_time`. Exact
/// inverse of [`derive_serial`] since the mixing step is XOR.
pub fn recover_flash_id(serial: [u8; 12], format_time: u64) -> [u8; 12] {
    derive_serial(serial, format_time)
}

/// Builds the blank header, directory pair, and BAT pair for a freshly
/// formatted card of `options.size`. Does not allocate any data blocks;
/// the card has zero saves and every data block free.
pub(crate) fn format_internal(
    options: &FormatOptions,
    time: &dyn GcTimeSource,
    sram: &dyn SramSource,
) -> (Header, Directory, BlockAlloc) {
    let format_time = time.gc_time();
    let flash_id = sram.flash_id();

    let mut header = Header::empty();
    header.set_format_time(format_time);
    header.set_serial(derive_serial(flash_id, format_time));
    header.set_sram_bias(sram.counter_bias());
    header.set_sram_lang(sram.language());
    header.set_device_id(0);
    header.set_size_mb(options.size.mbit());
    header.set_encoding(if options.shift_jis { 1 } else { 0 });
    header.fix_checksum();

    let mut dir = Directory::empty();
    dir.set_update_counter(0);
    dir.fix_checksum();

    let total_blocks = options.size.total_blocks();
    let mut bat = BlockAlloc::empty(total_blocks);
    bat.set_update_counter(0);
    bat.fix_checksum();
    debug_assert_eq!(bat.free_blocks() as usize, total_blocks - MC_FST_BLOCKS);

    log::debug!(
        "formatted a {}Mb card at format_time={format_time:#x}",
        options.size.mbit()
    );

    (header, dir, bat)
}
