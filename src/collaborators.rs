//! External collaborators (spec.md §6): the interactive UI, time/SRAM
//! sources, and generic pixel decoders this crate is handed rather than
//! owning. Keeping these as traits lets a caller wire up a real UI, a
//! real GC time source, or a real CI8/RGB5A3 decoder without this crate
//! knowing anything about any of them.

/// Confirmation prompts and alerts `Card::load`/`Card::format` raise when
/// asked to create or overwrite a card. A GUI or CLI driver implements
/// this; this crate never touches a terminal or a window itself.
pub trait Prompter {
    /// Ask a yes/no question; `true` means proceed.
    fn confirm(&self, message: &str) -> bool;
    /// Report a non-fatal message.
    fn alert(&self, message: &str);
}

/// A `Prompter` for non-interactive callers: never creates a card on the
/// caller's behalf, and routes alerts to the log instead of a UI.
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn confirm(&self, message: &str) -> bool {
        log::debug!("NonInteractive prompter declined: {message}");
        false
    }

    fn alert(&self, message: &str) {
        log::warn!("{message}");
    }
}

/// Supplies the 64-bit GC time used to seed a freshly formatted card's
/// `formatTime` field and its serial-number LCG.
pub trait GcTimeSource {
    fn gc_time(&self) -> u64;
}

/// Supplies the flash-ID and SRAM bias/language fields `Format` stamps
/// into a blank header.
pub trait SramSource {
    /// The 12-byte flash ID used to derive the header's serial number.
    fn flash_id(&self) -> [u8; 12];
    fn counter_bias(&self) -> u32;
    fn language(&self) -> u32;
}

/// Fixed sources for deterministic formatting (tests, or a caller that
/// wants reproducible output rather than a freshly-seeded card).
pub struct FixedSram {
    pub flash_id: [u8; 12],
    pub counter_bias: u32,
    pub language: u32,
}

impl SramSource for FixedSram {
    fn flash_id(&self) -> [u8; 12] {
        self.flash_id
    }

    fn counter_bias(&self) -> u32 {
        self.counter_bias
    }

    fn language(&self) -> u32 {
        self.language
    }
}

pub struct FixedTime(pub u64);

impl GcTimeSource for FixedTime {
    fn gc_time(&self) -> u64 {
        self.0
    }
}

/// The generic CI8/RGB5A3 pixel decoders banner/icon decoding is driven
/// by. Their pixel math is explicitly out of scope for this crate; it
/// only computes *where* to hand them data.
pub trait PixelDecoder {
    /// Decodes an 8-bit color-indexed image with a 256-entry RGB5A3-ish
    /// `u16` palette into `width * height` RGBA8 pixels.
    fn decode_ci8(&self, dst_rgba8: &mut [u8], src_idx: &[u8], palette: &[u16], width: u32, height: u32);
    /// Decodes an RGB5A3 image into `width * height` RGBA8 pixels.
    fn decode_rgb5a3(&self, dst_rgba8: &mut [u8], src: &[u16], width: u32, height: u32);
}
