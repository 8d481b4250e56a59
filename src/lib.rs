#![allow(dead_code, unused_variables)]
#![warn(rust_2018_idioms, clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::must_use_candidate,
    clippy::unreadable_literal
)]

//! Reads, validates, mutates, and writes Nintendo GameCube memory-card
//! images: the on-disk header/directory/BAT layout in [`layout`], the
//! card itself in [`card`], single-save exchange envelopes (GCI/GCS/SAV)
//! in [`envelope`], game-specific save re-signing in [`resign`], banner
//! and icon addressing in [`banner`], and blank-card formatting in
//! [`format`].

pub mod banner;
pub mod card;
pub(crate) mod checksum;
pub mod collaborators;
pub mod envelope;
pub mod error;
pub mod format;
pub mod layout;
pub(crate) mod primitives;
pub(crate) mod resign;

pub use card::{Card, CardFileFormat, LoadOptions};
pub use collaborators::{FixedSram, FixedTime, GcTimeSource, NonInteractive, PixelDecoder, Prompter, SramSource};
pub use envelope::EnvelopeFormat;
pub use error::{Error, Result};
pub use format::FormatOptions;
pub use layout::{BlockAlloc, CardSize, Directory, DirectoryEntry, Header};
