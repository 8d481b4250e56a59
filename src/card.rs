//! The memory card itself: the header plus the dual directory and BAT
//! copies, glued together by the swap-on-write mutation protocol every
//! write to this format uses.
//!
//! Every mutating operation here follows the same shape: clone the
//! current directory or BAT, mutate the clone, bump its update counter,
//! fix its checksum, then [`Slots::commit`] it into the *other* physical
//! slot and flip which slot is "current". The two on-disk copies are
//! never both stale at once, so a crash mid-write leaves the previous
//! generation intact in whichever slot wasn't being written.

use crate::collaborators::{GcTimeSource, Prompter, SramSource};
use crate::error::{Error, Result};
use crate::format::{self, FormatOptions};
use crate::layout::bat::END_OF_CHAIN;
use crate::layout::mci::{MciHeader, MCI_HDR_SIZE};
use crate::layout::{BlockAlloc, BlockBytes, CardSize, Directory, DirectoryEntry, Header, BLOCK_SIZE, MC_FST_BLOCKS};
use crate::resign;

/// Which of the two card-file extensions spec.md §4.2 step 2 recognizes a
/// card image by: `.raw`/`.gcp` are a bare image, `.mci` carries a
/// third-party wrapper ahead of it. Mirrors [`crate::envelope::EnvelopeFormat::from_extension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFileFormat {
    Raw,
    Mci,
}

impl CardFileFormat {
    /// Picks a format from a file's extension (case-insensitive); `None`
    /// for any extension besides `.raw`, `.gcp`, and `.mci`.
    pub fn from_extension(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "mci" => Some(Self::Mci),
            "raw" | "gcp" => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Caller-supplied knobs for [`Card::open`]'s file-absent path (spec.md
/// §4.2 step 1): whether to skip the create/encoding prompts outright, and
/// what to format if so.
pub struct LoadOptions {
    /// Skips both the "create a new card?" and "ascii or Shift-JIS?"
    /// prompts, answering yes/`shift_jis` without asking.
    pub force_creation: bool,
    pub shift_jis: bool,
    pub size: CardSize,
}

/// Two physical slots for a structure the format keeps dual copies of,
/// tracking which slot currently holds the newer generation.
struct Slots<T> {
    a: T,
    b: T,
    current_is_a: bool,
}

impl<T> Slots<T> {
    fn current(&self) -> &T {
        if self.current_is_a { &self.a } else { &self.b }
    }

    /// Writes `next` into the slot that *isn't* current, then makes that
    /// the new current slot.
    fn commit(&mut self, next: T) {
        if self.current_is_a {
            self.b = next;
        } else {
            self.a = next;
        }
        self.current_is_a = !self.current_is_a;
    }
}

/// A loaded (or freshly formatted) GameCube memory-card image.
pub struct Card {
    mci_header: Option<MciHeader>,
    header: Header,
    dir: Slots<Directory>,
    bat: Slots<BlockAlloc>,
    data: Vec<BlockBytes>,
    size: CardSize,
}

fn select_slots<T>(
    a: T,
    a_valid: bool,
    a_counter: u16,
    b: T,
    b_valid: bool,
    b_counter: u16,
) -> Result<Slots<T>> {
    let current_is_a = match (a_valid, b_valid) {
        (true, true) => a_counter >= b_counter,
        (true, false) => true,
        (false, true) => false,
        (false, false) => return Err(Error::NoMemCard),
    };
    Ok(Slots { a, b, current_is_a })
}

impl Card {
    /// Opens a card image if one exists, or asks `prompter` whether to
    /// format a new one when it doesn't (spec.md §4.2 step 1). `bytes` is
    /// `None` to model a missing backing file; pass `Some` bytes straight
    /// through to [`Card::load`].
    pub fn open(
        bytes: Option<&[u8]>,
        format: CardFileFormat,
        options: &LoadOptions,
        prompter: &dyn Prompter,
        time: &dyn GcTimeSource,
        sram: &dyn SramSource,
    ) -> Result<Self> {
        let Some(bytes) = bytes else {
            let blocks = options.size.total_blocks() - MC_FST_BLOCKS;
            if !options.force_creation
                && !prompter.confirm(&format!("card image does not exist.\nCreate a new {blocks}-block Memcard?"))
            {
                return Err(Error::NoMemCard);
            }
            let shift_jis = if options.force_creation {
                options.shift_jis
            } else {
                !prompter.confirm("Format as ascii (NTSC\\PAL)?\nChoose no for sjis (NTSC-J)")
            };
            let format_options = FormatOptions { size: options.size, shift_jis };
            return Ok(Self::format(&format_options, time, sram));
        };
        Self::load(bytes, format)
    }

    /// Parses a raw card image in `format`, whose MCI wrapper (if any) is
    /// determined by the caller's file extension, not by sniffing the
    /// bytes. Recovers from a single corrupted directory or BAT copy by
    /// falling back to its twin; the source treats the two recoveries as
    /// coupled, so a bad directory also forces the BAT onto its backup
    /// (and vice versa), even when that structure's own checksum was
    /// fine. Fails only if a pair's *both* checksums are bad, or the
    /// header itself is.
    pub fn load(bytes: &[u8], format: CardFileFormat) -> Result<Self> {
        let (mci_header, body) = match format {
            CardFileFormat::Mci => {
                if bytes.len() < MCI_HDR_SIZE {
                    return Err(Error::LengthFail);
                }
                let raw: [u8; MCI_HDR_SIZE] = bytes[..MCI_HDR_SIZE].try_into().unwrap();
                let body = &bytes[MCI_HDR_SIZE..];
                if body.len() % BLOCK_SIZE != 0 {
                    return Err(Error::LengthFail);
                }
                let mci = MciHeader::from_bytes(raw);
                if !mci.is_valid_for((body.len() / BLOCK_SIZE) as u16) {
                    return Err(Error::LengthFail);
                }
                (Some(mci), body)
            }
            CardFileFormat::Raw => (None, bytes),
        };

        if body.len() < MC_FST_BLOCKS * BLOCK_SIZE {
            return Err(Error::LengthFail);
        }

        let block = |i: usize| -> Result<BlockBytes> {
            let start = i * BLOCK_SIZE;
            body[start..start + BLOCK_SIZE]
                .try_into()
                .map_err(|_| Error::LengthFail)
        };

        let header = Header::from_bytes(block(0)?);
        if !header.checksum_valid() {
            return Err(Error::NoMemCard);
        }
        let size = CardSize::from_mbit(header.size_mb()).ok_or(Error::NoMemCard)?;
        let total_blocks = size.total_blocks();
        if body.len() < total_blocks * BLOCK_SIZE {
            return Err(Error::LengthFail);
        }

        let mut dir_a = Directory::from_bytes(block(1)?);
        let dir_b = Directory::from_bytes(block(2)?);
        let mut bat_a = BlockAlloc::from_bytes(block(3)?);
        let bat_b = BlockAlloc::from_bytes(block(4)?);

        if !dir_a.checksum_valid() {
            if !dir_b.checksum_valid() {
                return Err(Error::NoMemCard);
            }
            log::warn!("primary directory checksum invalid, recovering directory and BAT from backup");
            dir_a = dir_b.clone();
            bat_a = bat_b.clone();
        }

        if !bat_a.checksum_valid() {
            if !bat_b.checksum_valid() {
                return Err(Error::NoMemCard);
            }
            log::warn!("primary BAT checksum invalid, recovering directory and BAT from backup");
            dir_a = dir_b.clone();
            bat_a = bat_b.clone();
        }

        let dir_a_valid = dir_a.checksum_valid();
        let dir_a_counter = dir_a.update_counter();
        let dir_b_valid = dir_b.checksum_valid();
        let dir_b_counter = dir_b.update_counter();
        let dir = select_slots(dir_a, dir_a_valid, dir_a_counter, dir_b, dir_b_valid, dir_b_counter)?;

        let bat_a_valid = bat_a.checksum_valid();
        let bat_a_counter = bat_a.update_counter();
        let bat_b_valid = bat_b.checksum_valid();
        let bat_b_counter = bat_b.update_counter();
        let bat = select_slots(bat_a, bat_a_valid, bat_a_counter, bat_b, bat_b_valid, bat_b_counter)?;

        let data = (MC_FST_BLOCKS..total_blocks)
            .map(block)
            .collect::<Result<Vec<_>>>()?;

        log::debug!("loaded a {}Mb card ({} data blocks)", size.mbit(), data.len());

        Ok(Self { mci_header, header, dir, bat, data, size })
    }

    /// Builds a freshly formatted, empty card.
    pub fn format(options: &FormatOptions, time: &dyn GcTimeSource, sram: &dyn SramSource) -> Self {
        let (header, dir, bat) = format::format_internal(options, time, sram);
        let total_blocks = options.size.total_blocks();
        let data = vec![[0u8; BLOCK_SIZE]; total_blocks - MC_FST_BLOCKS];

        let mut dir_backup = dir.clone();
        dir_backup.set_update_counter(1);
        dir_backup.fix_checksum();
        let mut bat_backup = bat.clone();
        bat_backup.set_update_counter(1);
        bat_backup.fix_checksum();

        Self {
            mci_header: None,
            header,
            dir: Slots { a: dir, b: dir_backup, current_is_a: true },
            bat: Slots { a: bat, b: bat_backup, current_is_a: true },
            data,
            size: options.size,
        }
    }

    /// Serializes this card back to bytes, including its MCI wrapper if
    /// it was loaded with one. `save_as` (dropping the wrapper) is just
    /// `card.mci_header = None` before calling this.
    pub fn save(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MCI_HDR_SIZE + self.size.total_blocks() * BLOCK_SIZE);
        if let Some(mci) = &self.mci_header {
            out.extend_from_slice(mci.as_bytes());
        }
        out.extend_from_slice(self.header.as_bytes());
        out.extend_from_slice(self.dir.a.as_bytes());
        out.extend_from_slice(self.dir.b.as_bytes());
        out.extend_from_slice(self.bat.a.as_bytes());
        out.extend_from_slice(self.bat.b.as_bytes());
        for block in &self.data {
            out.extend_from_slice(block);
        }
        out
    }

    pub fn drop_mci_wrapper(&mut self) {
        self.mci_header = None;
    }

    pub fn size(&self) -> CardSize {
        self.size
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Overwrites the header block (`ReplaceHDR`), e.g. to graft a dump's
    /// serial/SRAM fields onto a reformatted card. Rejects outright if a
    /// card already exists at the destination the caller intends to save
    /// to. On success, `candidate`'s `SizeMb` is overwritten with this
    /// card's own size and its checksum recomputed before it's committed;
    /// the previous header is returned so a caller whose own save to the
    /// destination then fails can hand it back to [`Card::restore_header`].
    pub fn replace_header(&mut self, mut candidate: Header, destination_exists: bool) -> Result<Header> {
        if destination_exists {
            return Err(Error::WriteFail);
        }
        let previous = self.header.clone();
        candidate.set_size_mb(self.size.mbit());
        candidate.fix_checksum();
        self.header = candidate;
        Ok(previous)
    }

    /// Rolls back to a header returned by a [`Card::replace_header`] whose
    /// subsequent save-as failed.
    pub fn restore_header(&mut self, previous: Header) {
        self.header = previous;
    }

    /// A standalone copy of the header block (`ExportHDR`).
    pub fn export_header(&self) -> Header {
        self.header.clone()
    }

    pub fn directory(&self) -> &Directory {
        self.dir.current()
    }

    pub fn bat(&self) -> &BlockAlloc {
        self.bat.current()
    }

    pub fn num_files(&self) -> usize {
        self.directory().num_files()
    }

    pub fn file_index(&self, file_number: usize) -> Option<usize> {
        self.directory().file_index(file_number)
    }

    pub fn get_dentry(&self, index: usize) -> Option<DirectoryEntry> {
        if index >= crate::layout::DIRLEN {
            return None;
        }
        let entry = self.directory().entry(index);
        if entry.is_empty() { None } else { Some(entry) }
    }

    pub fn free_blocks(&self) -> u16 {
        self.bat.current().free_blocks()
    }

    pub fn title_present(&self, entry: &DirectoryEntry) -> Option<usize> {
        let slot = self.directory().title_present(entry);
        if slot == crate::layout::DIRLEN { None } else { Some(slot) }
    }

    /// The conventional `GAMECODE-MAKERCODE-filename` export name used
    /// when dumping a save to a standalone GCI file.
    pub fn gci_file_name(&self, index: usize) -> Result<String> {
        let entry = self.get_dentry(index).ok_or(Error::Fail)?;
        let game_code = entry.game_code().to_be_bytes();
        let maker_code = entry.maker_code().to_be_bytes();
        Ok(format!(
            "{}-{}-{}.gci",
            String::from_utf8_lossy(&game_code),
            String::from_utf8_lossy(&maker_code),
            entry.filename_str(),
        ))
    }

    /// Reads a save's full block-chain contents, in chain order.
    pub fn get_save_data(&self, index: usize) -> Result<Vec<u8>> {
        let entry = self.get_dentry(index).ok_or(Error::Fail)?;
        let bat = self.bat.current();
        let mut out = Vec::with_capacity(entry.block_count() as usize * BLOCK_SIZE);
        let mut block = entry.first_block();
        let mut remaining = entry.block_count();
        while remaining > 0 {
            if block < MC_FST_BLOCKS as u16 {
                return Err(Error::Fail);
            }
            let data_index = block as usize - MC_FST_BLOCKS;
            let data_block = self.data.get(data_index).ok_or(Error::Fail)?;
            out.extend_from_slice(data_block);
            remaining -= 1;
            if remaining == 0 {
                break;
            }
            block = bat.get_next_block(block);
            if block == 0 || block == END_OF_CHAIN {
                return Err(Error::Fail);
            }
        }
        Ok(out)
    }

    /// Imports a save, allocating blocks, linking its BAT chain, writing
    /// its directory entry, and re-signing it for titles that embed
    /// their own save checksum.
    pub fn import_file(&mut self, mut entry: DirectoryEntry, data: &[u8]) -> Result<()> {
        let block_count = entry.block_count();
        if block_count == 0 {
            return Err(Error::InvalidFileSize);
        }
        let slot = self
            .dir
            .current()
            .first_free_slot()
            .ok_or(Error::OutOfDirEntries)?;
        if self.free_blocks() < block_count {
            return Err(Error::OutOfBlocks);
        }
        if self.title_present(&entry).is_some() {
            return Err(Error::TitlePresent);
        }

        let mut padded = data.to_vec();
        padded.resize(block_count as usize * BLOCK_SIZE, 0);
        resign::resign(&entry, &self.header, &mut padded);

        let mut bat_next = self.bat.current().clone();
        let total_blocks = self.size.total_blocks() as u16;
        let mut allocated = Vec::with_capacity(block_count as usize);
        let mut cursor = bat_next.last_allocated();
        for _ in 0..block_count {
            let block = bat_next
                .next_free_block(total_blocks, cursor)
                .ok_or(Error::OutOfBlocks)?;
            bat_next.set_next_block(block, END_OF_CHAIN);
            if let Some(&prev) = allocated.last() {
                bat_next.set_next_block(prev, block);
            }
            allocated.push(block);
            bat_next.set_free_blocks(bat_next.free_blocks() - 1);
            cursor = block;
        }
        bat_next.set_last_allocated(*allocated.last().unwrap());
        bat_next.set_update_counter(bat_next.update_counter().wrapping_add(1));
        bat_next.fix_checksum();

        for (chunk, &block) in padded.chunks(BLOCK_SIZE).zip(&allocated) {
            let data_index = block as usize - MC_FST_BLOCKS;
            self.data[data_index].copy_from_slice(chunk);
        }

        entry.set_first_block(allocated[0]);
        entry.set_copy_counter(entry.copy_counter() + 1);
        let mut dir_next = self.dir.current().clone();
        dir_next.set_entry(slot, entry);
        dir_next.set_update_counter(dir_next.update_counter().wrapping_add(1));
        dir_next.fix_checksum();

        self.bat.commit(bat_next);
        self.dir.commit(dir_next);
        log::debug!("imported a save into directory slot {slot} ({block_count} blocks)");
        Ok(())
    }

    /// Removes a save, freeing its block chain and clearing its
    /// directory entry.
    pub fn remove_file(&mut self, index: usize) -> Result<()> {
        let entry = self.get_dentry(index).ok_or(Error::DeleteFail)?;

        let mut bat_next = self.bat.current().clone();
        if !bat_next.clear_blocks(entry.first_block(), entry.block_count()) {
            return Err(Error::DeleteFail);
        }
        bat_next.set_update_counter(bat_next.update_counter().wrapping_add(1));
        bat_next.fix_checksum();

        let mut dir_next = self.dir.current().clone();
        dir_next.set_entry(index, DirectoryEntry::empty());
        dir_next.set_update_counter(dir_next.update_counter().wrapping_add(1));
        dir_next.fix_checksum();

        self.bat.commit(bat_next);
        self.dir.commit(dir_next);
        Ok(())
    }

    /// Copies a save from `src` onto `self`, re-signing it for this
    /// card's own serial number where the title requires it.
    pub fn copy_from(&mut self, src: &Card, src_index: usize) -> Result<()> {
        let entry = src.get_dentry(src_index).ok_or(Error::Fail)?;
        let data = src.get_save_data(src_index)?;
        self.import_file(entry, &data)
    }

    /// Grows a card to `new_size`, zero-extending its new data blocks.
    /// Shrinking isn't supported: a smaller card might not have room for
    /// the existing saves' block chains.
    pub fn change_memory_card_size(&mut self, new_size: CardSize) -> Result<()> {
        if new_size.mbit() < self.size.mbit() {
            return Err(Error::InvalidFileSize);
        }
        if new_size.mbit() == self.size.mbit() {
            return Ok(());
        }
        let added = new_size.total_blocks() - self.size.total_blocks();
        self.data.resize(self.data.len() + added, [0u8; BLOCK_SIZE]);

        let added_free = added as u16;
        for bat in [&mut self.bat.a, &mut self.bat.b] {
            bat.set_free_blocks(bat.free_blocks() + added_free);
            bat.fix_checksum();
        }
        self.header.set_size_mb(new_size.mbit());
        self.header.fix_checksum();
        self.size = new_size;
        log::debug!("resized card from {:?} to {:?}", self.size, new_size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FixedSram, FixedTime};

    fn formatted(size: CardSize) -> Card {
        let options = FormatOptions { size, shift_jis: false };
        let time = FixedTime(0x1234_5678_9ABC_DEF0);
        let sram = FixedSram { flash_id: [1; 12], counter_bias: 0, language: 0 };
        Card::format(&options, &time, &sram)
    }

    fn sample_entry(game_code: u32, block_count: u16) -> DirectoryEntry {
        let mut entry = DirectoryEntry::empty();
        entry.set_game_code(game_code);
        let mut filename = [0u8; 32];
        filename[..4].copy_from_slice(b"demo");
        entry.set_filename(filename);
        entry.set_block_count(block_count);
        entry
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let card = formatted(CardSize::Mb4);
        let bytes = card.save();
        let reloaded = Card::load(&bytes, CardFileFormat::Raw).expect("a freshly formatted card reloads");
        assert_eq!(reloaded.size(), CardSize::Mb4);
        assert_eq!(reloaded.num_files(), 0);
    }

    #[test]
    fn mci_format_loads_through_its_wrapper() {
        let card = formatted(CardSize::Mb4);
        let body = card.save();
        let total_blocks = CardSize::Mb4.total_blocks() as u16;
        let mci = MciHeader::build(total_blocks);
        let mut bytes = mci.as_bytes().to_vec();
        bytes.extend_from_slice(&body);

        let reloaded = Card::load(&bytes, CardFileFormat::Mci).expect("a well-formed MCI wrapper loads");
        assert_eq!(reloaded.size(), CardSize::Mb4);
    }

    #[test]
    fn raw_format_rejects_bytes_with_an_mci_wrapper_glued_on() {
        let card = formatted(CardSize::Mb4);
        let body = card.save();
        let mci = MciHeader::build(CardSize::Mb4.total_blocks() as u16);
        let mut bytes = mci.as_bytes().to_vec();
        bytes.extend_from_slice(&body);

        // Loaded as Raw, the wrapper bytes are mistaken for the header
        // block, whose checksum then doesn't validate.
        let err = Card::load(&bytes, CardFileFormat::Raw).unwrap_err();
        assert!(matches!(err, Error::NoMemCard));
    }

    #[test]
    fn corrupting_the_primary_directory_also_recovers_the_bat_from_backup() {
        let card = formatted(CardSize::Mb4);
        let mut bytes = card.save();
        // Block 1 is the primary directory; flip a byte inside its
        // checksummed region (everything but the trailing checksum pair).
        bytes[BLOCK_SIZE] ^= 0xFF;

        let reloaded = Card::load(&bytes, CardFileFormat::Raw).expect("recovers from the backup pair");
        assert_eq!(reloaded.dir.a.as_bytes(), reloaded.dir.b.as_bytes());
        assert_eq!(reloaded.bat.a.as_bytes(), reloaded.bat.b.as_bytes());
    }

    #[test]
    fn import_then_remove_round_trips_free_blocks() {
        let mut card = formatted(CardSize::Mb4);
        let before = card.free_blocks();
        let entry = sample_entry(0x4745_3031, 2);
        let data = vec![0xABu8; BLOCK_SIZE * 2];
        card.import_file(entry, &data).unwrap();
        assert_eq!(card.free_blocks(), before - 2);
        assert_eq!(card.num_files(), 1);

        let saved = card.get_save_data(card.file_index(0).unwrap()).unwrap();
        assert_eq!(saved, data);

        card.remove_file(card.file_index(0).unwrap()).unwrap();
        assert_eq!(card.free_blocks(), before);
        assert_eq!(card.num_files(), 0);
    }

    #[test]
    fn import_rejects_duplicate_titles() {
        let mut card = formatted(CardSize::Mb4);
        let entry = sample_entry(0x4745_3031, 1);
        card.import_file(entry, &[0u8; BLOCK_SIZE]).unwrap();
        let err = card.import_file(entry, &[0u8; BLOCK_SIZE]).unwrap_err();
        assert!(matches!(err, Error::TitlePresent));
    }

    #[test]
    fn import_fails_when_out_of_blocks() {
        let mut card = formatted(CardSize::Mb4);
        let total_free = card.free_blocks();
        let entry = sample_entry(0x4745_3031, total_free + 1);
        let data = vec![0u8; (total_free as usize + 1) * BLOCK_SIZE];
        let err = card.import_file(entry, &data).unwrap_err();
        assert!(matches!(err, Error::OutOfBlocks));
    }

    #[test]
    fn resize_zero_extends_new_blocks_and_keeps_existing_saves() {
        let mut card = formatted(CardSize::Mb4);
        let entry = sample_entry(0x4745_3031, 1);
        card.import_file(entry, &[0x42u8; BLOCK_SIZE]).unwrap();
        let before_free = card.free_blocks();

        card.change_memory_card_size(CardSize::Mb8).unwrap();
        assert_eq!(card.size(), CardSize::Mb8);
        assert_eq!(card.num_files(), 1);
        assert_eq!(
            card.free_blocks(),
            before_free + (CardSize::Mb8.total_blocks() - CardSize::Mb4.total_blocks()) as u16
        );

        let saved = card.get_save_data(card.file_index(0).unwrap()).unwrap();
        assert_eq!(saved, vec![0x42u8; BLOCK_SIZE]);
    }

    #[test]
    fn shrinking_is_rejected() {
        let mut card = formatted(CardSize::Mb8);
        assert!(card.change_memory_card_size(CardSize::Mb4).is_err());
    }

    #[test]
    fn copy_from_duplicates_a_save_onto_another_card() {
        let mut src = formatted(CardSize::Mb4);
        let entry = sample_entry(0x4745_3031, 1);
        src.import_file(entry, &[0x11u8; BLOCK_SIZE]).unwrap();

        let mut dst = formatted(CardSize::Mb4);
        dst.copy_from(&src, src.file_index(0).unwrap()).unwrap();
        assert_eq!(dst.num_files(), 1);
    }

    #[test]
    fn import_reports_out_of_dir_entries_over_title_present_when_both_apply() {
        let mut card = formatted(CardSize::Mb128);
        for slot in 0..crate::layout::DIRLEN {
            let mut entry = sample_entry(0x1000_0000 + slot as u32, 1);
            let mut filename = [0u8; 32];
            let name = format!("save{slot}");
            filename[..name.len()].copy_from_slice(name.as_bytes());
            entry.set_filename(filename);
            card.import_file(entry, &[0u8; BLOCK_SIZE]).unwrap();
        }
        // The directory is now full. A duplicate of an already-present
        // title must still report OutOfDirEntries, not TitlePresent.
        let entry = card.get_dentry(card.file_index(0).unwrap()).unwrap();
        let err = card.import_file(entry, &[0u8; BLOCK_SIZE]).unwrap_err();
        assert!(matches!(err, Error::OutOfDirEntries));
    }

    #[test]
    fn import_increments_the_entrys_copy_counter() {
        let mut card = formatted(CardSize::Mb4);
        let mut entry = sample_entry(0x4745_3031, 1);
        entry.set_copy_counter(3);
        card.import_file(entry, &[0u8; BLOCK_SIZE]).unwrap();

        let stored = card.get_dentry(card.file_index(0).unwrap()).unwrap();
        assert_eq!(stored.copy_counter(), 4);
    }

    #[test]
    fn remove_file_fails_without_mutating_on_a_malformed_chain() {
        let mut card = formatted(CardSize::Mb4);
        let entry = sample_entry(0x4745_3031, 2);
        card.import_file(entry, &[0u8; BLOCK_SIZE * 2]).unwrap();

        let index = card.file_index(0).unwrap();
        let first_block = card.get_dentry(index).unwrap().first_block();
        // Corrupt the chain with a mid-chain zero instead of a proper
        // END_OF_CHAIN terminator.
        let mut bat_next = card.bat.current().clone();
        bat_next.set_next_block(first_block, 0);
        card.bat.commit(bat_next);

        let before = card.free_blocks();
        let err = card.remove_file(index).unwrap_err();
        assert!(matches!(err, Error::DeleteFail));
        assert_eq!(card.free_blocks(), before);
        assert_eq!(card.num_files(), 1);
    }

    #[test]
    fn replace_header_rejects_an_existing_destination() {
        let mut card = formatted(CardSize::Mb4);
        let candidate = card.export_header();
        let err = card.replace_header(candidate, true).unwrap_err();
        assert!(matches!(err, Error::WriteFail));
    }

    #[test]
    fn replace_header_stamps_this_cards_size_and_can_be_rolled_back() {
        let mut card = formatted(CardSize::Mb4);
        let previous = card.export_header();

        let mut candidate = Header::empty();
        candidate.set_size_mb(CardSize::Mb128.mbit());
        let rolled_back = card.replace_header(candidate, false).unwrap();
        assert_eq!(rolled_back.as_bytes(), previous.as_bytes());
        assert_eq!(card.header().size_mb(), CardSize::Mb4.mbit());

        card.restore_header(rolled_back);
        assert_eq!(card.header().as_bytes(), previous.as_bytes());
    }

    struct AlwaysDeclines;
    impl crate::collaborators::Prompter for AlwaysDeclines {
        fn confirm(&self, _message: &str) -> bool {
            false
        }
        fn alert(&self, _message: &str) {}
    }

    #[test]
    fn open_declines_to_create_when_the_prompter_refuses() {
        let time = FixedTime(0);
        let sram = FixedSram { flash_id: [0; 12], counter_bias: 0, language: 0 };
        let options = LoadOptions { force_creation: false, shift_jis: false, size: CardSize::Mb4 };
        let err = Card::open(None, CardFileFormat::Raw, &options, &AlwaysDeclines, &time, &sram).unwrap_err();
        assert!(matches!(err, Error::NoMemCard));
    }

    #[test]
    fn open_formats_a_new_card_when_forced() {
        let time = FixedTime(0);
        let sram = FixedSram { flash_id: [0; 12], counter_bias: 0, language: 0 };
        let options = LoadOptions { force_creation: true, shift_jis: false, size: CardSize::Mb4 };
        let card = Card::open(None, CardFileFormat::Raw, &options, &AlwaysDeclines, &time, &sram).unwrap();
        assert_eq!(card.size(), CardSize::Mb4);
        assert_eq!(card.num_files(), 0);
    }

    #[test]
    fn open_loads_existing_bytes_without_asking() {
        let card = formatted(CardSize::Mb4);
        let bytes = card.save();
        let time = FixedTime(0);
        let sram = FixedSram { flash_id: [0; 12], counter_bias: 0, language: 0 };
        let options = LoadOptions { force_creation: false, shift_jis: false, size: CardSize::Mb4 };
        let reloaded = Card::open(Some(&bytes), CardFileFormat::Raw, &options, &AlwaysDeclines, &time, &sram).unwrap();
        assert_eq!(reloaded.num_files(), 0);
    }
}
