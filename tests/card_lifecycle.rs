use eyre::Result;
use lazy_static::lazy_static;

use gcmemcard::card::{Card, CardFileFormat};
use gcmemcard::collaborators::{FixedSram, FixedTime};
use gcmemcard::envelope::{self, EnvelopeFormat};
use gcmemcard::format::FormatOptions;
use gcmemcard::layout::{CardSize, DirectoryEntry};

lazy_static! {
    static ref BLANK_64MB: Vec<u8> = {
        let options = FormatOptions { size: CardSize::Mb64, shift_jis: false };
        let time = FixedTime(0x0102_0304_0506_0708);
        let sram = FixedSram { flash_id: [0x42; 12], counter_bias: 1, language: 0 };
        Card::format(&options, &time, &sram).save()
    };
}

fn sample_entry() -> DirectoryEntry {
    let mut entry = DirectoryEntry::empty();
    entry.set_game_code(0x4745_3031);
    entry.set_maker_code(0x3031);
    let mut filename = [0u8; 32];
    filename[..9].copy_from_slice(b"save-data");
    entry.set_filename(filename);
    entry.set_block_count(1);
    entry
}

#[test]
fn a_freshly_formatted_card_round_trips_through_an_empty_save_cycle() -> Result<()> {
    let mut card = Card::load(&BLANK_64MB, CardFileFormat::Raw)?;
    assert_eq!(card.num_files(), 0);

    let free_before = card.free_blocks();
    card.import_file(sample_entry(), &[0x7Eu8; 8192])?;
    assert_eq!(card.num_files(), 1);
    assert_eq!(card.free_blocks(), free_before - 1);

    let bytes = card.save();
    let reloaded = Card::load(&bytes, CardFileFormat::Raw)?;
    assert_eq!(reloaded.num_files(), 1);
    assert_eq!(reloaded.get_save_data(reloaded.file_index(0).unwrap())?, vec![0x7Eu8; 8192]);

    Ok(())
}

#[test]
fn gci_export_and_import_survives_the_envelope() -> Result<()> {
    let mut card = Card::load(&BLANK_64MB, CardFileFormat::Raw)?;
    card.import_file(sample_entry(), &[0x11u8; 8192])?;

    let index = card.file_index(0).unwrap();
    let entry = card.get_dentry(index).unwrap();
    let data = card.get_save_data(index)?;
    let gci = envelope::export_file(&entry, &data, EnvelopeFormat::Gci);

    let (parsed_entry, parsed_data) = envelope::import_file(&gci, EnvelopeFormat::Gci)?;
    assert_eq!(parsed_entry.filename_str(), entry.filename_str());
    assert_eq!(parsed_data, data);

    Ok(())
}

#[test]
fn removing_a_save_frees_its_directory_slot_and_blocks() -> Result<()> {
    let mut card = Card::load(&BLANK_64MB, CardFileFormat::Raw)?;
    card.import_file(sample_entry(), &[0u8; 8192])?;
    let free_after_import = card.free_blocks();

    let index = card.file_index(0).unwrap();
    card.remove_file(index)?;
    assert_eq!(card.num_files(), 0);
    assert_eq!(card.free_blocks(), free_after_import + 1);

    Ok(())
}
