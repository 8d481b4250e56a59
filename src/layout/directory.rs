use crate::checksum;
use crate::primitives::{read_u16, read_u32, write_u16, write_u32};

use super::{BlockBytes, BLOCK_SIZE, DENTRY_SIZE, DIRLEN};

const GAME_CODE: usize = 0x00;
const MAKER_CODE: usize = 0x04;
const UNUSED1: usize = 0x06;
const BI_FLAGS: usize = 0x07;
const FILENAME: usize = 0x08;
const FILENAME_LEN: usize = 32;
const MOD_TIME: usize = 0x28;
const IMAGE_OFFSET: usize = 0x2C;
const ICON_FMT: usize = 0x30;
const ANIM_SPEED: usize = 0x32;
const PERMISSIONS: usize = 0x34;
const COPY_COUNTER: usize = 0x35;
const FIRST_BLOCK: usize = 0x36;
const BLOCK_COUNT: usize = 0x38;
const UNUSED2: usize = 0x3A;
const COMMENTS_ADDR: usize = 0x3C;

/// A 64-byte directory entry. An all-`0xFF` entry is "empty" (its game
/// code reads as `0xFFFF_FFFF`).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry(pub(crate) [u8; DENTRY_SIZE]);

impl DirectoryEntry {
    pub fn empty() -> Self {
        Self([0xFF; DENTRY_SIZE])
    }

    pub(crate) fn from_bytes(bytes: [u8; DENTRY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DENTRY_SIZE] {
        &self.0
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8; DENTRY_SIZE] {
        &mut self.0
    }

    pub fn is_empty(&self) -> bool {
        self.game_code() == 0xFFFF_FFFF
    }

    pub fn game_code(&self) -> u32 {
        read_u32(&self.0, GAME_CODE)
    }

    pub fn set_game_code(&mut self, value: u32) {
        write_u32(&mut self.0, GAME_CODE, value);
    }

    pub fn maker_code(&self) -> u16 {
        read_u16(&self.0, MAKER_CODE)
    }

    pub fn set_maker_code(&mut self, value: u16) {
        write_u16(&mut self.0, MAKER_CODE, value);
    }

    pub fn unused1(&self) -> u8 {
        self.0[UNUSED1]
    }

    pub fn set_unused1(&mut self, value: u8) {
        self.0[UNUSED1] = value;
    }

    /// Low 2 bits select the banner format: 0=none, 1=CI8, 2=RGB5A3.
    pub fn bi_flags(&self) -> u8 {
        self.0[BI_FLAGS]
    }

    pub fn set_bi_flags(&mut self, value: u8) {
        self.0[BI_FLAGS] = value;
    }

    pub fn filename(&self) -> [u8; FILENAME_LEN] {
        self.0[FILENAME..FILENAME + FILENAME_LEN].try_into().unwrap()
    }

    pub fn set_filename(&mut self, filename: [u8; FILENAME_LEN]) {
        self.0[FILENAME..FILENAME + FILENAME_LEN].copy_from_slice(&filename);
    }

    /// The filename, stopping at the first NUL byte.
    pub fn filename_str(&self) -> &str {
        let raw = &self.0[FILENAME..FILENAME + FILENAME_LEN];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end]).unwrap_or("")
    }

    pub fn mod_time(&self) -> u32 {
        read_u32(&self.0, MOD_TIME)
    }

    pub fn set_mod_time(&mut self, value: u32) {
        write_u32(&mut self.0, MOD_TIME, value);
    }

    /// Offset of the banner/icon pixel data within the save's data blocks;
    /// `0xFFFF_FFFF` means no image.
    pub fn image_offset(&self) -> u32 {
        read_u32(&self.0, IMAGE_OFFSET)
    }

    pub fn set_image_offset(&mut self, value: u32) {
        write_u32(&mut self.0, IMAGE_OFFSET, value);
    }

    pub fn icon_fmt(&self) -> u16 {
        read_u16(&self.0, ICON_FMT)
    }

    pub fn set_icon_fmt(&mut self, value: u16) {
        write_u16(&mut self.0, ICON_FMT, value);
    }

    pub fn anim_speed(&self) -> u16 {
        read_u16(&self.0, ANIM_SPEED)
    }

    pub fn set_anim_speed(&mut self, value: u16) {
        write_u16(&mut self.0, ANIM_SPEED, value);
    }

    pub fn permissions(&self) -> u8 {
        self.0[PERMISSIONS]
    }

    pub fn set_permissions(&mut self, value: u8) {
        self.0[PERMISSIONS] = value;
    }

    pub fn copy_counter(&self) -> u8 {
        self.0[COPY_COUNTER]
    }

    pub fn set_copy_counter(&mut self, value: u8) {
        self.0[COPY_COUNTER] = value;
    }

    pub fn first_block(&self) -> u16 {
        read_u16(&self.0, FIRST_BLOCK)
    }

    pub fn set_first_block(&mut self, value: u16) {
        write_u16(&mut self.0, FIRST_BLOCK, value);
    }

    pub fn block_count(&self) -> u16 {
        read_u16(&self.0, BLOCK_COUNT)
    }

    pub fn set_block_count(&mut self, value: u16) {
        write_u16(&mut self.0, BLOCK_COUNT, value);
    }

    pub fn unused2(&self) -> u16 {
        read_u16(&self.0, UNUSED2)
    }

    pub fn set_unused2(&mut self, value: u16) {
        write_u16(&mut self.0, UNUSED2, value);
    }

    pub fn comments_address(&self) -> u32 {
        read_u32(&self.0, COMMENTS_ADDR)
    }

    pub fn set_comments_address(&mut self, value: u32) {
        write_u32(&mut self.0, COMMENTS_ADDR, value);
    }
}

const ENTRIES: usize = 0;
const PAD: usize = DIRLEN * DENTRY_SIZE;
const UPDATE_COUNTER: usize = PAD + 4;
const CHECKSUM: usize = 0x1FFC;
const CHECKSUM_WORDS: usize = 0xFFE;

/// A directory block: 127 entries, an update counter, and a checksum pair.
/// The card stores two of these (`dir` and `dir_backup`).
#[derive(Clone)]
pub struct Directory(pub(crate) BlockBytes);

impl Directory {
    pub(crate) fn empty() -> Self {
        Self([0xFF; BLOCK_SIZE])
    }

    pub(crate) fn from_bytes(bytes: BlockBytes) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &BlockBytes {
        &self.0
    }

    pub fn entry(&self, index: usize) -> DirectoryEntry {
        let offset = ENTRIES + index * DENTRY_SIZE;
        DirectoryEntry::from_bytes(self.0[offset..offset + DENTRY_SIZE].try_into().unwrap())
    }

    pub(crate) fn set_entry(&mut self, index: usize, entry: DirectoryEntry) {
        let offset = ENTRIES + index * DENTRY_SIZE;
        self.0[offset..offset + DENTRY_SIZE].copy_from_slice(entry.as_bytes());
    }

    pub fn entries(&self) -> impl Iterator<Item = DirectoryEntry> + '_ {
        (0..DIRLEN).map(|i| self.entry(i))
    }

    pub fn update_counter(&self) -> u16 {
        read_u16(&self.0, UPDATE_COUNTER)
    }

    pub(crate) fn set_update_counter(&mut self, value: u16) {
        write_u16(&mut self.0, UPDATE_COUNTER, value);
    }

    pub(crate) fn checksum(&self) -> (u16, u16) {
        (
            read_u16(&self.0, CHECKSUM),
            read_u16(&self.0, CHECKSUM + 2),
        )
    }

    pub(crate) fn fix_checksum(&mut self) {
        let (sum, inv_sum) = checksum::compute(&self.0, CHECKSUM_WORDS);
        write_u16(&mut self.0, CHECKSUM, sum);
        write_u16(&mut self.0, CHECKSUM + 2, inv_sum);
    }

    pub(crate) fn checksum_valid(&self) -> bool {
        checksum::compute(&self.0, CHECKSUM_WORDS) == self.checksum()
    }

    /// Number of entries whose game code isn't the empty sentinel.
    pub fn num_files(&self) -> usize {
        self.entries().filter(|e| !e.is_empty()).count()
    }

    /// Maps a 0-based "present file" index to its raw directory slot, or
    /// `None` if there is no such file.
    pub fn file_index(&self, file_number: usize) -> Option<usize> {
        self.entries()
            .enumerate()
            .filter(|(_, e)| !e.is_empty())
            .nth(file_number)
            .map(|(i, _)| i)
    }

    /// Linear scan for a slot matching `entry`'s game code and exact
    /// filename bytes. Returns `DIRLEN` (not `Option`) when absent, to
    /// mirror the original "slot index, DIRLEN means absent" convention
    /// that callers already branch on.
    pub fn title_present(&self, entry: &DirectoryEntry) -> usize {
        for (i, e) in self.entries().enumerate() {
            if e.game_code() == entry.game_code() && e.filename() == entry.filename() {
                return i;
            }
        }
        DIRLEN
    }

    /// First slot with an empty (all-`0xFF`) entry.
    pub(crate) fn first_free_slot(&self) -> Option<usize> {
        self.entries().position(|e| e.is_empty())
    }
}
