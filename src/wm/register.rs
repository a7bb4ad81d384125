//! Register frames: one 4 KiB frame per register, the value sitting at
//! the tail-half TSS offset for `ESP` (§3, §4.3).

use crate::wm::constants::{REG_CONST_ONE_PAGE, REG_DISCARD_PAGE, REG_R0_PAGE, WM_REG_CONST_ONE, WM_REG_DISCARD};
use crate::wm::frame::page_words_mut;

/// Fixed selector words written into every register frame's tail
/// (`ES=SS=DS=FS=GS=0x10`, `CS=0x08`, `LDT=0`), at tail-relative word
/// indices 6..12 (§3).
const SELECTOR_WORDS: [u32; 7] = [0x10, 0x08, 0x10, 0x10, 0x10, 0x10, 0x00];

/// Zeroes `page` and writes `value << 2` at word index 2 (TSS `ESP`
/// offset 56), plus the fixed segment-selector tail words. Used for both
/// user/constant registers and the two special register pages.
///
/// # Safety
/// `page` must be an allocated program page not concurrently aliased.
pub unsafe fn write_register_page(page: u32, value: u32) {
    let words = page_words_mut(page);
    for w in words.iter_mut() {
        *w = 0;
    }
    words[2] = value << 2;
    words[6..13].copy_from_slice(&SELECTOR_WORDS);
}

/// Reads back the value stored at word index 2 of `page`.
///
/// # Safety
/// `page` must be an allocated program page.
pub unsafe fn read_register_page(page: u32) -> u32 {
    let words = page_words_mut(page);
    words[2] >> 2
}

/// Maps a user register number or special sentinel to its program page.
pub fn reg_to_page(reg_nr: i32) -> u32 {
    if reg_nr == WM_REG_DISCARD {
        REG_DISCARD_PAGE
    } else if reg_nr == WM_REG_CONST_ONE {
        REG_CONST_ONE_PAGE
    } else {
        REG_R0_PAGE + reg_nr as u32
    }
}
