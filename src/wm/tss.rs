//! TSS slot rotation (§3 "TSS slot rotation"): maps a real micro-step index
//! to one of the three rotating TSS selectors/virtual addresses, or to the
//! fixed supervisor TSS for an exit target.

use crate::wm::constants::{EXIT_SELECTOR, INST_BASE, TSS_SLOT_SELECTORS};

/// Maps a real micro-step number to its rotating TSS selector. A negative
/// `inst_nr` (any exit sentinel) maps to the supervisor TSS.
pub fn inst_to_tss_selector(inst_nr: i32) -> u16 {
    if inst_nr < 0 {
        return EXIT_SELECTOR;
    }
    TSS_SLOT_SELECTORS[(inst_nr as u32 % 3) as usize]
}

/// Maps a real micro-step number to its TSS's virtual address within
/// `INST_BASE`. Only defined for non-exit targets — callers must check
/// `inst_nr >= 0` themselves, matching `map_src_tss`'s precondition.
pub fn inst_to_tss_addr(inst_nr: i32) -> u32 {
    debug_assert!(inst_nr >= 0);
    match inst_nr as u32 % 3 {
        0 => INST_BASE + 0x0_FFD0,
        1 => INST_BASE + 0x1_FFD0,
        _ => INST_BASE + 0x2_FFD0,
    }
}
