//! Segment-descriptor byte encoding, shared by the supervisor's own GDT
//! (`arch::gdt`) and the weird machine's page-resident program GDT, which
//! must be written twice with identical contents (§4.2).
//!
//! `arch::gdt` already encodes descriptors as a single `u64` for its own
//! `UnsafeCell<[u64; N]>`-backed table; this module splits that same
//! encoding into the two `u32` words a program frame is addressed by
//! (`u32` pointer arithmetic, matching `generate_idt_page`/`init_gdt` in
//! `original_source/kernel/weirdmachine.c`).

use crate::arch::gdt::{encode_code_or_data, encode_tss_descriptor, ACCESS_EXECUTABLE, ACCESS_PRESENT, ACCESS_RW, ACCESS_SEGMENT};
use crate::wm::constants::TSS_SLOT_SELECTORS;
use crate::wm::tss::inst_to_tss_addr;

/// Splits a 64-bit descriptor into its low/high 32-bit words, in the order
/// a `u32`-indexed frame expects them (`p[0]`, `p[1]`).
fn words(descr: u64) -> [u32; 2] {
    [(descr & 0xFFFF_FFFF) as u32, (descr >> 32) as u32]
}

/// Flat ring-0 code descriptor (selector `0x08`), 4 KiB granular.
pub fn code_descriptor_words() -> [u32; 2] {
    words(encode_code_or_data(
        ACCESS_PRESENT | ACCESS_SEGMENT | ACCESS_EXECUTABLE | ACCESS_RW,
        0,
        0xFFFFF,
    ))
}

/// Flat ring-0 data descriptor (selector `0x10`), 4 KiB granular.
pub fn data_descriptor_words() -> [u32; 2] {
    words(encode_code_or_data(
        ACCESS_PRESENT | ACCESS_SEGMENT | ACCESS_RW,
        0,
        0xFFFFF,
    ))
}

/// Available 32-bit TSS descriptor, byte granular, limit fixed at `0x67`
/// (one past the last TSS field, matching every TSS descriptor in §4.2's
/// table).
pub fn tss_descriptor_words(base: u32) -> [u32; 2] {
    words(encode_tss_descriptor(base, 0x67))
}

/// Encodes one IDT task-gate entry (two `u32` words at the gate's slot):
/// present, DPL 3, task gate, routed through the same `IdtEntry::task_gate`
/// the supervisor's own fallback IDT uses, so the two tables share one
/// encoding (matching `generate_idt_page`'s `0xe500` byte pattern in the
/// original source).
pub fn task_gate_words(tss_selector: u16) -> [u32; 2] {
    crate::arch::idt::IdtEntry::task_gate(tss_selector, 3).to_words()
}

/// Writes the full 16 KiB, 4-page GDT image both GDT copies share byte
/// for byte (§4.2): null, flat code `0x08`, flat data `0x10`, the
/// supervisor TSS at `0x18`, and the three rotating TSS slots at their
/// fixed word offsets. Called once for the physical GDT `arch::gdt::init`
/// loads under identity mapping, and again for the page-resident replica
/// at `GDT_PAGE0..GDT_PAGE0+4` every per-step page directory's `PDE[6]`
/// maps `GDT_BASE` to (`wm::launch::write_program_gdt`) — the two must
/// stay identical, since which physical frame backs `GDT_BASE` depends
/// only on whichever page directory is loaded at the time.
///
/// # Safety
/// `base` must point at 4096 valid, writable, non-aliased `u32` words.
pub unsafe fn write_full_gdt(base: *mut u32, supervisor_tss_addr: u32) {
    let words = core::slice::from_raw_parts_mut(base, 4096);
    words.fill(0);

    let code = code_descriptor_words();
    words[2] = code[0];
    words[3] = code[1];

    let data = data_descriptor_words();
    words[4] = data[0];
    words[5] = data[1];

    let tss = tss_descriptor_words(supervisor_tss_addr);
    words[6] = tss[0];
    words[7] = tss[1];

    for (slot, selector) in TSS_SLOT_SELECTORS.iter().enumerate() {
        let slot_tss_addr = inst_to_tss_addr(slot as i32);
        let slot_words = tss_descriptor_words(slot_tss_addr);
        let word_idx = (*selector as usize) / 4;
        words[word_idx] = slot_words[0];
        words[word_idx + 1] = slot_words[1];
    }
}
