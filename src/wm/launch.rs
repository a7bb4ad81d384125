//! Launching and resuming the fault cascade (§4.5): the program-resident
//! GDT replica the cascade reads its own descriptors from, and the single
//! `ljmp`-triggered round trip that hands control to the rotating TSS
//! slots and gets it back when a step targets an exit sentinel.

use core::arch::asm;

use crate::arch::gdt;
use crate::arch::paging::{write_cr3, SUP_PD};
use crate::wm::constants::{GDT_PAGE0, INIT_PD, REG_CONST_ONE_PAGE};
use crate::wm::descriptor::write_full_gdt;
use crate::wm::frame::{page_to_virt, page_words_mut};
use crate::wm::instruction::map_src_tss;

/// Writes the weird machine's own page-resident replica of the GDT (§4.2)
/// into `GDT_PAGE0..GDT_PAGE0+4` — the four program-pool pages every
/// per-step page directory's `PDE[6]` maps `GDT_BASE` to. Must match the
/// physical GDT `arch::gdt::init` built byte for byte, since the two are
/// swapped in transparently as `CR3` changes underneath whatever selector
/// the CPU is currently dereferencing.
///
/// # Safety
/// `GDT_PAGE0..GDT_PAGE0+4` must be allocated, unaliased, contiguous
/// program pages, and `arch::gdt::init` must already have run.
pub unsafe fn write_program_gdt() {
    // SAFETY: the four GDT pool pages are contiguous by construction
    // (`GDT_PAGE0 + 0..4`), so their virtual range is one 16 KiB span.
    write_full_gdt(page_words_mut(GDT_PAGE0).as_mut_ptr(), gdt::supervisor_tss_addr());
}

/// Performs one round trip into the fault cascade, aimed at real
/// micro-step `start_real_inst`: maps it as `INIT_PD`'s entry point,
/// switches to the program page directory, `ljmp`s into TSS selector
/// `0x1FF8`, and restores the supervisor page directory once the cascade
/// task-switches back out through the exit sentinel (§4.5, §4.7).
///
/// `REG_CONST_ONE_PAGE` is used as the entry point's source register page
/// regardless of what the real program reads there — entry always lands
/// on a NOP micro-step, whose read value is discarded, so any non-aliased
/// register page is a safe placeholder (the same trick the per-step
/// builder never needs, since every other entry is wired by the
/// instruction that branches to it).
///
/// # Safety
/// `generate()` must have already built `INIT_PD` and the program GDT;
/// `start_real_inst` must name a real micro-step with fully generated
/// pages.
pub unsafe fn switch_into(start_real_inst: i32, first_inst_page: u32) {
    map_src_tss(INIT_PD, start_real_inst, REG_CONST_ONE_PAGE, first_inst_page);
    write_cr3(page_to_virt(INIT_PD));

    asm!("ljmp $0x1ff8, $0x0", "addl $4, %esp", options(att_syntax));

    write_cr3(SUP_PD);
}
