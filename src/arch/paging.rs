//! Supervisor address space: a flat PSE identity map.
//!
//! Every physical address below 2 GiB is mapped to the identical virtual
//! address through 512 4 MiB pages. This is the *only* page directory
//! ordinary kernel code (including the I/O bridge) ever runs under; the
//! weird machine's own per-instruction page directories (`wm::instruction`)
//! are a completely separate, much smaller set of mappings that exist only
//! while the fault cascade is running.

use core::arch::asm;

use crate::arch::constants::LARGE_PAGE_SIZE;

/// Supervisor page directory's physical/virtual address (identity mapped,
/// so the two coincide once paging is live). Matches `spec.md`'s `SUP_PD`.
pub const SUP_PD: u32 = 0x07C0_0000;

const PDE_COUNT: usize = 512;

const PG_PRESENT: u32 = 1 << 0;
const PG_WRITABLE: u32 = 1 << 1;
const PG_PAGE_SIZE: u32 = 1 << 7;

fn read_cr0() -> u32 {
    let val: u32;
    unsafe { asm!("mov {0}, cr0", out(reg) val, options(nomem, nostack, preserves_flags)) };
    val
}

fn read_cr4() -> u32 {
    let val: u32;
    unsafe { asm!("mov {0}, cr4", out(reg) val, options(nomem, nostack, preserves_flags)) };
    val
}

/// # Safety
/// Caller must ensure `pd` names a live, correctly built page directory.
pub(crate) unsafe fn write_cr3(pd: u32) {
    asm!("mov cr3, {0}", in(reg) pd, options(nostack, preserves_flags));
}

unsafe fn write_cr0(val: u32) {
    asm!("mov cr0, {0}", in(reg) val, options(nostack, preserves_flags));
}

unsafe fn write_cr4(val: u32) {
    asm!("mov cr4, {0}", in(reg) val, options(nostack, preserves_flags));
}

/// Builds the supervisor's 4 MiB-paged identity map at [`SUP_PD`], then
/// enables PSE (CR4.PSE) and paging (CR0.PG), per §4.1.
///
/// # Safety
/// Must run exactly once, before any other code dereferences a pointer
/// that assumes paging is enabled, and before `arch::gdt`/`arch::idt` load
/// their descriptor tables (both reference `SUP_PD`-relative addresses).
pub unsafe fn init() {
    let pde = SUP_PD as *mut u32;
    for i in 0..PDE_COUNT {
        let base = (i as u32) * LARGE_PAGE_SIZE as u32;
        *pde.add(i) = PG_PRESENT | PG_PAGE_SIZE | PG_WRITABLE | base;
    }

    write_cr3(SUP_PD);
    write_cr4(read_cr4() | (1 << 4)); // PSE
    write_cr0(read_cr0() | (1 << 31)); // PG
}
