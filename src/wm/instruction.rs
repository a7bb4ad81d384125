//! Per-micro-step page generation (§4.4): for each real micro-step, emits
//! a page directory, instruction page table, TSS-head/instruction page and
//! IDT page, then wires the destination and successor TSS mappings.
//!
//! Every `unsafe fn` here writes directly into program-pool pages that are
//! not referenced by any live Rust reference elsewhere — the pool is the
//! weird machine's own address space, disjoint from anything the
//! allocator/heap touch, so the aliasing contract is "don't call this
//! twice concurrently for the same page," upheld by `wm::mod`'s single
//! `SpinLock<WmState>`.

use core::arch::asm;

use crate::wm::constants::{
    GDT_PAGE0, GDT_PT_PAGE, IDT_OFF, INST_OFF, INST_PT_OFF, KCODE_BASE, PD_OFF, PG_PAGE_SIZE_4M,
    PG_PRESENT, PG_WRITABLE, PROG_BASE, PAGES_PER_INST, REG_CONST_ONE_PAGE, REG_DISCARD_PAGE,
    STACK_PAGE, STACK_PT_PAGE, UNMAPPED_EIP,
};
use crate::wm::descriptor;
use crate::wm::frame::{page_to_phys_page, page_words_mut};
use crate::wm::register::reg_to_page;
use crate::wm::tss::{inst_to_tss_addr, inst_to_tss_selector};

fn read_eflags() -> u32 {
    let val: u32;
    unsafe {
        asm!("pushfd", "pop {0}", out(reg) val, options(nomem, preserves_flags));
    }
    val
}

fn pte(page: u32) -> u32 {
    PG_PRESENT | PG_WRITABLE | (page_to_phys_page(page) << 12)
}

/// Builds the page directory at `pd_page`: stack, instruction/IDT range,
/// kernel code, GDT and the program-pool identity map (§4.4 step 1).
///
/// # Safety
/// `pd_page`, `pd_page + INST_PT_OFF`, `STACK_PT_PAGE` and `GDT_PT_PAGE`
/// must each be distinct, in-pool pages not aliased elsewhere.
pub unsafe fn generate_pagetable(pd_page: u32) {
    let pde = page_words_mut(pd_page);
    pde.fill(0);

    let pt_stack = page_words_mut(STACK_PT_PAGE);
    pt_stack[0] = pte(STACK_PAGE);
    pde[0] = pte(STACK_PT_PAGE);

    let pt_inst = page_words_mut(pd_page + INST_PT_OFF);
    pt_inst[0] = pte(pd_page + IDT_OFF);
    pde[1] = pte(pd_page + INST_PT_OFF);

    pde[3] = PG_PRESENT | PG_PAGE_SIZE_4M | PG_WRITABLE | KCODE_BASE;

    let pt_gdt = page_words_mut(GDT_PT_PAGE);
    for i in 0..4u32 {
        pt_gdt[i as usize] = pte(GDT_PAGE0 + i);
    }
    pde[6] = pte(GDT_PT_PAGE);

    pde[(PROG_BASE >> 22) as usize] = PG_PRESENT | PG_PAGE_SIZE_4M | PG_WRITABLE | PROG_BASE;
}

/// Builds the IDT page for this micro-step: task gates for #PF (branch
/// non-zero target) and #DF (branch-zero target) (§4.4 step 4).
///
/// # Safety
/// `pd_page + IDT_OFF` must be an in-pool page not aliased elsewhere.
pub unsafe fn generate_idt_page(pd_page: u32, dest_pf_inst: i32, dest_df_inst: i32) {
    let p = page_words_mut(pd_page + IDT_OFF);
    p.fill(0);

    let tss_pf = inst_to_tss_selector(dest_pf_inst);
    let tss_df = inst_to_tss_selector(dest_df_inst);

    let df_words = descriptor::task_gate_words(tss_df);
    p[16] = df_words[0];
    p[17] = df_words[1];

    let pf_words = descriptor::task_gate_words(tss_pf);
    p[28] = pf_words[0];
    p[29] = pf_words[1];
}

/// Builds the TSS-head/instruction page: `CR3`, the deliberately unmapped
/// `EIP`, `EFLAGS`, and a fresh not-busy TSS descriptor at this step's own
/// GDT slot (§4.4 step 3).
///
/// # Safety
/// `pd_page + INST_OFF` must be an in-pool page not aliased elsewhere.
pub unsafe fn generate_inst_page(pd_page: u32, inst_nr: i32) {
    let p = page_words_mut(pd_page + INST_OFF);
    p.fill(0);

    let tss_addr = inst_to_tss_addr(inst_nr);

    p[1019] = page_to_phys_page(pd_page) << 12; // CR3
    p[1020] = UNMAPPED_EIP;
    p[1021] = read_eflags();

    let words = descriptor::tss_descriptor_words(tss_addr);
    p[1022] = words[0];
    p[1023] = words[1];
}

/// Maps this step's own destination TSS tail in its instruction page table:
/// the GDT page holding this step's fresh descriptor, then the destination
/// register page (§4.4 step 5).
///
/// # Safety
/// `pd_page + INST_PT_OFF` must be an in-pool page not aliased elsewhere.
pub unsafe fn map_dest_tss(pd_page: u32, inst_nr: i32, reg_page: u32) {
    let pt = page_words_mut(pd_page + INST_PT_OFF);
    let tss_addr = inst_to_tss_addr(inst_nr);
    let seg_selector = inst_to_tss_selector(inst_nr) as u32;
    let pt_idx = ((tss_addr & 0x003F_F000) >> 12) as usize;

    pt[pt_idx] = pte(GDT_PAGE0 + (seg_selector >> 12));
    pt[pt_idx + 1] = pte(reg_page);
}

/// Maps the successor step's source TSS (head = successor's instruction
/// page, tail = the successor-appropriate source register page) (§4.4
/// step 6). `next_inst_nr` must not be an exit sentinel.
///
/// # Safety
/// `pd_page + INST_PT_OFF` must be an in-pool page not aliased elsewhere.
pub unsafe fn map_src_tss(pd_page: u32, next_inst_nr: i32, reg_page: u32, first_inst_page: u32) {
    debug_assert!(next_inst_nr >= 0);
    let pt = page_words_mut(pd_page + INST_PT_OFF);
    let tss_addr = inst_to_tss_addr(next_inst_nr);
    let inst_off_page = first_inst_page + (next_inst_nr as u32) * PAGES_PER_INST + INST_OFF;
    let pt_idx = ((tss_addr & 0x003F_F000) >> 12) as usize;

    pt[pt_idx] = pte(inst_off_page);
    pt[pt_idx + 1] = pte(reg_page);
}

/// Generates one real micro-step in full: page directory, IDT, instruction
/// page, destination mapping, and successor source mappings for whichever
/// of the #PF/#DF targets are not exits.
///
/// # Safety
/// `first_inst_page + inst_nr * PAGES_PER_INST + {0,1,2,3}` must each be
/// in-pool pages not aliased elsewhere.
pub unsafe fn gen_inst(
    first_inst_page: u32,
    inst_nr: i32,
    dest_pf_inst: i32,
    dest_df_inst: i32,
    dest_reg_page: u32,
    pf_input_reg_page: u32,
    df_input_reg_page: u32,
) {
    let pd_page = first_inst_page + (inst_nr as u32) * PAGES_PER_INST + PD_OFF;

    generate_pagetable(pd_page);
    generate_idt_page(pd_page, dest_pf_inst, dest_df_inst);
    generate_inst_page(pd_page, inst_nr);
    map_dest_tss(pd_page, inst_nr, dest_reg_page);

    if dest_pf_inst >= 0 {
        map_src_tss(pd_page, dest_pf_inst, pf_input_reg_page, first_inst_page);
    }
    if dest_df_inst >= 0 {
        map_src_tss(pd_page, dest_df_inst, df_input_reg_page, first_inst_page);
    }
}

/// Expands one logical `movdbz(dst, src, target_nz, target_z)` step into
/// its three real micro-steps: two NOPs that read and discard `src`, then
/// the real decrement-and-branch (§4.4, §3 "Instruction (logical)").
///
/// # Safety
/// See [`gen_inst`]; every micro-step's frames for `asm_inst` must be
/// in-pool and not aliased elsewhere.
pub unsafe fn gen_movdbz_expansion(
    first_inst_page: u32,
    asm_inst: usize,
    dst: i32,
    src: i32,
    target_nz: i32,
    target_z: i32,
) {
    let dest_page = reg_to_page(dst);
    let src_page = reg_to_page(src);
    let i = (asm_inst as i32) * 3;

    gen_inst(first_inst_page, i, i + 2, i + 2, REG_DISCARD_PAGE, src_page, src_page);
    gen_inst(first_inst_page, i + 1, i + 2, i + 2, REG_DISCARD_PAGE, src_page, src_page);

    let real_dest_nz = if target_nz < 0 { -1 } else { target_nz * 3 };
    let real_dest_z = if target_z < 0 { -1 } else { target_z * 3 + 1 };

    gen_inst(
        first_inst_page,
        i + 2,
        real_dest_nz,
        real_dest_z,
        dest_page,
        REG_CONST_ONE_PAGE,
        REG_CONST_ONE_PAGE,
    );
}
