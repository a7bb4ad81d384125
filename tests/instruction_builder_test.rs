//! Builder-output inspection tests (§4.4, §6 `gen_movdbz`/`generate`):
//! checks the frames one logical `movdbz` expands into, without ever
//! entering the fault cascade itself.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(pfwm_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use pfwm_kernel::wm;
use pfwm_kernel::wm::constants::{
    IDT_OFF, INST_OFF, PAGES_PER_INST, PD_OFF, REG_R0_PAGE, UNMAPPED_EIP, WM_REG_CONST_ONE,
    WM_REG_DISCARD,
};

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    pfwm_kernel::drivers::serial::init();
    wm::setup();
    test_main();

    loop {
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    pfwm_kernel::testing::test_panic_handler(info)
}

/// First real micro-step's page directory page, valid before any
/// register/constant is allocated (matches `WmState::first_inst_page`
/// with both counters at zero).
const FIRST_INST_PAGE: u32 = REG_R0_PAGE;

#[test_case]
fn test_gen_movdbz_writes_unmapped_eip_into_every_real_micro_step() {
    wm::gen_movdbz(0, WM_REG_DISCARD, WM_REG_CONST_ONE, -1, -1).unwrap();

    for real_step in 0..3u32 {
        let pd_page = FIRST_INST_PAGE + real_step * PAGES_PER_INST + PD_OFF;
        // SAFETY: `gen_movdbz` above just populated this step's frames.
        let inst_page = unsafe { wm::debug_page_words(pd_page + INST_OFF) };
        assert_eq!(
            inst_page[1020], UNMAPPED_EIP,
            "real micro-step {real_step} must never have a reachable EIP"
        );
    }
}

#[test_case]
fn test_gen_movdbz_writes_nonzero_tss_descriptor_tail_of_every_real_micro_step() {
    wm::gen_movdbz(1, WM_REG_DISCARD, WM_REG_CONST_ONE, -1, -1).unwrap();

    let second_inst_page = FIRST_INST_PAGE + 3 * PAGES_PER_INST;
    for real_step in 0..3u32 {
        let pd_page = second_inst_page + real_step * PAGES_PER_INST + PD_OFF;
        // SAFETY: `gen_movdbz` above just populated this step's frames.
        let inst_page = unsafe { wm::debug_page_words(pd_page + INST_OFF) };
        assert_ne!(inst_page[1022], 0, "fresh TSS descriptor low word must be written");
        assert_ne!(inst_page[1023], 0, "fresh TSS descriptor high word must be written");
    }
}

#[test_case]
fn test_gen_movdbz_writes_task_gates_for_both_final_branch_targets() {
    wm::gen_movdbz(2, WM_REG_DISCARD, WM_REG_CONST_ONE, -1, -1).unwrap();

    let third_inst_page = FIRST_INST_PAGE + 6 * PAGES_PER_INST;
    // The real decrement-and-branch micro-step is the third of the triple.
    let pd_page = third_inst_page + 2 * PAGES_PER_INST + PD_OFF;
    // SAFETY: `gen_movdbz` above just populated this step's frames.
    let idt_page = unsafe { wm::debug_page_words(pd_page + IDT_OFF) };

    assert_ne!(idt_page[16], 0, "#DF task gate (branch-zero target) must be written");
    assert_ne!(idt_page[17], 0, "#DF task gate (branch-zero target) must be written");
    assert_ne!(idt_page[28], 0, "#PF task gate (branch-nonzero target) must be written");
    assert_ne!(idt_page[29], 0, "#PF task gate (branch-nonzero target) must be written");
}

#[test_case]
fn test_generate_populates_initial_page_directory_and_sentinel_registers() {
    use pfwm_kernel::wm::constants::{REG_CONST_ONE_PAGE, REG_DISCARD_PAGE};

    wm::gen_movdbz(0, WM_REG_DISCARD, WM_REG_CONST_ONE, -1, -1).unwrap();
    wm::generate();

    // `read_reg` only accepts non-negative register numbers (§6); the two
    // sentinel pages are inspected directly the way `wm::debug_page_words`
    // is meant for.
    // SAFETY: `generate()` above just (re)wrote both sentinel pages.
    unsafe {
        assert_eq!(wm::debug_page_words(REG_CONST_ONE_PAGE)[2] >> 2, 1);
        assert_eq!(wm::debug_page_words(REG_DISCARD_PAGE)[2] >> 2, 0);
    }
}

#[test_case]
fn test_too_many_steps_is_rejected_before_writing_frames() {
    use pfwm_kernel::wm::BuilderError;
    let result = wm::gen_movdbz(
        pfwm_kernel::wm::constants::MAX_ASM_INSTS,
        WM_REG_DISCARD,
        WM_REG_CONST_ONE,
        -1,
        -1,
    );
    assert_eq!(result, Err(BuilderError::TooManySteps));
}
