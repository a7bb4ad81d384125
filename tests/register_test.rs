//! Register frame tests (§3, §4.3): the value each register's dedicated
//! page carries at the TSS `ESP` offset, plus the two special sentinel
//! register pages.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(pfwm_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use pfwm_kernel::wm;
use pfwm_kernel::wm::constants::{
    REG_CONST_ONE_PAGE, REG_DISCARD_PAGE, REG_R0_PAGE, WM_REG_CONST_ONE, WM_REG_DISCARD,
};
use pfwm_kernel::wm::register::{read_register_page, reg_to_page, write_register_page};

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

#[test_case]
fn test_reg_to_page_maps_user_registers_from_r0() {
    assert_eq!(reg_to_page(0), REG_R0_PAGE);
    assert_eq!(reg_to_page(3), REG_R0_PAGE + 3);
}

#[test_case]
fn test_reg_to_page_maps_sentinels_to_their_fixed_pages() {
    assert_eq!(reg_to_page(WM_REG_DISCARD), REG_DISCARD_PAGE);
    assert_eq!(reg_to_page(WM_REG_CONST_ONE), REG_CONST_ONE_PAGE);
}

#[test_case]
fn test_write_then_read_register_page_round_trips_the_value() {
    // SAFETY: page 40 sits inside the user-register range and is not
    // referenced elsewhere while this test runs.
    unsafe {
        write_register_page(REG_R0_PAGE + 40, 12345);
        assert_eq!(read_register_page(REG_R0_PAGE + 40), 12345);
    }
}

#[test_case]
fn test_write_register_page_zeroes_value_round_trips_too() {
    // SAFETY: page 41 sits inside the user-register range, unused by
    // other tests in this binary.
    unsafe {
        write_register_page(REG_R0_PAGE + 41, 7);
        write_register_page(REG_R0_PAGE + 41, 0);
        assert_eq!(read_register_page(REG_R0_PAGE + 41), 0);
    }
}

#[test_case]
fn test_write_register_page_writes_fixed_selector_tail() {
    // SAFETY: page 42 is exclusively used by this test.
    unsafe {
        write_register_page(REG_R0_PAGE + 42, 9);
        let words = wm::debug_page_words(REG_R0_PAGE + 42);
        assert_eq!(words[6], 0x10, "ES selector");
        assert_eq!(words[7], 0x08, "CS selector");
        assert_eq!(words[12], 0x00, "LDT selector");
    }
}

#[test_case]
fn test_write_reg_through_public_api_updates_the_same_page_read_register_page_sees() {
    wm::write_reg(5, 999).unwrap();
    // SAFETY: reading back a page the public `write_reg` just wrote.
    let value = unsafe { read_register_page(reg_to_page(5)) };
    assert_eq!(value, 999);
    assert_eq!(wm::read_reg(5), 999);
}
