//! Program frame arena tests (§9 "Frame arena", §3 Lifecycle): page-number
//! arithmetic and the hard capacity ceiling every builder call checks
//! against before writing anything.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(pfwm_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use pfwm_kernel::wm;
use pfwm_kernel::wm::constants::PROG_BASE;
use pfwm_kernel::wm::frame::{check_capacity, page_to_phys_page, page_to_virt, MAX_FRAMES};

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
fn test_page_to_virt_is_identity_offset_from_prog_base() {
    assert_eq!(page_to_virt(0), PROG_BASE);
    assert_eq!(page_to_virt(1), PROG_BASE + 0x1000);
    assert_eq!(page_to_virt(16), PROG_BASE + 16 * 0x1000);
}

#[test_case]
fn test_page_to_phys_page_tracks_prog_base_page_number() {
    let base_page = PROG_BASE >> 12;
    assert_eq!(page_to_phys_page(0), base_page);
    assert_eq!(page_to_phys_page(7), base_page + 7);
}

#[test_case]
fn test_check_capacity_accepts_up_to_max_frames() {
    assert!(check_capacity(MAX_FRAMES).is_ok());
    assert!(check_capacity(0).is_ok());
}

#[test_case]
fn test_check_capacity_rejects_beyond_max_frames() {
    assert!(check_capacity(MAX_FRAMES + 1).is_err());
}

#[test_case]
fn test_page_words_mut_is_writable_and_distinct_per_page() {
    // SAFETY: pages 900/901 sit well within the program pool and are not
    // referenced by the builder at this point in the test.
    unsafe {
        let a = wm::debug_page_words(900);
        a[0] = 0xDEAD_BEEF;
        let b = wm::debug_page_words(901);
        b[0] = 0xCAFE_F00D;

        assert_eq!(wm::debug_page_words(900)[0], 0xDEAD_BEEF);
        assert_eq!(wm::debug_page_words(901)[0], 0xCAFE_F00D);
    }
}
