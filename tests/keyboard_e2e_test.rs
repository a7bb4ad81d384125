//! Keyboard end-to-end integration tests.
//!
//! Verifies the pipeline:
//! raw scancode enqueue -> decode -> character read API -> `try_read_char`,
//! the same entry point the I/O bridge polls alongside the serial line
//! (§4.6).

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(pfwm_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use pfwm_kernel::drivers::keyboard;

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    pfwm_kernel::drivers::serial::init();
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
fn test_keyboard_e2e_scancode_to_char() {
    keyboard::init();

    // Make code for 'a'.
    keyboard::enqueue_raw_scancode(0x1e);
    assert!(
        keyboard::process_pending_scancodes(),
        "worker iteration should process the queued scancode"
    );
    assert!(
        keyboard::read_char() == Some(b'a'),
        "scancode 0x1e should decode to 'a'"
    );
}

#[test_case]
fn test_keyboard_e2e_shift_uppercase() {
    keyboard::init();

    // Left shift make, 'a' make, left shift break.
    keyboard::enqueue_raw_scancode(0x2a);
    keyboard::enqueue_raw_scancode(0x1e);
    keyboard::enqueue_raw_scancode(0xaa);

    assert!(
        keyboard::process_pending_scancodes(),
        "worker iteration should process the shift + key sequence"
    );
    assert!(
        keyboard::read_char() == Some(b'A'),
        "shift + 'a' should decode to uppercase 'A'"
    );
    assert!(
        keyboard::read_char().is_none(),
        "only one printable character should be produced"
    );
}

#[test_case]
fn test_keyboard_e2e_backspace_decodes_to_control_byte() {
    keyboard::init();

    keyboard::enqueue_raw_scancode(0x0e); // backspace make
    assert!(keyboard::process_pending_scancodes());
    assert_eq!(
        keyboard::read_char(),
        Some(0x08),
        "backspace scancode should decode to the 0x08 control byte the bridge checks for"
    );
}

#[test_case]
fn test_keyboard_e2e_enter_decodes_to_newline() {
    keyboard::init();

    keyboard::enqueue_raw_scancode(0x1c); // enter make
    assert!(keyboard::process_pending_scancodes());
    assert_eq!(keyboard::read_char(), Some(b'\n'));
}
