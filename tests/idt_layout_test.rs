//! Supervisor IDT integration tests (§4.1): the fallback table loaded once
//! at `INST_BASE`, active only before the cascade launches or after a
//! hardware anomaly outside the weird machine's own per-step IDTs.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(pfwm_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use pfwm_kernel::arch::{gdt, idt, paging};

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    pfwm_kernel::drivers::serial::init();
    // SAFETY: test entry point, runs once before `test_main`.
    unsafe {
        paging::init();
        gdt::init(paging::SUP_PD);
        idt::init();
    }

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
fn test_idt_is_initialized() {
    assert!(idt::is_initialized(), "supervisor IDT must be initialized");
}

#[test_case]
fn test_idt_entry_count_matches_x86_vector_space() {
    assert_eq!(idt::IDT_ENTRY_COUNT, 256);
}

#[test_case]
fn test_fatal_vectors_are_present_interrupt_gates() {
    let table = idt::descriptor_snapshot();

    for vector in [
        idt::EXCEPTION_DOUBLE_FAULT,
        idt::EXCEPTION_GENERAL_PROTECTION,
        idt::EXCEPTION_PAGE_FAULT,
    ] {
        let entry_bytes: [u8; 8] = unsafe { core::mem::transmute_copy(&table[vector as usize]) };
        let type_attr = entry_bytes[5];
        assert_eq!(type_attr & 0x80, 0x80, "vector {vector} must be marked present");
        assert_eq!(
            type_attr & 0x0F,
            0x0E,
            "vector {vector} must be a 32-bit interrupt gate, not a task gate"
        );
    }
}

#[test_case]
fn test_unused_vector_is_absent() {
    let table = idt::descriptor_snapshot();
    let entry_bytes: [u8; 8] = unsafe { core::mem::transmute_copy(&table[32]) };
    assert_eq!(entry_bytes[5] & 0x80, 0, "an unpopulated vector must not be marked present");
}
