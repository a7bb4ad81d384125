//! Kernel entry point: boots straight into the page-fault weird machine
//! demo in `demos::echo_repl`. Reaching protected mode and calling
//! `_start` is the boot stub's job (§1 "out of scope"); this file only
//! does what happens after that hand-off.

#![no_std]
#![no_main]

mod panic;

use core::fmt::Write as _;

use pfwm_kernel::drivers::screen::{Color, Screen};
use pfwm_kernel::drivers::{keyboard, serial};
use pfwm_kernel::memory::heap;
use pfwm_kernel::{demos, wm};

/// Kernel entry point, reached once the boot stub has switched to 32-bit
/// protected mode and jumped here with an identity-mapped low 1 MiB still
/// valid (paging itself is enabled later, by `wm::setup`).
#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    serial::init();
    keyboard::init();

    let mut screen = Screen::new();
    screen.clear();
    screen.set_colors(Color::LightCyan, Color::Black);
    let _ = screen.write_str("=== Page-Fault Weird Machine ===\n");
    screen.set_colors(Color::DarkGray, Color::Black);
    let _ = screen.write_str("A movdbz REPL computed via x86 page faults.\n");
    let _ = screen.write_str("The MMU is the computer. Zero instructions executed.\n");
    let _ = screen.write_str("--------------------------------------------\n\n");

    screen.set_colors(Color::Yellow, Color::Black);
    let _ = screen.write_str("[init] Setting up page fault weird machine...\n");
    wm::setup();
    // The heap lives at a high flat offset only valid once `wm::setup`'s
    // identity map is live; the bridge's accumulator (`alloc::vec::Vec`)
    // needs it before the first `wm::bridge::run` call.
    heap::init();

    let _ = screen.write_str("[init] Building movdbz REPL program...\n");
    let targets = demos::echo_repl::build();

    screen.set_colors(Color::LightGreen, Color::Black);
    let _ = screen.write_str("[init] Ready. Type in the QEMU window. 'quit' to exit.\n\n");

    wm::bridge::run(&targets, wm::launch);

    screen.set_colors(Color::DarkGray, Color::Black);
    let _ = screen.write_str("[halted]\n");

    loop {
        // SAFETY: halting is always safe; interrupts are never enabled.
        unsafe {
            core::arch::asm!("hlt", options(nostack, preserves_flags));
        }
    }
}
