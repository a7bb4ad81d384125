//! I/O bridge (§4.6, §6 "Serial wire protocol"): after each cascade exit,
//! reads `R_CMD` and performs the requested I/O against the keyboard,
//! serial and VGA collaborators before resuming the cascade.
//!
//! Grounded directly on `original_source/kernel/kernel.c::io_bridge_loop`;
//! the accumulator is a heap `Vec<u8>` here instead of a fixed
//! `char prompt_buf[1024]`, since this kernel already pulls in `alloc` for
//! `memory::heap` and has no reason to cap prompt length at a literal.

use alloc::vec::Vec;
use core::fmt::Write as _;

use crate::drivers::screen::{Color, Screen};
use crate::drivers::{keyboard, serial};
use crate::wm::constants::{
    WIRE_ANSWER_PREFIX_LEN, WIRE_BYE, WIRE_ECHO_PREFIX, WIRE_EOT, WIRE_QUERY_PREFIX, WIRE_READY,
    WM_IO_EXIT, WM_IO_READ_BYTE, WM_IO_RECV_RESPONSE, WM_IO_SEND_QUERY, WM_IO_WRITE_BYTE,
};

/// Register allocation the REPL program and the bridge both agree on
/// (`original_source/kernel/kernel.c`'s `R_CMD`/`R_DATA`/`R_TEMP` enum).
pub const R_CMD: i32 = 0;
pub const R_DATA: i32 = 1;

/// Resume targets the bridge hands back to the cascade after servicing a
/// command, named the way the REPL program that drives this bridge labels
/// its own instructions (`demos::echo_repl`'s `L_*` constants).
pub struct ResumeTargets {
    pub read_cmd: i32,
    pub send_cmd: i32,
    pub recv_cmd: i32,
    pub loop_back: i32,
}

/// Blocks until a byte is available from either the keyboard or the serial
/// line, whichever produces one first (§4.6 READ_BYTE; mirrors the original
/// source's single-threaded `input_read` poll loop).
fn poll_input_byte() -> u8 {
    loop {
        if let Some(c) = keyboard::try_read_char() {
            return c;
        }
        if serial::received() {
            return serial::read_byte();
        }
        core::hint::spin_loop();
    }
}

/// Runs the I/O bridge loop until the program exits (§4.6, §4.7's
/// "terminal state" is an exit selector, observed here as `WM_IO_EXIT` or
/// any unrecognized command, §7). `targets` names where each servicing
/// step resumes the cascade; `launch` performs the very first round trip.
pub fn run(targets: &ResumeTargets, launch: impl FnOnce() -> Result<(), crate::wm::BuilderError>) {
    serial::puts(WIRE_READY);

    let mut screen = Screen::new();
    screen.set_colors(Color::DarkGray, Color::Black);
    let _ = screen.write_str("[weird machine: launching fault cascade]\n");

    let mut accumulator: Vec<u8> = Vec::new();
    let mut need_prompt = true;

    launch().expect("generate() must run before the bridge's first launch()");

    loop {
        let cmd = crate::wm::read_reg(R_CMD);

        match cmd {
            WM_IO_READ_BYTE => {
                if need_prompt {
                    screen.set_colors(Color::LightGreen, Color::Black);
                    let _ = screen.write_str("pagefault> ");
                    need_prompt = false;
                }

                let c = poll_input_byte();

                if c == b'\n' || c == b'\r' {
                    serial::write_byte(b'\n');
                    screen.print_char(b'\n');

                    if accumulator == b"quit" {
                        screen.set_colors(Color::Yellow, Color::Black);
                        let _ = screen.write_str("[quit]\n");
                        serial::puts(WIRE_BYE);
                        return;
                    }

                    need_prompt = true;
                    let _ = crate::wm::write_reg(R_CMD, 0);
                    if accumulator.is_empty() {
                        crate::wm::resume(targets.read_cmd).expect("generated before first launch");
                    } else {
                        crate::wm::resume(targets.send_cmd).expect("generated before first launch");
                    }
                } else if c == 0x08 || c == 0x7f {
                    if accumulator.pop().is_some() {
                        serial::write_byte(0x08);
                        serial::write_byte(b' ');
                        serial::write_byte(0x08);
                        screen.print_char(0x08);
                    }
                    let _ = crate::wm::write_reg(R_CMD, 0);
                    crate::wm::resume(targets.read_cmd).expect("generated before first launch");
                } else {
                    accumulator.push(c);
                    serial::write_byte(c);
                    screen.set_colors(Color::White, Color::Black);
                    screen.print_char(c);

                    let _ = crate::wm::write_reg(R_CMD, 0);
                    crate::wm::resume(targets.read_cmd).expect("generated before first launch");
                }
            }

            WM_IO_WRITE_BYTE => {
                let byte = crate::wm::read_reg(R_DATA) as u8;
                serial::write_byte(byte);

                let _ = crate::wm::write_reg(R_CMD, 0);
                crate::wm::resume(targets.read_cmd).expect("generated before first launch");
            }

            WM_IO_SEND_QUERY => {
                screen.set_colors(Color::DarkGray, Color::Black);
                let _ = screen.write_str("[sending query via fault cascade]\n");

                serial::puts(WIRE_QUERY_PREFIX);
                for &b in accumulator.iter() {
                    serial::write_byte(b);
                }
                serial::write_byte(b'\n');
                accumulator.clear();

                let _ = crate::wm::write_reg(R_CMD, 0);
                crate::wm::resume(targets.recv_cmd).expect("generated before first launch");
            }

            WM_IO_RECV_RESPONSE => {
                for _ in 0..WIRE_ANSWER_PREFIX_LEN {
                    serial::read_byte();
                }

                screen.set_colors(Color::LightCyan, Color::Black);
                let _ = screen.write_str(WIRE_ECHO_PREFIX);
                serial::puts(WIRE_ECHO_PREFIX);

                loop {
                    let c = serial::read_byte();
                    if c == WIRE_EOT {
                        break;
                    }
                    screen.print_char(c);
                    serial::write_byte(c);
                }
                screen.print_char(b'\n');
                screen.print_char(b'\n');
                serial::write_byte(b'\n');

                let _ = crate::wm::write_reg(R_CMD, 0);
                crate::wm::resume(targets.loop_back).expect("generated before first launch");
            }

            WM_IO_EXIT => {
                screen.set_colors(Color::Yellow, Color::Black);
                let _ = screen.write_str("[weird machine exited]\n");
                return;
            }

            // §7: unknown command codes are treated as EXIT.
            _ => {
                screen.set_colors(Color::Yellow, Color::Black);
                let _ = screen.write_str("[weird machine exited]\n");
                return;
            }
        }
    }
}
