//! The REPL state machine from §1/§8 S3 ("Echo loop"): read a line byte by
//! byte, hand it to the I/O bridge as a query, print back whatever comes
//! over the wire, and loop. Built entirely against `wm`'s public API —
//! nothing here reaches into `wm`'s internals, matching how an ordinary
//! client program is expected to use the core (§1 "a `movdbz` sample
//! program ... is described only as an example client of the core").
//!
//! Grounded on `original_source/kernel/kernel.c::build_repl_program`;
//! register/constant allocation and the `movdbz` instruction listing are
//! transcribed unchanged, since the wire protocol and the bridge in
//! `wm::bridge` depend on this exact layout.

use crate::wm;
use crate::wm::bridge::{ResumeTargets, R_CMD};
use crate::wm::constants::{WM_IO_RECV_RESPONSE, WM_IO_SEND_QUERY, WM_REG_DISCARD};

/// Logical instruction labels, matching `original_source/kernel/kernel.c`'s
/// `L_*` enum.
pub const L_READ_CMD: i32 = 0;
pub const L_READ_EXIT: i32 = 1;
pub const L_SEND_CMD: i32 = 2;
pub const L_SEND_EXIT: i32 = 3;
pub const L_RECV_CMD: i32 = 4;
pub const L_RECV_EXIT: i32 = 5;
pub const L_LOOP: i32 = 6;

const R_TEMP: i32 = 2;

/// Builds the REPL program and returns the bridge's resume targets. Leaves
/// `wm::setup()` to the caller — matches the division of labor in
/// `original_source/kernel/kernel.c::kernel_main` (`wm_setup()` then
/// `build_repl_program()`).
pub fn build() -> ResumeTargets {
    // Register allocation: r0 = cmd, r1 = data (unused by this program —
    // READ_BYTE/WRITE_BYTE's byte payload is carried by the bridge's own
    // host-side buffer, not a movdbz register), r2 = loop temp.
    let _ = wm::write_reg(R_CMD, 0);
    let _ = wm::write_reg(R_TEMP, 0);

    // movdbz computes dst = src - 1, so the constant that lands a command
    // code N in R_CMD must be initialized to N + 1.
    let c_read = wm::alloc_const(crate::wm::constants::WM_IO_READ_BYTE + 1).unwrap();
    let c_sendq = wm::alloc_const(WM_IO_SEND_QUERY + 1).unwrap();
    let c_recvr = wm::alloc_const(WM_IO_RECV_RESPONSE + 1).unwrap();
    let c_one = wm::alloc_const(1).unwrap();

    wm::gen_movdbz(L_READ_CMD as usize, R_CMD, c_read, L_READ_EXIT, L_READ_EXIT).unwrap();
    wm::gen_movdbz(
        L_READ_EXIT as usize,
        WM_REG_DISCARD,
        WM_REG_DISCARD,
        -1,
        -1,
    )
    .unwrap();

    wm::gen_movdbz(L_SEND_CMD as usize, R_CMD, c_sendq, L_SEND_EXIT, L_SEND_EXIT).unwrap();
    wm::gen_movdbz(
        L_SEND_EXIT as usize,
        WM_REG_DISCARD,
        WM_REG_DISCARD,
        -1,
        -1,
    )
    .unwrap();

    wm::gen_movdbz(L_RECV_CMD as usize, R_CMD, c_recvr, L_RECV_EXIT, L_RECV_EXIT).unwrap();
    wm::gen_movdbz(
        L_RECV_EXIT as usize,
        WM_REG_DISCARD,
        WM_REG_DISCARD,
        -1,
        -1,
    )
    .unwrap();

    wm::gen_movdbz(L_LOOP as usize, R_TEMP, c_one, L_READ_CMD, L_READ_CMD).unwrap();

    wm::generate();

    ResumeTargets {
        read_cmd: L_READ_CMD,
        send_cmd: L_SEND_CMD,
        recv_cmd: L_RECV_CMD,
        loop_back: L_LOOP,
    }
}

/// Builds the program and runs the I/O bridge loop to completion (§1's
/// "echo loop" example, §8 S3).
pub fn run() {
    let targets = build();
    crate::wm::bridge::run(&targets, wm::launch);
}
