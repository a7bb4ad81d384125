//! 32-bit Interrupt Descriptor Table: supervisor fallback entries plus the
//! task-gate encoding the weird machine uses for every per-instruction IDT
//! page it builds itself.
//!
//! Two IDTs exist in this kernel, never active at the same time, sharing
//! one virtual (and, under the flat supervisor map, physical) address:
//! `wm::constants::INST_BASE`. This module's supervisor fallback IDT
//! (plain interrupt gates, vectors 8/13/14 routed to a fatal handler) is
//! written there directly and IDTR is loaded with that base exactly once,
//! never again — the same "fixed address, remapped frame" trick
//! `arch::gdt` uses. While ordinary kernel code runs (before the cascade
//! launches, or after it exits back to the supervisor TSS), the
//! supervisor's own page directory identity-maps `INST_BASE` straight to
//! this table. Once `wm::launch` switches `CR3`, every micro-step's own
//! page directory remaps that same virtual address to a *different*
//! physical page — its own IDT, built by `wm::instruction` out of
//! [`IdtEntry::task_gate`] entries — so IDTR never needs reloading even
//! though what it points at keeps changing underneath it. Any fault
//! vectoring into *this* table's entries while the cascade is running
//! would mean an unpopulated weird-machine IDT entry sent a vector the
//! builder never anticipated (§7's "hardware anomaly" failure kind) — but
//! that can only happen if the remapping itself is wrong, since a live
//! micro-step's IDT always shadows this one.

use core::arch::global_asm;
use core::mem::size_of;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::gdt::{DescriptorTablePointer, KERNEL_CODE_SELECTOR};
use crate::wm::constants::INST_BASE;

pub const EXCEPTION_DOUBLE_FAULT: u8 = 8;
pub const EXCEPTION_GENERAL_PROTECTION: u8 = 13;
pub const EXCEPTION_PAGE_FAULT: u8 = 14;

pub const IDT_ENTRY_COUNT: usize = 256;

const TYPE_INTERRUPT_GATE_32: u8 = 0xE;
const TYPE_TASK_GATE: u8 = 0x5;
const GATE_PRESENT: u8 = 1 << 7;

/// One 8-byte IDT descriptor: either an interrupt gate (offset/selector
/// point at a handler in the current code segment) or a task gate
/// (selector names a TSS descriptor; offset fields are ignored by the
/// CPU for task gates but still occupy their bytes).
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

const _: () = assert!(size_of::<IdtEntry>() == 8);

impl IdtEntry {
    pub const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    pub const fn interrupt_gate(handler: u32, selector: u16, dpl: u8) -> Self {
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            zero: 0,
            type_attr: GATE_PRESENT | ((dpl & 0x3) << 5) | TYPE_INTERRUPT_GATE_32,
            offset_high: (handler >> 16) as u16,
        }
    }

    /// Encodes a task gate redirecting this vector to `tss_selector`,
    /// matching `original_source/kernel/weirdmachine.c::generate_idt_page`
    /// (`0xe500` for a ring-3-reachable present task gate).
    pub const fn task_gate(tss_selector: u16, dpl: u8) -> Self {
        Self {
            offset_low: 0,
            selector: tss_selector,
            zero: 0,
            type_attr: GATE_PRESENT | ((dpl & 0x3) << 5) | TYPE_TASK_GATE,
            offset_high: 0,
        }
    }

    /// Splits this 8-byte descriptor into the two `u32` words a
    /// `u32`-indexed program frame expects them at — `wm::instruction`'s
    /// per-step IDT pages are plain `[u32; 1024]` views, not `IdtEntry`
    /// arrays, since they're written through the same frame pool every
    /// other weird-machine structure goes through.
    pub fn to_words(self) -> [u32; 2] {
        let bytes: [u8; 8] = unsafe { core::mem::transmute(self) };
        [
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        ]
    }
}

pub type IdtTable = [IdtEntry; IDT_ENTRY_COUNT];

const _: () = assert!(size_of::<IdtTable>() == 0x800);

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// # Safety
/// `ptr` must describe a live table for as long as it stays loaded.
pub unsafe fn load_idtr(ptr: &DescriptorTablePointer) {
    core::arch::asm!("lidt [{0}]", in(reg) ptr, options(nostack, preserves_flags));
}

extern "C" {
    fn double_fault_stub();
    fn general_protection_stub();
    fn page_fault_stub();
}

macro_rules! fatal_stub_asm {
    ($name:ident, $vector:expr) => {
        global_asm!(
            concat!(
                ".section .text\n",
                ".global ",
                stringify!($name),
                "\n",
                ".type ",
                stringify!($name),
                ", @function\n",
                stringify!($name),
                ":\n",
                "    cli\n",
                "    push eax\n",
                "    push ecx\n",
                "    push edx\n",
                "    push ebx\n",
                "    push ebp\n",
                "    push esi\n",
                "    push edi\n",
                "    mov eax, {vector}\n",
                "    push eax\n",
                "    push dword ptr [esp + 32]\n", // hardware-pushed error code
                "    call exception_handler_rust\n",
                "1:\n",
                "    cli\n",
                "    hlt\n",
                "    jmp 1b\n",
            ),
            vector = const $vector,
        );
    };
}

fatal_stub_asm!(double_fault_stub, EXCEPTION_DOUBLE_FAULT);
fatal_stub_asm!(general_protection_stub, EXCEPTION_GENERAL_PROTECTION);
fatal_stub_asm!(page_fault_stub, EXCEPTION_PAGE_FAULT);

/// Installs the supervisor's fallback IDT directly at `INST_BASE` and
/// loads IDTR from that same fixed address (§4.1, §4.4's shared-address
/// trick — see the module doc comment). Reached only for a fault before
/// the cascade launches, or a hardware anomaly landing outside the weird
/// machine's own per-instruction task-gate IDTs.
///
/// # Safety
/// Must run after `arch::paging::init` and `arch::gdt::init`, exactly
/// once, before `wm::launch` switches into the cascade.
pub unsafe fn init() {
    let table = &mut *(INST_BASE as *mut IdtTable);
    for entry in table.iter_mut() {
        *entry = IdtEntry::missing();
    }
    table[EXCEPTION_DOUBLE_FAULT as usize] =
        IdtEntry::interrupt_gate(double_fault_stub as u32, KERNEL_CODE_SELECTOR, 0);
    table[EXCEPTION_GENERAL_PROTECTION as usize] =
        IdtEntry::interrupt_gate(general_protection_stub as u32, KERNEL_CODE_SELECTOR, 0);
    table[EXCEPTION_PAGE_FAULT as usize] =
        IdtEntry::interrupt_gate(page_fault_stub as u32, KERNEL_CODE_SELECTOR, 0);

    let ptr = DescriptorTablePointer {
        limit: (size_of::<IdtTable>() - 1) as u16,
        base: INST_BASE,
    };
    load_idtr(&ptr);

    INITIALIZED.store(true, Ordering::Release);
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Returns a snapshot of the active supervisor IDT entries, read back
/// from `INST_BASE`, for tests.
pub fn descriptor_snapshot() -> IdtTable {
    // SAFETY: `INST_BASE` holds a live IDT once `init` has run; a
    // by-value copy creates no lingering aliasing.
    unsafe { *(INST_BASE as *const IdtTable) }
}

#[no_mangle]
extern "C" fn exception_handler_rust(error_code: u32, vector: u32) -> ! {
    crate::debugln!(
        "[fatal] unexpected vector {} (error_code={:#x}) outside fault cascade",
        vector,
        error_code
    );
    let mut screen = crate::drivers::screen::Screen::new();
    screen.set_colors(crate::drivers::screen::Color::White, crate::drivers::screen::Color::Red);
    screen.clear();
    use core::fmt::Write;
    let _ = writeln!(
        screen,
        "FATAL: unexpected vector {} reached supervisor IDT",
        vector
    );
    crate::logging::print_captured_target(&mut screen, "wm", |_| false);
    loop {
        // SAFETY: halting is always safe.
        unsafe {
            core::arch::asm!("cli", options(nostack, preserves_flags));
            core::arch::asm!("hlt", options(nostack, preserves_flags));
        }
    }
}
