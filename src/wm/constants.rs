//! Address-space layout, page assignments and I/O command codes for the
//! page-fault weird machine. Every constant here is load-bearing: the
//! cascade's correctness depends on exact values, not just their relative
//! ordering, so nothing in this file is adjusted for Rust taste.

/// Instruction range + IDT, PDE 1. The IDT occupies the first page of this
/// range (`pde[1]`'s page table slot 0, see `instruction::generate_pagetable`).
pub const INST_BASE: u32 = 0x0040_0000;
/// Supervisor kernel code, PDE 3 (4 MiB identity page).
pub const KCODE_BASE: u32 = 0x00C0_0000;
/// GDT as seen by the weird machine, PDE 6.
pub const GDT_BASE: u32 = 0x0180_0000;
/// Identity-mapped pool of program frames.
pub const PROG_BASE: u32 = 0x0800_0000;

/// `PROG_BASE` expressed as a 4 KiB page number, for page-index arithmetic.
pub const PROG_BASE_PAGE: u32 = PROG_BASE >> 12;

pub const PG_PRESENT: u32 = 0x001;
pub const PG_WRITABLE: u32 = 0x002;
pub const PG_PAGE_SIZE_4M: u32 = 0x080;

// ---- Program page assignments (indices within the PROG_BASE pool) ----

pub const STACK_PAGE: u32 = 0;
pub const STACK_PT_PAGE: u32 = 1;
pub const GDT_PT_PAGE: u32 = 2;
/// First of four contiguous pages backing the 16 KiB program-resident GDT
/// replica (`GDT_PAGE0..GDT_PAGE0+4`, written by `descriptor::write_full_gdt`
/// and mapped by `instruction::generate_pagetable`'s `pde[6]`).
pub const GDT_PAGE0: u32 = 3;
/// The initial page directory `generate()`/`wm::launch` rewrite on every
/// `resume()` (§4.5); its own instruction/IDT pages sit at the usual
/// `PD_OFF`/`INST_PT_OFF`/`INST_OFF`/`IDT_OFF` offsets from here.
pub const INIT_PD: u32 = 7;
pub const REG_CONST_ONE_PAGE: u32 = 10;
pub const REG_DISCARD_PAGE: u32 = 11;
/// First page of the user/constant register pool; `reg_to_page` offsets
/// from here.
pub const REG_R0_PAGE: u32 = 12;

/// Offsets within each real micro-step's 4-page group.
pub const PD_OFF: u32 = 0;
pub const INST_PT_OFF: u32 = 1;
pub const INST_OFF: u32 = 2;
pub const IDT_OFF: u32 = 3;
pub const PAGES_PER_INST: u32 = 4;

pub const MAX_REGISTERS: usize = 64;
pub const MAX_ASM_INSTS: usize = 256;

/// Special source/destination register sentinels (§3, §6).
pub const WM_REG_DISCARD: i32 = -2;
pub const WM_REG_CONST_ONE: i32 = -3;

/// Deliberately-unmapped EIP written into every TSS head (§4.4 step 3).
/// Any address outside every per-step page directory's mapped range
/// works; kept at the original source's own literal to stay grounded
/// (`SPEC_FULL.md`'s resolution of the "0xfffefff looks truncated" open
/// question).
pub const UNMAPPED_EIP: u32 = 0x0FFF_EFFF;

/// TSS rotation slots (§3). Index with `real_inst % 3`.
pub const TSS_SLOT_SELECTORS: [u16; 3] = [0x1FF8, 0x2FF8, 0x3FF8];
/// Selector of the fixed supervisor TSS; the target of any `-1` (exit).
pub const EXIT_SELECTOR: u16 = 0x18;

// ---- I/O bridge command codes (§4.6) ----

pub const WM_IO_EXIT: u32 = 0;
pub const WM_IO_READ_BYTE: u32 = 1;
pub const WM_IO_WRITE_BYTE: u32 = 2;
pub const WM_IO_SEND_QUERY: u32 = 3;
pub const WM_IO_RECV_RESPONSE: u32 = 4;

// ---- Serial wire protocol (§6) ----

pub const WIRE_READY: &str = "READY\n";
pub const WIRE_QUERY_PREFIX: &str = "Q:";
pub const WIRE_ANSWER_PREFIX_LEN: usize = 2; // "A:"
pub const WIRE_EOT: u8 = 0x04;
pub const WIRE_ECHO_PREFIX: &str = "Claude: ";
pub const WIRE_BYE: &str = "BYE\n";
