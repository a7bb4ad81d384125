//! Global Descriptor Table (GDT) and 32-bit Task-State Segment layout.
//!
//! This module supplies the descriptor-encoding primitives and the
//! `lgdt`/`ltr` flush sequence for the supervisor's own GDT, built by
//! [`init`] directly at the fixed address `wm::constants::GDT_BASE`
//! rather than wherever Rust's static allocator would otherwise place it.
//!
//! That placement is load-bearing, not a style choice: GDTR is loaded
//! exactly once, here, and never reloaded again. Every per-step page
//! directory the weird machine builds (`wm::instruction::generate_pagetable`)
//! remaps its `PDE[6]` to swap in a *different* physical page underneath
//! that same fixed virtual address — that's how the cascade's own
//! page-resident GDT replica (`wm::launch::write_program_gdt`) becomes
//! visible to a selector load without GDTR ever changing. If this
//! module's copy lived anywhere else, that remapping trick would have no
//! effect on what GDTR actually points at.

use core::arch::asm;
use core::cell::UnsafeCell;
use core::mem::size_of;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::wm::constants::GDT_BASE;
use crate::wm::descriptor::write_full_gdt;

/// Null descriptor.
const NULL_INDEX: u16 = 0;
/// Flat ring-0 code segment.
const KERNEL_CODE_INDEX: u16 = 1;
/// Flat ring-0 data segment.
const KERNEL_DATA_INDEX: u16 = 2;
/// Supervisor TSS, selector `0x18`. Control returns here when the weird
/// machine's fault cascade task-switches back out.
const KERNEL_TSS_INDEX: u16 = 3;

/// Bytes spanned by the full four-page GDT image (§4.2): room for the
/// three rotating TSS slots at their fixed offsets, not just the four
/// descriptors the supervisor itself uses.
const GDT_IMAGE_BYTES: usize = 4 * 4096;

pub const KERNEL_CODE_SELECTOR: u16 = KERNEL_CODE_INDEX << 3;
pub const KERNEL_DATA_SELECTOR: u16 = KERNEL_DATA_INDEX << 3;
pub const KERNEL_TSS_SELECTOR: u16 = KERNEL_TSS_INDEX << 3;

const _: () = assert!(KERNEL_TSS_SELECTOR == 0x18);
const _: () = assert!(NULL_INDEX == 0);

// Access-byte bits (legacy 32-bit descriptor format).
pub const ACCESS_PRESENT: u8 = 1 << 7;
pub const ACCESS_SEGMENT: u8 = 1 << 4; // 1 = code/data, 0 = system descriptor
pub const ACCESS_EXECUTABLE: u8 = 1 << 3;
pub const ACCESS_RW: u8 = 1 << 1;
/// System-segment type for an available (non-busy) 32-bit TSS.
pub const ACCESS_TSS_AVAILABLE: u8 = 0x9;

/// Granularity nibble: byte granularity, 32-bit operand size default.
const FLAGS_BYTE_GRANULAR_32BIT: u8 = 1 << 6;
/// Granularity nibble: 4 KiB page granularity, 32-bit operand size default.
const FLAGS_PAGE_GRANULAR_32BIT: u8 = (1 << 7) | (1 << 6);

#[repr(C, packed)]
pub struct DescriptorTablePointer {
    pub limit: u16,
    pub base: u32,
}

/// Standard 32-bit Task State Segment (Intel SDM Vol. 3A, Figure 8-2).
///
/// Field order and offsets are load-bearing: the weird machine's register
/// and instruction builders address specific TSS fields by raw byte offset
/// (see `wm::tss`), and this layout is the ground truth they match against.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct Tss32 {
    pub link: u32,
    pub esp0: u32,
    pub ss0: u32,
    pub esp1: u32,
    pub ss1: u32,
    pub esp2: u32,
    pub ss2: u32,
    pub cr3: u32,
    pub eip: u32,
    pub eflags: u32,
    pub eax: u32,
    pub ecx: u32,
    pub edx: u32,
    pub ebx: u32,
    pub esp: u32,
    pub ebp: u32,
    pub esi: u32,
    pub edi: u32,
    pub es: u32,
    pub cs: u32,
    pub ss: u32,
    pub ds: u32,
    pub fs: u32,
    pub gs: u32,
    pub ldt: u32,
    pub iomap_base: u32,
}

const _: () = assert!(size_of::<Tss32>() == 0x68);
const _: () = assert!(core::mem::offset_of!(Tss32, cr3) == 0x1C);
const _: () = assert!(core::mem::offset_of!(Tss32, eip) == 0x20);
const _: () = assert!(core::mem::offset_of!(Tss32, eflags) == 0x24);
const _: () = assert!(core::mem::offset_of!(Tss32, ecx) == 0x2C);
const _: () = assert!(core::mem::offset_of!(Tss32, esp) == 0x38);

impl Tss32 {
    pub const fn zeroed() -> Self {
        Self {
            link: 0,
            esp0: 0,
            ss0: 0,
            esp1: 0,
            ss1: 0,
            esp2: 0,
            ss2: 0,
            cr3: 0,
            eip: 0,
            eflags: 0,
            eax: 0,
            ecx: 0,
            edx: 0,
            ebx: 0,
            esp: 0,
            ebp: 0,
            esi: 0,
            edi: 0,
            es: 0,
            cs: 0,
            ss: 0,
            ds: 0,
            fs: 0,
            gs: 0,
            ldt: 0,
            iomap_base: 0,
        }
    }
}

/// Encodes a flat (base=0 where possible) 32-bit segment descriptor.
///
/// `access` is the full access byte (bits 3:0 type, bit 4 S, bit 5-6 DPL,
/// bit 7 present) — callers own the S bit, since it differs between
/// code/data segments (S=1) and system segments like a TSS (S=0); a TSS
/// descriptor with S=1 mis-set would look like a code/data segment to the
/// CPU and fault on `ltr`/task switch. `granular_4k` selects 4 KiB vs.
/// byte limit granularity.
pub const fn encode_descriptor(access: u8, granular_4k: bool, base: u32, limit: u32) -> u64 {
    let flags = if granular_4k {
        FLAGS_PAGE_GRANULAR_32BIT
    } else {
        FLAGS_BYTE_GRANULAR_32BIT
    };

    let mut descr = 0u64;
    descr |= (limit as u64) & 0xFFFF;
    descr |= ((base as u64) & 0xFFFF) << 16;
    descr |= (((base as u64) >> 16) & 0xFF) << 32;
    descr |= (access as u64) << 40;
    descr |= (((limit as u64 >> 16) & 0x0F) | ((flags as u64) & 0xF0)) << 48;
    descr |= (((base as u64) >> 24) & 0xFF) << 56;
    descr
}

/// Encodes a flat, 4 KiB-granular code-or-data segment descriptor, access
/// byte built from the `ACCESS_*` bit constants (callers set `ACCESS_SEGMENT`
/// themselves); thin convenience wrapper used by the supervisor GDT and by
/// `wm::gdt`'s program-observable replica.
pub const fn encode_code_or_data(access_bits: u8, base: u32, limit: u32) -> u64 {
    encode_descriptor(access_bits, true, base, limit)
}

/// Encodes an available 32-bit TSS descriptor (access byte `0x89`: present,
/// system segment, type `0x9`), byte granular, as the weird machine's
/// fault cascade expects.
pub const fn encode_tss_descriptor(base: u32, limit: u32) -> u64 {
    encode_descriptor(ACCESS_PRESENT | ACCESS_TSS_AVAILABLE, false, base, limit)
}

struct GdtState {
    tss: UnsafeCell<Tss32>,
}

// SAFETY: single-core kernel; all mutation happens during serialized boot.
unsafe impl Sync for GdtState {}

static STATE: GdtState = GdtState {
    tss: UnsafeCell::new(Tss32::zeroed()),
};
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Loads GDTR from `ptr`. Does not reload segment registers: the flat
/// code/data layout this kernel always uses keeps selector values valid
/// across a GDT swap, matching the reference kernel's own minimalism.
///
/// # Safety
/// `ptr` must describe a live, correctly encoded GDT for as long as it
/// stays loaded.
pub unsafe fn load_gdtr(ptr: &DescriptorTablePointer) {
    asm!("lgdt [{0}]", in(reg) ptr, options(nostack, preserves_flags));
}

/// Loads the Task Register with `selector`.
///
/// # Safety
/// `selector` must reference a present, non-busy, correctly sized TSS
/// descriptor in the currently loaded GDT.
pub unsafe fn load_tr(selector: u16) {
    asm!("ltr {0:x}", in(reg) selector, options(nostack, preserves_flags));
}

/// Builds and loads the supervisor's own flat GDT (null, code `0x08`,
/// data `0x10`, kernel TSS `0x18`, plus the three rotating TSS slot
/// descriptors every micro-step's instruction builder addresses), and
/// points the Task Register at the kernel TSS so the very first task
/// switch into the fault cascade has a valid "old task" to save state
/// into.
///
/// Writes the image directly at `GDT_BASE` rather than into a Rust
/// static — see the module doc comment for why that address is fixed.
///
/// `supervisor_cr3` is the page directory restored by `CR3` when control
/// returns to the kernel TSS (i.e. the identity-mapped supervisor
/// directory built by `arch::paging::init`).
///
/// # Safety
/// Must run after `arch::paging::init`, exactly once, before `arch::idt`
/// loads IDTR or `wm::launch` switches into the cascade.
pub unsafe fn init(supervisor_cr3: u32) {
    let tss = &mut *STATE.tss.get();
    *tss = Tss32::zeroed();
    tss.cr3 = supervisor_cr3;
    tss.iomap_base = size_of::<Tss32>() as u32;

    write_full_gdt(GDT_BASE as *mut u32, tss as *const Tss32 as u32);

    let ptr = DescriptorTablePointer {
        limit: (GDT_IMAGE_BYTES - 1) as u16,
        base: GDT_BASE,
    };

    load_gdtr(&ptr);
    load_tr(KERNEL_TSS_SELECTOR);

    INITIALIZED.store(true, Ordering::Release);
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Physical address of the supervisor TSS, for `wm::launch`'s program-GDT
/// replica (selector `0x18` must resolve to the same TSS under either
/// page directory).
pub fn supervisor_tss_addr() -> u32 {
    STATE.tss.get() as u32
}

/// Returns a snapshot of the four supervisor-relevant GDT entries
/// (null/code/data/TSS), read back from `GDT_BASE`, for tests.
pub fn descriptor_snapshot() -> [u64; 4] {
    // SAFETY: `GDT_BASE` holds a live GDT image once `init` has run; a
    // by-value read of four `u64`s creates no lingering aliasing.
    unsafe {
        let words = core::slice::from_raw_parts(GDT_BASE as *const u64, 4);
        [words[0], words[1], words[2], words[3]]
    }
}
