//! Public API for the page-fault weird machine (§6 "Supervisor → core
//! API"): `setup`, `write_reg`/`read_reg`/`alloc_const`, `gen_movdbz`,
//! `generate`, `launch`/`resume`. Builder bookkeeping (register/instruction
//! counts, the first-instruction-frame index) lives in one
//! `SpinLock<WmState>`, the same singleton-behind-a-lock shape
//! `arch::gdt`/`arch::idt` use for their own one-shot initialization state,
//! generalized here to a mutable cursor instead of a fixed table.

pub mod bridge;
pub mod constants;
pub mod descriptor;
pub mod frame;
pub mod instruction;
pub mod launch;
pub mod register;
pub mod tss;

use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::{gdt, idt, paging};
use crate::sync::spinlock::SpinLock;
use crate::wm::constants::{
    INIT_PD, MAX_ASM_INSTS, MAX_REGISTERS, PAGES_PER_INST, REG_CONST_ONE_PAGE, REG_DISCARD_PAGE,
    REG_R0_PAGE, WM_REG_CONST_ONE, WM_REG_DISCARD,
};
use crate::wm::frame::{check_capacity, page_words_mut};
use crate::wm::instruction::{gen_movdbz_expansion, generate_pagetable};
use crate::wm::launch::{switch_into, write_program_gdt};
use crate::wm::register::{read_register_page, reg_to_page, write_register_page};

/// Builder preconditions the supervisor client can violate (§7 "Builder
/// precondition violated"). The weird machine itself has no way to signal
/// failure once launched — these are all raised before the first `ljmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderError {
    /// `write_reg`/`alloc_const` would exceed [`constants::MAX_REGISTERS`].
    TooManyRegisters,
    /// `gen_movdbz` names an `asm_inst` beyond [`constants::MAX_ASM_INSTS`],
    /// or the resulting frames would exceed the program pool.
    TooManySteps,
    /// A branch target named by `gen_movdbz` is neither `-1` (exit) nor a
    /// valid `asm_inst` index.
    InvalidTarget(i32),
    /// `dst`/`src` is neither a non-negative in-range register number nor
    /// the matching sentinel (`WM_REG_DISCARD` for `dst`, `WM_REG_CONST_ONE`
    /// for `src`).
    InvalidRegister(i32),
    /// `launch`/`resume` was called before `generate()` materialized the
    /// initial page directory.
    NotGenerated,
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BuilderError::TooManyRegisters => write!(f, "too many registers allocated"),
            BuilderError::TooManySteps => write!(f, "too many asm instructions allocated"),
            BuilderError::InvalidTarget(t) => write!(f, "invalid branch target {t}"),
            BuilderError::InvalidRegister(r) => write!(f, "invalid register number {r}"),
            BuilderError::NotGenerated => write!(f, "generate() must run before launch/resume"),
        }
    }
}

struct WmState {
    num_user_regs: u32,
    num_const_regs: u32,
    num_asm_insts: u32,
}

impl WmState {
    const fn new() -> Self {
        Self {
            num_user_regs: 0,
            num_const_regs: 0,
            num_asm_insts: 0,
        }
    }

    /// Page number of the first real micro-step's page directory, derived
    /// the same way `wm_gen_movdbz`/`wm_run` recompute it in the original
    /// source: it slides whenever a register or constant is allocated.
    fn first_inst_page(&self) -> u32 {
        REG_R0_PAGE + self.num_user_regs + self.num_const_regs
    }
}

static STATE: SpinLock<WmState> = SpinLock::new(WmState::new());
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static GENERATED: AtomicBool = AtomicBool::new(false);

/// Installs paging, the supervisor GDT/TR, and the supervisor's fallback
/// IDT, then resets the builder's register/instruction bookkeeping (§4.1,
/// §4.2, §6 "`setup()`: ... Idempotent once"). Must run exactly once,
/// before any other `wm::*` entry point.
pub fn setup() {
    if INITIALIZED.swap(true, Ordering::AcqRel) {
        return;
    }

    // SAFETY: runs once, before anything else touches paging/GDT/IDT state.
    unsafe {
        paging::init();
        gdt::init(paging::SUP_PD);
        idt::init();
    }

    let mut state = STATE.lock();
    state.num_user_regs = 0;
    state.num_const_regs = 0;
    state.num_asm_insts = 0;
}

/// Initializes register `reg_nr` to `value` (§6 `write_reg`). `reg_nr` must
/// be non-negative; the two sentinel registers are managed internally and
/// are not writable through this entry point.
pub fn write_reg(reg_nr: i32, value: u32) -> Result<(), BuilderError> {
    if reg_nr < 0 {
        return Ok(());
    }
    if reg_nr as usize >= MAX_REGISTERS {
        return Err(BuilderError::TooManyRegisters);
    }

    let mut state = STATE.lock();
    if reg_nr as u32 >= state.num_user_regs {
        state.num_user_regs = reg_nr as u32 + 1;
    }
    // SAFETY: `reg_to_page` for a non-negative, in-range `reg_nr` names a
    // page exclusively owned by register storage.
    unsafe {
        write_register_page(reg_to_page(reg_nr), value);
    }
    Ok(())
}

/// Reads back the current value of `reg_nr` (§6 `read_reg`). An
/// out-of-range index returns zero rather than faulting (§7).
pub fn read_reg(reg_nr: i32) -> u32 {
    if reg_nr < 0 || reg_nr as usize >= MAX_REGISTERS {
        return 0;
    }
    // SAFETY: `reg_to_page` for an in-range `reg_nr` names a page exclusively
    // owned by register storage, written at least once by `setup`/`write_reg`.
    unsafe { read_register_page(reg_to_page(reg_nr)) }
}

/// Allocates a fresh constant register initialized to `value` (§6
/// `alloc_const`), returning its register number.
pub fn alloc_const(value: u32) -> Result<i32, BuilderError> {
    let mut state = STATE.lock();
    let reg_nr = (state.num_user_regs + state.num_const_regs) as i32;
    if reg_nr as usize >= MAX_REGISTERS {
        return Err(BuilderError::TooManyRegisters);
    }

    // SAFETY: `reg_to_page` on the next unallocated register number names a
    // page not yet claimed by any other register.
    unsafe {
        write_register_page(reg_to_page(reg_nr), value);
    }
    state.num_const_regs += 1;
    Ok(reg_nr)
}

/// Emits one logical `movdbz(dst, src, target_nz, target_z)` step (§6
/// `gen_movdbz`, §4.4). `-1` targets mean exit; `dst` may be
/// [`constants::WM_REG_DISCARD`]; `src` may be [`constants::WM_REG_CONST_ONE`].
pub fn gen_movdbz(
    asm_inst: usize,
    dst: i32,
    src: i32,
    target_nz: i32,
    target_z: i32,
) -> Result<(), BuilderError> {
    if asm_inst >= MAX_ASM_INSTS {
        return Err(BuilderError::TooManySteps);
    }
    if dst < 0 && dst != WM_REG_DISCARD {
        return Err(BuilderError::InvalidRegister(dst));
    }
    if src < 0 && src != WM_REG_CONST_ONE {
        return Err(BuilderError::InvalidRegister(src));
    }
    for target in [target_nz, target_z] {
        if target != -1 && target as usize >= MAX_ASM_INSTS {
            return Err(BuilderError::InvalidTarget(target));
        }
    }

    let first_inst_page = {
        let mut state = STATE.lock();
        if asm_inst as u32 >= state.num_asm_insts {
            state.num_asm_insts = asm_inst as u32 + 1;
        }
        state.first_inst_page()
    };

    let highest_page = first_inst_page + ((asm_inst as u32) + 1) * 3 * PAGES_PER_INST;
    check_capacity(highest_page)?;

    // SAFETY: the three real micro-steps for `asm_inst` occupy
    // `first_inst_page + asm_inst*3*PAGES_PER_INST .. +3*PAGES_PER_INST`,
    // a range `check_capacity` just confirmed stays in-pool, and distinct
    // from every other `asm_inst`'s range.
    unsafe {
        gen_movdbz_expansion(first_inst_page, asm_inst, dst, src, target_nz, target_z);
    }
    Ok(())
}

/// Finalizes the builder state before the first `launch()`/`resume()`:
/// (re)writes the two special register frames, replicates the GDT into the
/// program-resident pages the cascade itself reads, and builds the initial
/// page directory's static mappings (§4.5 step (a)/(b), matching `wm_run`'s
/// preamble in the original source before its `ljmp`).
///
/// Required before the first `launch()`/`resume()`: `gen_movdbz` only ever
/// writes the per-step frames it owns, never `INIT_PD` — only `generate()`
/// builds that page directory, and `launch`/`resume` refuse to run without
/// it (`BuilderError::NotGenerated`). Calling this more than once is
/// harmless.
pub fn generate() {
    // SAFETY: these are the two fixed sentinel pages, not aliased by any
    // user/constant register (`reg_to_page` never maps onto them).
    unsafe {
        write_register_page(REG_CONST_ONE_PAGE, 1);
        write_register_page(REG_DISCARD_PAGE, 0);
        write_program_gdt();
        generate_pagetable(INIT_PD);
    }
    GENERATED.store(true, Ordering::Release);
}

/// Enters the fault cascade at logical step 0 (§6 `launch`). Equivalent to
/// `resume(0)`.
pub fn launch() -> Result<(), BuilderError> {
    resume(0)
}

/// Enters the fault cascade at logical step `asm_inst` (§6 `resume`, §4.5):
/// rewrites the initial page directory's entry point and performs the
/// `ljmp` round trip. Returns once an exit branch switches back to the
/// supervisor TSS.
///
/// Fails with [`BuilderError::NotGenerated`] if `generate()` has not yet
/// built `INIT_PD` — entering the cascade against an unbuilt initial page
/// directory loads garbage into `CR3` and triple-faults the machine.
pub fn resume(asm_inst: i32) -> Result<(), BuilderError> {
    if !GENERATED.load(Ordering::Acquire) {
        return Err(BuilderError::NotGenerated);
    }

    let first_inst_page = STATE.lock().first_inst_page();
    let start_real_inst = asm_inst * 3;
    // SAFETY: `GENERATED` just confirmed `generate()` built `INIT_PD` and
    // the program GDT.
    unsafe {
        switch_into(start_real_inst, first_inst_page);
    }
    Ok(())
}

/// Whether `setup()` has already run.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Zeroes and returns a raw view of `page`'s 1024 words, for tests that
/// want to inspect builder output directly instead of through `read_reg`.
///
/// # Safety
/// `page` must be an allocated program page not concurrently aliased.
#[doc(hidden)]
pub unsafe fn debug_page_words(page: u32) -> &'static [u32; 1024] {
    page_words_mut(page)
}
