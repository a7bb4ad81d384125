//! Program-frame addressing over the identity-mapped `PROG_BASE` pool
//! (§3 Lifecycle, §9 "Frame arena"). Frames are not individually tracked
//! by an incremental allocator — every frame's page number is computed
//! directly from register/instruction counts, exactly as the original
//! builder addresses them — but every frame still must land inside the
//! single 4 MiB window a real micro-step's page directory identity-maps
//! (`generate_pagetable`'s `PROG_BASE_ADDR >> 22` PDE), so capacity is
//! checked against that hard ceiling before anything is written.

use crate::wm::constants::{PROG_BASE, PROG_BASE_PAGE};
use crate::wm::BuilderError;

/// Pages available in the single 4 MiB window every per-step page
/// directory identity-maps at `PROG_BASE`.
pub const MAX_FRAMES: u32 = 1024;

/// Converts a program page number to its identity-mapped virtual address.
pub fn page_to_virt(page: u32) -> u32 {
    PROG_BASE + (page << 12)
}

/// Converts a program page number to its physical page number, for
/// embedding in page-table/page-directory entries.
pub fn page_to_phys_page(page: u32) -> u32 {
    PROG_BASE_PAGE + page
}

/// Rejects a layout that would address a page beyond [`MAX_FRAMES`].
pub fn check_capacity(highest_page_used_exclusive: u32) -> Result<(), BuilderError> {
    if highest_page_used_exclusive > MAX_FRAMES {
        Err(BuilderError::TooManySteps)
    } else {
        Ok(())
    }
}

/// Returns a mutable view of the 1024 `u32` words backing `page`.
///
/// # Safety
/// The caller must not alias this with another live reference to the same
/// page, and `page` must lie within the program frame pool.
pub unsafe fn page_words_mut<'a>(page: u32) -> &'a mut [u32; 1024] {
    &mut *(page_to_virt(page) as *mut [u32; 1024])
}
