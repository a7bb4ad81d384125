//! Architecture-wide constants shared across subsystems.

/// Base page size used by x86 4 KiB pages.
pub const PAGE_SIZE: usize = 4096;

/// Base page size as `u32` for address arithmetic.
pub const PAGE_SIZE_U32: u32 = PAGE_SIZE as u32;

/// Size of a 4 MiB PSE page.
pub const LARGE_PAGE_SIZE: u32 = 4 * 1024 * 1024;

/// Entries per page table / page directory (32-bit non-PAE paging).
pub const ENTRIES_PER_TABLE: usize = 1024;
