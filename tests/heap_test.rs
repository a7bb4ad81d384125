//! Heap Manager Integration Tests
//!
//! Verifies basic heap allocation, reuse, coalescing, and the global
//! allocator hookup used by `alloc::vec::Vec` elsewhere in this kernel
//! (the bridge's prompt accumulator, `wm::bridge::run`).

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(pfwm_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

use alloc::vec::Vec;
use core::alloc::{GlobalAlloc, Layout};
use core::panic::PanicInfo;
use pfwm_kernel::allocator::GLOBAL_ALLOCATOR;
use pfwm_kernel::arch::paging;
use pfwm_kernel::memory::heap;

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    pfwm_kernel::drivers::serial::init();
    // SAFETY: test entry point; the heap's flat offset is only guaranteed
    // mapped once the supervisor's identity map is live.
    unsafe {
        paging::init();
    }
    heap::init();

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
fn test_heap_alloc_free_round_trip() {
    heap::init();
    let ptr = heap::malloc(16);
    assert!(!ptr.is_null(), "malloc should return a non-null pointer");
    assert!(
        (ptr as usize).is_multiple_of(heap::HEAP_ALIGNMENT),
        "heap allocation must respect the heap's payload alignment"
    );

    // SAFETY: `ptr` was just returned by `malloc` with a 16-byte payload.
    unsafe {
        core::ptr::write_volatile(ptr, 0xA5);
        let val = core::ptr::read_volatile(ptr);
        assert!(val == 0xA5, "heap memory must be writable and readable");
    }

    heap::free(ptr);
}

#[test_case]
fn test_heap_reuse_after_free() {
    heap::init();
    let ptr1 = heap::malloc(32);
    let ptr2 = heap::malloc(32);
    assert!(!ptr1.is_null() && !ptr2.is_null(), "allocations should succeed");

    heap::free(ptr1);
    let ptr3 = heap::malloc(16);
    assert!(ptr3 == ptr1, "first-fit allocator should reuse the freed block");

    heap::free(ptr2);
    heap::free(ptr3);
}

#[test_case]
fn test_heap_coalesces_freed_neighbors_for_a_larger_alloc() {
    heap::init();
    let ptr1 = heap::malloc(100);
    let ptr2 = heap::malloc(100);
    assert!(!ptr1.is_null() && !ptr2.is_null(), "allocations should succeed");

    heap::free(ptr1);
    heap::free(ptr2);

    // Freeing both adjacent blocks should coalesce them into one large
    // free block that a bigger request can now be satisfied from.
    let ptr3 = heap::malloc(180);
    assert!(ptr3 == ptr1, "freed neighbors should coalesce into one block");
    heap::free(ptr3);
}

#[test_case]
fn test_heap_growth_extends_arena_for_oversized_request() {
    heap::init();
    // The initial arena is 4 KiB; a request well past that must trigger
    // `grow_heap` rather than return null.
    let ptr = heap::malloc(0x4000);
    assert!(!ptr.is_null(), "large allocation should succeed via heap growth");
    heap::free(ptr);
}

#[test_case]
fn test_is_initialized_reports_true_after_init() {
    heap::init();
    assert!(heap::is_initialized(), "heap must report initialized after init()");
}

#[test_case]
fn test_global_allocator_round_trip() {
    heap::init();
    let layout = Layout::from_size_align(32, heap::HEAP_ALIGNMENT).unwrap();

    // SAFETY: `layout` is well-formed and the allocator is backed by the
    // initialized kernel heap.
    let ptr = unsafe { GLOBAL_ALLOCATOR.alloc(layout) };
    assert!(!ptr.is_null(), "global allocator must hand out a valid pointer");

    unsafe {
        core::ptr::write_bytes(ptr, 0x42, layout.size());
        GLOBAL_ALLOCATOR.dealloc(ptr, layout);
    }
}

#[test_case]
fn test_global_allocator_rejects_overaligned_layout() {
    heap::init();
    // The heap's payload alignment is `align_of::<usize>()`; a stricter
    // request than that must be refused rather than silently misaligned.
    let layout = Layout::from_size_align(64, heap::HEAP_ALIGNMENT * 4).unwrap();

    // SAFETY: `layout` is well-formed; a null result is a valid outcome
    // for an alignment the allocator cannot satisfy.
    let ptr = unsafe { GLOBAL_ALLOCATOR.alloc(layout) };
    assert!(ptr.is_null(), "over-aligned requests must be refused, not misaligned");
}

#[test_case]
fn test_rust_vec_uses_kernel_heap() {
    heap::init();
    let mut values: Vec<u32> = Vec::new();
    for i in 0..64u32 {
        values.push(i);
    }
    assert_eq!(values.len(), 64);
    assert_eq!(values[63], 63);
    drop(values);
}
