//! Screen/VGA driver integration tests.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(pfwm_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use pfwm_kernel::drivers::screen::{Color, Screen};

const VGA_BUFFER: usize = 0xB8000;
const VGA_COLS: usize = 80;
const VGA_ROWS: usize = 25;

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    pfwm_kernel::drivers::serial::init();
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
fn test_print_char_wrap_at_last_cell_keeps_cursor_in_bounds() {
    let mut screen = Screen::new();
    screen.clear();

    screen.set_cursor(VGA_ROWS - 1, VGA_COLS - 1);
    screen.print_char(b'X');
    screen.print_char(b'Y');

    let (row, col) = screen.get_cursor();
    assert!(row < VGA_ROWS, "cursor row must stay in bounds after wrap");
    assert!(col < VGA_COLS, "cursor col must stay in bounds after wrap");
}

#[test_case]
fn test_print_str_writes_contiguous_pattern() {
    let mut screen = Screen::new();
    screen.clear();

    let row = 5usize;
    let col = 10usize;
    let pattern = b"[#####     ]";

    screen.set_cursor(row, col);
    screen.print_str(core::str::from_utf8(pattern).expect("pattern must be valid ASCII"));

    for (idx, expected) in pattern.iter().enumerate() {
        let cell = VGA_BUFFER + ((row * VGA_COLS + col + idx) * 2);
        // SAFETY: `cell` addresses the identity-mapped VGA text MMIO for
        // the selected row/column; volatile read is required for MMIO.
        let ch = unsafe { core::ptr::read_volatile(cell as *const u8) };
        assert!(ch == *expected, "VGA cell must contain the expected byte");
    }
}

#[test_case]
fn test_print_str_can_cover_a_full_vga_text_row() {
    let mut screen = Screen::new();
    screen.clear();

    let row = 8usize;
    let mut full_row = [b'.'; VGA_COLS];
    full_row[0] = b'X';
    let full_row_str = core::str::from_utf8(&full_row).expect("full-row bytes must be valid ASCII");

    screen.set_cursor(row, 0);
    screen.print_str(full_row_str);

    for (idx, expected) in full_row.iter().enumerate() {
        let cell = VGA_BUFFER + ((row * VGA_COLS + idx) * 2);
        // SAFETY: same as above.
        let ch = unsafe { core::ptr::read_volatile(cell as *const u8) };
        assert!(ch == *expected, "VGA row write must preserve each byte");
    }
}

#[test_case]
fn test_scroll_moves_last_row_content_up_on_overflow() {
    let mut screen = Screen::new();
    screen.clear();

    screen.set_cursor(VGA_ROWS - 1, 0);
    screen.print_str("LASTROW\n");

    let (row, _) = screen.get_cursor();
    assert_eq!(row, VGA_ROWS - 1, "cursor stays on the final visible row after scroll");

    let cell = VGA_BUFFER + ((VGA_ROWS - 2) * VGA_COLS) * 2;
    // SAFETY: reads the now-scrolled-up row holding what was written at
    // the last row before the newline triggered a scroll.
    let ch = unsafe { core::ptr::read_volatile(cell as *const u8) };
    assert_eq!(ch, b'L', "scrolled content must move up by one row");
}

#[test_case]
fn test_set_colors_changes_subsequent_attribute_byte() {
    let mut screen = Screen::new();
    screen.clear();
    screen.set_colors(Color::Yellow, Color::Blue);
    screen.set_cursor(12, 0);
    screen.print_char(b'Z');

    let cell_attr = VGA_BUFFER + (12 * VGA_COLS) * 2 + 1;
    // SAFETY: reads the attribute byte adjacent to the character cell
    // just written.
    let attr = unsafe { core::ptr::read_volatile(cell_attr as *const u8) };
    assert_eq!(attr, (1u8 << 4) | 14u8, "attribute byte must encode background<<4 | foreground");
}
