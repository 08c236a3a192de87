//! Compile-time tuning for the slave.

/// Arena backing the element tables, attributes, and runtime nodes. Tunable,
/// but the element tables of the largest intended header must fit: a header
/// declaring N elements consumes 4*N bytes before the first attribute lands.
pub const ARENA_BYTES: usize = 768;

/// Panel width in pixels; one page buffer is exactly this many bytes.
pub const PANEL_WIDTH: i16 = 128;

#[cfg(feature = "panel-64")]
pub const PANEL_HEIGHT: i16 = 64;
#[cfg(not(feature = "panel-64"))]
pub const PANEL_HEIGHT: i16 = 32;

/// Pages streamed per frame.
pub const PANEL_PAGES: u8 = (PANEL_HEIGHT / 8) as u8;

/// Hard ceiling on list windows, set by the panel height.
#[cfg(feature = "panel-64")]
pub const MAX_LIST_ROWS: u8 = 8;
#[cfg(not(feature = "panel-64"))]
pub const MAX_LIST_ROWS: u8 = 6;

/// Payload bytes per DMA burst on the display bus; the control prefix byte
/// rides on top of this.
pub const I2C_BUFFER_LIMIT: usize = 28;

/// Milliseconds per animation frame; the main loop ticks at 1 ms and steps
/// animations on this divider.
pub const FRAME_MS: u32 = 16;

/// Horizontal slide speed during a screen change, pixels per frame.
pub const SCREEN_ANIM_PIXELS_PER_FRAME: i16 = 8;

/// Vertical list scroll speed, pixels per frame; one row is 8 pixels.
pub const LIST_ANIM_PIXELS_PER_FRAME: u8 = 1;

/// Full bright/dim cycle length of the barrel edit highlight.
pub const EDIT_BLINK_PERIOD_FRAMES: u8 = 30;

/// A partial RX frame with no byte for this long is dropped.
pub const RX_WATCHDOG_MS: u32 = 200;

/// Longest text payload an element can allocate, excluding the terminator.
pub const TEXT_CAP_MAX: u8 = 20;

/// Navigation stack depth; pushes beyond this fail silently.
pub const NAV_STACK_DEPTH: usize = 4;

/// Single-slot response queue size, framed bytes.
pub const TX_QUEUE_BYTES: usize = 64;

/// The `>` list cursor is drawn this many pixels left of the row text.
pub const CURSOR_MARKER_OFFSET: i16 = 6;

/// Focus inversion never narrows below this width.
pub const FOCUS_MIN_INVERT_WIDTH: i16 = 18;

/// Elements laid out beyond this horizontal distance are culled.
pub const CULL_X: i16 = 143;

// The smallest useful workload (header + a screen + one short text) must fit
// even if the capacity constant is tuned down.
const _: () = assert!(ARENA_BYTES >= 256);
