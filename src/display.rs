//! The pixel/keyboard port and the screen state the interpreter drives through it.
//!
//! The interpreter owns a [`Screen`]: a 256x256 RGB frame buffer and a
//! wrapping cursor. Presenting frames and reading keys go through a
//! [`DisplayPort`] handle, so any windowing backend can be plugged in.
//! [`HeadlessDisplay`] is the backend used when no window is attached.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

/// Width and height of the frame buffer in pixels.
pub const SCREEN_SIZE: usize = 256;

const CHANNELS: usize = 3;

/// A capability the interpreter calls to show frames and read keys.
pub trait DisplayPort {
    /// Push `frame` to the display. Implementations also service their event
    /// queue here so key state stays live.
    fn present_frame(&mut self, frame: &FrameBuffer) -> io::Result<()>;

    /// Lowest-numbered key pressed since the previous frame, clearing it.
    /// Returns 0 when nothing is pending.
    fn poll_last_key(&mut self) -> u8;
}

/// 256x256 pixels, three bytes per pixel, row-major from y = 0.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self { pixels: vec![0; SCREEN_SIZE * SCREEN_SIZE * CHANNELS] }
    }

    /// Paint the pixel at (`x`, `y`) gray: all channels set to `value`.
    pub fn set_gray(&mut self, x: u8, y: u8, value: u8) {
        let at = Self::offset(x, y);
        self.pixels[at..at + CHANNELS].fill(value);
    }

    pub fn pixel(&self, x: u8, y: u8) -> [u8; 3] {
        let at = Self::offset(x, y);
        [self.pixels[at], self.pixels[at + 1], self.pixels[at + 2]]
    }

    /// Raw RGB bytes, suitable for uploading as a texture.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    fn offset(x: u8, y: u8) -> usize {
        CHANNELS * (SCREEN_SIZE * y as usize + x as usize)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("size", &format_args!("{SCREEN_SIZE}x{SCREEN_SIZE}"))
            .finish_non_exhaustive()
    }
}

/// The virtual drawing cursor. Both coordinates wrap on overflow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub x: u8,
    pub y: u8,
}

impl Cursor {
    pub fn right(&mut self) {
        self.x = self.x.wrapping_add(1);
    }

    pub fn left(&mut self) {
        self.x = self.x.wrapping_sub(1);
    }

    pub fn up(&mut self) {
        self.y = self.y.wrapping_add(1);
    }

    pub fn down(&mut self) {
        self.y = self.y.wrapping_sub(1);
    }
}

/// Frame buffer plus cursor, owned by the interpreter.
#[derive(Debug, Default, Clone)]
pub struct Screen {
    pub frame: FrameBuffer,
    pub cursor: Cursor,
}

impl Screen {
    /// Paint the pixel under the cursor.
    pub fn paint(&mut self, value: u8) {
        self.frame.set_gray(self.cursor.x, self.cursor.y, value);
    }
}

/// Double-buffered key state.
///
/// Backends record presses and releases with [`KeyLatch::set`] as events
/// arrive; [`KeyLatch::latch`] snapshots that live state once per frame, and
/// [`KeyLatch::take`] drains the snapshot lowest key first.
#[derive(Clone)]
pub struct KeyLatch {
    live: [bool; 256],
    pending: [bool; 256],
}

impl KeyLatch {
    pub fn new() -> Self {
        Self { live: [false; 256], pending: [false; 256] }
    }

    pub fn set(&mut self, key: u8, pressed: bool) {
        self.live[key as usize] = pressed;
    }

    pub fn latch(&mut self) {
        self.pending = self.live;
    }

    pub fn take(&mut self) -> u8 {
        for key in 1..=u8::MAX {
            let slot = &mut self.pending[key as usize];
            if *slot {
                *slot = false;
                return key;
            }
        }
        0
    }
}

impl Default for KeyLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// A display with no window: it paces frames, counts them, and lets callers
/// inject key state.
pub struct HeadlessDisplay {
    keys: KeyLatch,
    frame_interval: Option<Duration>,
    next_deadline: Option<Instant>,
    frames: u64,
    rate_frames: u32,
    rate_start: Instant,
}

impl HeadlessDisplay {
    /// Pace presented frames to `frame_rate` Hz. A rate of 0 disables pacing.
    pub fn new(frame_rate: u32) -> Self {
        let frame_interval =
            (frame_rate > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(frame_rate)));
        Self {
            keys: KeyLatch::new(),
            frame_interval,
            next_deadline: None,
            frames: 0,
            rate_frames: 0,
            rate_start: Instant::now(),
        }
    }

    pub fn unpaced() -> Self {
        Self::new(0)
    }

    pub fn press_key(&mut self, key: u8) {
        self.keys.set(key, true);
    }

    pub fn release_key(&mut self, key: u8) {
        self.keys.set(key, false);
    }

    /// Total frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn pace(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        let now = Instant::now();
        if let Some(deadline) = self.next_deadline {
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }
        self.next_deadline = Some(Instant::now() + interval);
    }

    fn count_frame(&mut self) {
        self.frames += 1;
        self.rate_frames += 1;
        if self.rate_start.elapsed() >= Duration::from_secs(1) {
            log::debug!("{} frames/s", self.rate_frames);
            self.rate_frames = 0;
            self.rate_start = Instant::now();
        }
    }
}

impl DisplayPort for HeadlessDisplay {
    fn present_frame(&mut self, _frame: &FrameBuffer) -> io::Result<()> {
        self.keys.latch();
        self.pace();
        self.count_frame();
        Ok(())
    }

    fn poll_last_key(&mut self) -> u8 {
        self.keys.take()
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::unpaced()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_in_both_axes() {
        let mut cursor = Cursor::default();
        cursor.left();
        cursor.down();
        assert_eq!(cursor, Cursor { x: 255, y: 255 });
        cursor.right();
        cursor.up();
        assert_eq!(cursor, Cursor { x: 0, y: 0 });
    }

    #[test]
    fn paint_sets_all_three_channels() {
        let mut screen = Screen::default();
        screen.cursor = Cursor { x: 3, y: 2 };
        screen.paint(0x80);
        assert_eq!(screen.frame.pixel(3, 2), [0x80; 3]);
        let at = 3 * (256 * 2 + 3);
        assert_eq!(&screen.frame.as_bytes()[at..at + 3], &[0x80; 3]);
        assert_eq!(screen.frame.pixel(2, 3), [0; 3]);
    }

    #[test]
    fn key_latch_reports_lowest_key_once() {
        let mut keys = KeyLatch::new();
        keys.set(b'w', true);
        keys.set(b'a', true);
        assert_eq!(keys.take(), 0, "nothing is pending before a frame");

        keys.latch();
        assert_eq!(keys.take(), b'a');
        assert_eq!(keys.take(), b'w');
        assert_eq!(keys.take(), 0);
    }

    #[test]
    fn key_zero_is_never_reported() {
        let mut keys = KeyLatch::new();
        keys.set(0, true);
        keys.latch();
        assert_eq!(keys.take(), 0);
    }

    #[test]
    fn released_keys_drop_out_on_next_frame() {
        let mut display = HeadlessDisplay::unpaced();
        let frame = FrameBuffer::new();
        display.press_key(b' ');
        display.present_frame(&frame).unwrap();
        display.release_key(b' ');
        display.present_frame(&frame).unwrap();
        assert_eq!(display.poll_last_key(), 0);
        assert_eq!(display.frames(), 2);
    }

    #[test]
    fn paced_display_waits_between_frames() {
        let mut display = HeadlessDisplay::new(100);
        let frame = FrameBuffer::new();
        let start = Instant::now();
        for _ in 0..3 {
            display.present_frame(&frame).unwrap();
        }
        // The first frame is immediate, the next two wait ~10ms each.
        assert!(start.elapsed() >= Duration::from_millis(18));
    }
}
