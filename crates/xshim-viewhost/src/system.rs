//! The windowing operations the adapter needs, as a trait.
//!
//! [`XcbSystem`](crate::XcbSystem) forwards each call to libxcb through the
//! resolved symbol table. With the `test-util` feature an in-memory
//! `FakeSystem` records calls so the event loop can be tested without an
//! X server.

use crate::event::{KeyDirection, KeyEvent, XcbEvent};
use crate::{Atom, Keysym, NativeWindow, ViewHostError};
use xshim_loader::ffi::{
    XCB_EVENT_MASK_BUTTON_PRESS, XCB_EVENT_MASK_BUTTON_RELEASE, XCB_EVENT_MASK_EXPOSURE,
    XCB_EVENT_MASK_KEY_PRESS, XCB_EVENT_MASK_KEY_RELEASE, XCB_EVENT_MASK_POINTER_MOTION,
    XCB_EVENT_MASK_STRUCTURE_NOTIFY,
};

/// Events every shim window subscribes to.
pub const WINDOW_EVENT_MASK: u32 = XCB_EVENT_MASK_POINTER_MOTION
    | XCB_EVENT_MASK_BUTTON_PRESS
    | XCB_EVENT_MASK_BUTTON_RELEASE
    | XCB_EVENT_MASK_KEY_PRESS
    | XCB_EVENT_MASK_KEY_RELEASE
    | XCB_EVENT_MASK_EXPOSURE
    | XCB_EVENT_MASK_STRUCTURE_NOTIFY;

/// The screen selected when the connection was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenInfo {
    pub number: i32,
    pub root: NativeWindow,
    pub root_visual: u32,
    pub black_pixel: u32,
    pub white_pixel: u32,
    pub width_in_pixels: u16,
    pub height_in_pixels: u16,
}

/// Geometry reply for an existing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// Parameters of a `CreateWindow` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateWindow {
    pub window: NativeWindow,
    pub parent: NativeWindow,
    pub visual: u32,
    pub width: u16,
    pub height: u16,
    pub background_pixel: u32,
    pub event_mask: u32,
}

/// Property payload, tagged with its wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyData<'a> {
    /// Format 32 (CARDINAL, ATOM, WM_SIZE_HINTS, ...)
    Card32(&'a [u32]),
    /// Format 8 (STRING)
    Str(&'a [u8]),
}

impl PropertyData<'_> {
    pub fn format(&self) -> u8 {
        match self {
            PropertyData::Card32(_) => 32,
            PropertyData::Str(_) => 8,
        }
    }

    /// Number of `format`-sized elements.
    pub fn len(&self) -> usize {
        match self {
            PropertyData::Card32(words) => words.len(),
            PropertyData::Str(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// ICCCM `WM_SIZE_HINTS`, laid out as the 18 words of the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeHints {
    pub flags: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect_num: i32,
    pub min_aspect_den: i32,
    pub max_aspect_num: i32,
    pub max_aspect_den: i32,
    pub base_width: i32,
    pub base_height: i32,
    pub win_gravity: u32,
}

impl SizeHints {
    pub const US_SIZE: u32 = 1 << 1;
    pub const P_SIZE: u32 = 1 << 3;
    pub const P_MIN_SIZE: u32 = 1 << 4;
    pub const P_MAX_SIZE: u32 = 1 << 5;

    pub const WORDS: usize = 18;

    /// Hints for a window the window manager must not resize.
    pub fn fixed(width: u16, height: u16) -> Self {
        let (width, height) = (i32::from(width), i32::from(height));
        Self {
            flags: Self::P_MAX_SIZE | Self::P_MIN_SIZE | Self::P_SIZE | Self::US_SIZE,
            width,
            height,
            min_width: width,
            min_height: height,
            max_width: width,
            max_height: height,
            ..Default::default()
        }
    }

    pub fn is_resizable(&self) -> bool {
        let bounded = Self::P_MIN_SIZE | Self::P_MAX_SIZE;
        self.flags & bounded != bounded
            || self.min_width != self.max_width
            || self.min_height != self.max_height
    }

    pub fn to_words(&self) -> [u32; Self::WORDS] {
        // Signed fields travel as their two's complement bit pattern.
        [
            self.flags,
            self.x as u32,
            self.y as u32,
            self.width as u32,
            self.height as u32,
            self.min_width as u32,
            self.min_height as u32,
            self.max_width as u32,
            self.max_height as u32,
            self.width_inc as u32,
            self.height_inc as u32,
            self.min_aspect_num as u32,
            self.min_aspect_den as u32,
            self.max_aspect_num as u32,
            self.max_aspect_den as u32,
            self.base_width as u32,
            self.base_height as u32,
            self.win_gravity,
        ]
    }

    pub fn from_words(words: &[u32]) -> Option<Self> {
        let w: &[u32; Self::WORDS] = words.try_into().ok()?;
        Some(Self {
            flags: w[0],
            x: w[1] as i32,
            y: w[2] as i32,
            width: w[3] as i32,
            height: w[4] as i32,
            min_width: w[5] as i32,
            min_height: w[6] as i32,
            max_width: w[7] as i32,
            max_height: w[8] as i32,
            width_inc: w[9] as i32,
            height_inc: w[10] as i32,
            min_aspect_num: w[11] as i32,
            min_aspect_den: w[12] as i32,
            max_aspect_num: w[13] as i32,
            max_aspect_den: w[14] as i32,
            base_width: w[15] as i32,
            base_height: w[16] as i32,
            win_gravity: w[17],
        })
    }
}

/// Native windowing operations used by [`XcbWindow`](crate::XcbWindow).
///
/// Requests are fire-and-forget, like their XCB counterparts; only the calls
/// that wait for a reply can fail.
pub trait WindowSystem {
    /// Make the native entry points available.
    fn load(&mut self) -> Result<(), ViewHostError>;

    /// Connect to the display named by `$DISPLAY` and select its screen.
    fn connect(&mut self) -> Result<ScreenInfo, ViewHostError>;

    fn disconnect(&mut self);

    fn generate_id(&mut self) -> u32;

    /// Ask XKB to report held keys as a single press instead of
    /// release/press pairs.
    fn enable_detectable_auto_repeat(&mut self);

    fn create_window(&mut self, request: &CreateWindow);

    fn create_pixmap(&mut self, depth: u8, pixmap: u32, drawable: NativeWindow, width: u16, height: u16);

    fn create_cursor(&mut self, cursor: u32, source: u32, mask: u32);

    fn set_window_cursor(&mut self, window: NativeWindow, cursor: u32);

    fn change_property(&mut self, window: NativeWindow, property: Atom, kind: Atom, data: PropertyData<'_>);

    /// Intern `name`. Returns `None` if the server did not reply, and
    /// `Some(XCB_ATOM_NONE)` for a missing atom with `only_if_exists`.
    fn intern_atom(&mut self, name: &str, only_if_exists: bool) -> Option<Atom>;

    fn map_window(&mut self, window: NativeWindow);

    fn unmap_window(&mut self, window: NativeWindow);

    fn destroy_window(&mut self, window: NativeWindow);

    fn flush(&mut self);

    /// Move the pointer to `(x, y)` relative to `window`.
    fn warp_pointer(&mut self, window: NativeWindow, x: i16, y: i16);

    fn get_geometry(&mut self, window: NativeWindow) -> Option<Geometry>;

    /// Non-blocking; `None` when the queue is empty.
    fn poll_for_event(&mut self) -> Option<XcbEvent>;

    fn alloc_key_symbols(&mut self);

    fn free_key_symbols(&mut self);

    /// Keysym in column 0 for the event's keycode; 0 (`NoSymbol`) when
    /// nothing is mapped or the lookup table is gone.
    fn lookup_keysym(&mut self, event: &KeyEvent, direction: KeyDirection) -> Keysym;
}
