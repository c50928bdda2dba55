//! Raw XCB type definitions
//!
//! Only the subset of `xcb/xcb.h`, `xcb/xcb_keysyms.h` and `xcb/xkb.h` that the
//! shim touches. Connection, setup and key-symbol tables are opaque; we only
//! work with pointers to them. Event and reply layouts must match libxcb
//! exactly since they are read straight out of libxcb-allocated memory.

use std::ffi::{c_char, c_int, c_uint, c_void};

/// Opaque XCB connection
#[repr(C)]
pub struct xcb_connection_t {
    _private: [u8; 0],
}

/// Opaque connection setup block
#[repr(C)]
pub struct xcb_setup_t {
    _private: [u8; 0],
}

/// Opaque keysym lookup table from libxcb-keysyms
#[repr(C)]
pub struct xcb_key_symbols_t {
    _private: [u8; 0],
}

pub type xcb_window_t = u32;
pub type xcb_drawable_t = u32;
pub type xcb_pixmap_t = u32;
pub type xcb_cursor_t = u32;
pub type xcb_colormap_t = u32;
pub type xcb_atom_t = u32;
pub type xcb_visualid_t = u32;
pub type xcb_timestamp_t = u32;
pub type xcb_keysym_t = u32;
pub type xcb_keycode_t = u8;
pub type xcb_button_t = u8;
pub type xcb_xkb_device_spec_t = u16;

/// Cookie returned by requests without a reply
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xcb_void_cookie_t {
    pub sequence: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xcb_intern_atom_cookie_t {
    pub sequence: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xcb_get_geometry_cookie_t {
    pub sequence: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xcb_xkb_use_extension_cookie_t {
    pub sequence: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xcb_xkb_per_client_flags_cookie_t {
    pub sequence: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_generic_error_t {
    pub response_type: u8,
    pub error_code: u8,
    pub sequence: u16,
    pub resource_id: u32,
    pub minor_code: u16,
    pub major_code: u8,
    pub pad0: u8,
    pub pad: [u32; 5],
    pub full_sequence: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_screen_t {
    pub root: xcb_window_t,
    pub default_colormap: xcb_colormap_t,
    pub white_pixel: u32,
    pub black_pixel: u32,
    pub current_input_masks: u32,
    pub width_in_pixels: u16,
    pub height_in_pixels: u16,
    pub width_in_millimeters: u16,
    pub height_in_millimeters: u16,
    pub min_installed_maps: u16,
    pub max_installed_maps: u16,
    pub root_visual: xcb_visualid_t,
    pub backing_stores: u8,
    pub save_unders: u8,
    pub root_depth: u8,
    pub allowed_depths_len: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_screen_iterator_t {
    pub data: *mut xcb_screen_t,
    pub rem: c_int,
    pub index: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_intern_atom_reply_t {
    pub response_type: u8,
    pub pad0: u8,
    pub sequence: u16,
    pub length: u32,
    pub atom: xcb_atom_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_get_geometry_reply_t {
    pub response_type: u8,
    pub depth: u8,
    pub sequence: u16,
    pub length: u32,
    pub root: xcb_window_t,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub pad0: [u8; 2],
}

// ==================== Events ====================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_generic_event_t {
    pub response_type: u8,
    pub pad0: u8,
    pub sequence: u16,
    pub pad: [u32; 7],
    pub full_sequence: u32,
}

/// Shared layout of KeyPress, KeyRelease, ButtonPress, ButtonRelease and
/// MotionNotify.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct xcb_key_press_event_t {
    pub response_type: u8,
    pub detail: xcb_keycode_t,
    pub sequence: u16,
    pub time: xcb_timestamp_t,
    pub root: xcb_window_t,
    pub event: xcb_window_t,
    pub child: xcb_window_t,
    pub root_x: i16,
    pub root_y: i16,
    pub event_x: i16,
    pub event_y: i16,
    pub state: u16,
    pub same_screen: u8,
    pub pad0: u8,
}

pub type xcb_key_release_event_t = xcb_key_press_event_t;
pub type xcb_button_press_event_t = xcb_key_press_event_t;
pub type xcb_button_release_event_t = xcb_key_press_event_t;
pub type xcb_motion_notify_event_t = xcb_key_press_event_t;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_expose_event_t {
    pub response_type: u8,
    pub pad0: u8,
    pub sequence: u16,
    pub window: xcb_window_t,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub count: u16,
    pub pad1: [u8; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_destroy_notify_event_t {
    pub response_type: u8,
    pub pad0: u8,
    pub sequence: u16,
    pub event: xcb_window_t,
    pub window: xcb_window_t,
}

/// `xcb_client_message_data_t` is a 20-byte union; only the 32-bit view is used.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct xcb_client_message_event_t {
    pub response_type: u8,
    pub format: u8,
    pub sequence: u16,
    pub window: xcb_window_t,
    pub type_: xcb_atom_t,
    pub data32: [u32; 5],
}

// ==================== Constants ====================

pub const XCB_KEY_PRESS: u8 = 2;
pub const XCB_KEY_RELEASE: u8 = 3;
pub const XCB_BUTTON_PRESS: u8 = 4;
pub const XCB_BUTTON_RELEASE: u8 = 5;
pub const XCB_MOTION_NOTIFY: u8 = 6;
pub const XCB_EXPOSE: u8 = 12;
pub const XCB_DESTROY_NOTIFY: u8 = 17;
pub const XCB_CLIENT_MESSAGE: u8 = 33;

/// Strips the "sent by SendEvent" bit from `response_type`.
pub const XCB_EVENT_RESPONSE_TYPE_MASK: u8 = 0x7f;

pub const XCB_COPY_FROM_PARENT: u8 = 0;
pub const XCB_WINDOW_CLASS_INPUT_OUTPUT: u16 = 1;

pub const XCB_CW_BACK_PIXEL: u32 = 1 << 1;
pub const XCB_CW_EVENT_MASK: u32 = 1 << 11;
pub const XCB_CW_CURSOR: u32 = 1 << 14;

pub const XCB_EVENT_MASK_KEY_PRESS: u32 = 1 << 0;
pub const XCB_EVENT_MASK_KEY_RELEASE: u32 = 1 << 1;
pub const XCB_EVENT_MASK_BUTTON_PRESS: u32 = 1 << 2;
pub const XCB_EVENT_MASK_BUTTON_RELEASE: u32 = 1 << 3;
pub const XCB_EVENT_MASK_POINTER_MOTION: u32 = 1 << 6;
pub const XCB_EVENT_MASK_EXPOSURE: u32 = 1 << 15;
pub const XCB_EVENT_MASK_STRUCTURE_NOTIFY: u32 = 1 << 17;

pub const XCB_PROP_MODE_REPLACE: u8 = 0;

pub const XCB_ATOM_NONE: xcb_atom_t = 0;
pub const XCB_ATOM_ATOM: xcb_atom_t = 4;
pub const XCB_ATOM_STRING: xcb_atom_t = 31;
pub const XCB_ATOM_WM_NAME: xcb_atom_t = 39;
pub const XCB_ATOM_WM_NORMAL_HINTS: xcb_atom_t = 40;
pub const XCB_ATOM_WM_SIZE_HINTS: xcb_atom_t = 41;

pub const XCB_XKB_MAJOR_VERSION: u16 = 1;
pub const XCB_XKB_MINOR_VERSION: u16 = 0;
pub const XCB_XKB_ID_USE_CORE_KBD: xcb_xkb_device_spec_t = 256;
pub const XCB_XKB_PER_CLIENT_FLAG_DETECTABLE_AUTO_REPEAT: u32 = 1;

// ==================== Entry points ====================

// libxcb-keysyms.so
pub type XcbKeyPressLookupKeysymFn = unsafe extern "C" fn(
    syms: *mut xcb_key_symbols_t,
    event: *mut xcb_key_press_event_t,
    col: c_int,
) -> xcb_keysym_t;
pub type XcbKeyReleaseLookupKeysymFn = unsafe extern "C" fn(
    syms: *mut xcb_key_symbols_t,
    event: *mut xcb_key_release_event_t,
    col: c_int,
) -> xcb_keysym_t;
pub type XcbKeySymbolsAllocFn =
    unsafe extern "C" fn(c: *mut xcb_connection_t) -> *mut xcb_key_symbols_t;
pub type XcbKeySymbolsFreeFn = unsafe extern "C" fn(syms: *mut xcb_key_symbols_t);

// libxcb.so
pub type XcbChangePropertyFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    mode: u8,
    window: xcb_window_t,
    property: xcb_atom_t,
    type_: xcb_atom_t,
    format: u8,
    data_len: u32,
    data: *const c_void,
) -> xcb_void_cookie_t;
pub type XcbConnectFn =
    unsafe extern "C" fn(displayname: *const c_char, screenp: *mut c_int) -> *mut xcb_connection_t;
pub type XcbConnectionHasErrorFn = unsafe extern "C" fn(c: *mut xcb_connection_t) -> c_int;
pub type XcbCreateWindowFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    depth: u8,
    wid: xcb_window_t,
    parent: xcb_window_t,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    border_width: u16,
    class: u16,
    visual: xcb_visualid_t,
    value_mask: u32,
    value_list: *const u32,
) -> xcb_void_cookie_t;
pub type XcbChangeWindowAttributesFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    window: xcb_window_t,
    value_mask: u32,
    value_list: *const c_void,
) -> xcb_void_cookie_t;
pub type XcbDestroyWindowFn =
    unsafe extern "C" fn(c: *mut xcb_connection_t, window: xcb_window_t) -> xcb_void_cookie_t;
pub type XcbDisconnectFn = unsafe extern "C" fn(c: *mut xcb_connection_t);
pub type XcbFlushFn = unsafe extern "C" fn(c: *mut xcb_connection_t) -> c_int;
pub type XcbGenerateIdFn = unsafe extern "C" fn(c: *mut xcb_connection_t) -> u32;
pub type XcbGetGeometryFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    drawable: xcb_drawable_t,
) -> xcb_get_geometry_cookie_t;
pub type XcbGetGeometryReplyFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    cookie: xcb_get_geometry_cookie_t,
    e: *mut *mut xcb_generic_error_t,
) -> *mut xcb_get_geometry_reply_t;
pub type XcbGetSetupFn = unsafe extern "C" fn(c: *mut xcb_connection_t) -> *const xcb_setup_t;
pub type XcbWarpPointerFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    src_window: xcb_window_t,
    dst_window: xcb_window_t,
    src_x: i16,
    src_y: i16,
    src_width: u16,
    src_height: u16,
    dst_x: i16,
    dst_y: i16,
) -> xcb_void_cookie_t;
pub type XcbInternAtomFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    only_if_exists: u8,
    name_len: u16,
    name: *const c_char,
) -> xcb_intern_atom_cookie_t;
pub type XcbInternAtomReplyFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    cookie: xcb_intern_atom_cookie_t,
    e: *mut *mut xcb_generic_error_t,
) -> *mut xcb_intern_atom_reply_t;
pub type XcbMapWindowFn =
    unsafe extern "C" fn(c: *mut xcb_connection_t, window: xcb_window_t) -> xcb_void_cookie_t;
pub type XcbPollForEventFn =
    unsafe extern "C" fn(c: *mut xcb_connection_t) -> *mut xcb_generic_event_t;
pub type XcbWaitForEventFn =
    unsafe extern "C" fn(c: *mut xcb_connection_t) -> *mut xcb_generic_event_t;
pub type XcbSendEventFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    propagate: u8,
    destination: xcb_window_t,
    event_mask: u32,
    event: *const c_char,
) -> xcb_void_cookie_t;
pub type XcbScreenNextFn = unsafe extern "C" fn(i: *mut xcb_screen_iterator_t);
pub type XcbSetupRootsIteratorFn =
    unsafe extern "C" fn(r: *const xcb_setup_t) -> xcb_screen_iterator_t;
pub type XcbUnmapWindowFn =
    unsafe extern "C" fn(c: *mut xcb_connection_t, window: xcb_window_t) -> xcb_void_cookie_t;
pub type XcbCreatePixmapFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    depth: u8,
    pid: xcb_pixmap_t,
    drawable: xcb_drawable_t,
    width: u16,
    height: u16,
) -> xcb_void_cookie_t;
pub type XcbCreateCursorFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    cid: xcb_cursor_t,
    source: xcb_pixmap_t,
    mask: xcb_pixmap_t,
    fore_red: u16,
    fore_green: u16,
    fore_blue: u16,
    back_red: u16,
    back_green: u16,
    back_blue: u16,
    x: u16,
    y: u16,
) -> xcb_void_cookie_t;

// libxcb-xkb.so
pub type XcbXkbUseExtensionFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    wanted_major: u16,
    wanted_minor: u16,
) -> xcb_xkb_use_extension_cookie_t;
pub type XcbXkbPerClientFlagsFn = unsafe extern "C" fn(
    c: *mut xcb_connection_t,
    device_spec: xcb_xkb_device_spec_t,
    change: u32,
    value: u32,
    ctrls_to_change: u32,
    auto_ctrls: u32,
    auto_ctrls_values: u32,
) -> xcb_xkb_per_client_flags_cookie_t;
