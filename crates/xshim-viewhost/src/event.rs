//! # Native Events and Key Ids
//!
//! Native XCB events are decoded into [`XcbEvent`] as soon as they are polled,
//! so the dispatcher never touches libxcb memory. Keyboard and mouse input is
//! reported to the host as [`KeyId`] values.

use xshim_loader::ffi::{
    xcb_client_message_event_t, xcb_destroy_notify_event_t, xcb_expose_event_t,
    xcb_generic_event_t, xcb_key_press_event_t, XCB_BUTTON_PRESS, XCB_BUTTON_RELEASE,
    XCB_CLIENT_MESSAGE, XCB_DESTROY_NOTIFY, XCB_EVENT_RESPONSE_TYPE_MASK, XCB_EXPOSE,
    XCB_KEY_PRESS, XCB_KEY_RELEASE, XCB_MOTION_NOTIFY,
};

use crate::{Atom, Keysym, NativeWindow};

/// Logical key identifier delivered to the host.
///
/// Values are X keysyms. Lowercase letters are folded to uppercase and mouse
/// buttons use the `XK_Pointer_Button*` keysyms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u32);

impl KeyId {
    pub const BACKSPACE: KeyId = KeyId(0xff08);
    pub const TAB: KeyId = KeyId(0xff09);
    pub const RETURN: KeyId = KeyId(0xff0d);
    pub const ESCAPE: KeyId = KeyId(0xff1b);
    pub const SPACE: KeyId = KeyId(0x0020);
    pub const LEFT: KeyId = KeyId(0xff51);
    pub const UP: KeyId = KeyId(0xff52);
    pub const RIGHT: KeyId = KeyId(0xff53);
    pub const DOWN: KeyId = KeyId(0xff54);
    pub const SHIFT_L: KeyId = KeyId(0xffe1);
    pub const CONTROL_L: KeyId = KeyId(0xffe3);
    pub const F1: KeyId = KeyId(0xffbe);

    pub const LBUTTON: KeyId = KeyId(0xfee9);
    pub const MBUTTON: KeyId = KeyId(0xfeea);
    pub const RBUTTON: KeyId = KeyId(0xfeeb);

    /// Build a key id from a resolved keysym, folding `a..=z` to uppercase.
    pub fn from_keysym(sym: Keysym) -> Self {
        if (u32::from(b'a')..=u32::from(b'z')).contains(&sym) {
            KeyId(sym - u32::from(b'a' - b'A'))
        } else {
            KeyId(sym)
        }
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// The printable ASCII character for this key, if it has one.
    pub fn as_char(&self) -> Option<char> {
        u8::try_from(self.0)
            .ok()
            .filter(|byte| (0x20..0x7f).contains(byte))
            .map(char::from)
    }
}

/// Mouse buttons the shim reports. Wheel and extra buttons are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Map a core protocol button number (`detail`) to a button.
    pub fn from_detail(detail: u8) -> Option<Self> {
        match detail {
            1 => Some(MouseButton::Left),
            2 => Some(MouseButton::Middle),
            3 => Some(MouseButton::Right),
            _ => None,
        }
    }

    pub fn key_id(&self) -> KeyId {
        match self {
            MouseButton::Left => KeyId::LBUTTON,
            MouseButton::Middle => KeyId::MBUTTON,
            MouseButton::Right => KeyId::RBUTTON,
        }
    }
}

/// Key press/release payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub keycode: u8,
    pub state: u16,
    pub time: u32,
}

/// Button press/release payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonEvent {
    pub button: u8,
    pub time: u32,
}

/// Which keysym lookup entry point applies to a [`KeyEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Pressed,
    Released,
}

/// A decoded native event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XcbEvent {
    ClientMessage {
        window: NativeWindow,
        message_type: Atom,
        data: [u32; 5],
    },
    DestroyNotify {
        window: NativeWindow,
    },
    MotionNotify {
        x: i16,
        y: i16,
        time: u32,
    },
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    Expose {
        window: NativeWindow,
        count: u16,
    },
    /// Anything the shim does not subscribe to or care about.
    Other {
        response_type: u8,
    },
}

impl XcbEvent {
    /// Decode a native event.
    ///
    /// # Safety
    ///
    /// `raw` must point to a complete event as returned by
    /// `xcb_poll_for_event` (at least `size_of::<xcb_generic_event_t>()` bytes).
    pub unsafe fn from_raw(raw: *const xcb_generic_event_t) -> Self {
        let response_type = unsafe { (*raw).response_type } & XCB_EVENT_RESPONSE_TYPE_MASK;

        match response_type {
            XCB_CLIENT_MESSAGE => {
                let ev = unsafe { &*(raw as *const xcb_client_message_event_t) };
                XcbEvent::ClientMessage {
                    window: ev.window,
                    message_type: ev.type_,
                    data: ev.data32,
                }
            }
            XCB_DESTROY_NOTIFY => {
                let ev = unsafe { &*(raw as *const xcb_destroy_notify_event_t) };
                XcbEvent::DestroyNotify { window: ev.window }
            }
            XCB_MOTION_NOTIFY => {
                let ev = unsafe { &*(raw as *const xcb_key_press_event_t) };
                XcbEvent::MotionNotify {
                    x: ev.event_x,
                    y: ev.event_y,
                    time: ev.time,
                }
            }
            XCB_KEY_PRESS | XCB_KEY_RELEASE => {
                let ev = unsafe { &*(raw as *const xcb_key_press_event_t) };
                let key = KeyEvent {
                    keycode: ev.detail,
                    state: ev.state,
                    time: ev.time,
                };
                if response_type == XCB_KEY_PRESS {
                    XcbEvent::KeyPress(key)
                } else {
                    XcbEvent::KeyRelease(key)
                }
            }
            XCB_BUTTON_PRESS | XCB_BUTTON_RELEASE => {
                let ev = unsafe { &*(raw as *const xcb_key_press_event_t) };
                let button = ButtonEvent {
                    button: ev.detail,
                    time: ev.time,
                };
                if response_type == XCB_BUTTON_PRESS {
                    XcbEvent::ButtonPress(button)
                } else {
                    XcbEvent::ButtonRelease(button)
                }
            }
            XCB_EXPOSE => {
                let ev = unsafe { &*(raw as *const xcb_expose_event_t) };
                XcbEvent::Expose {
                    window: ev.window,
                    count: ev.count,
                }
            }
            response_type => XcbEvent::Other { response_type },
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            XcbEvent::ClientMessage { .. } => "ClientMessage",
            XcbEvent::DestroyNotify { .. } => "DestroyNotify",
            XcbEvent::MotionNotify { .. } => "MotionNotify",
            XcbEvent::KeyPress(_) => "KeyPress",
            XcbEvent::KeyRelease(_) => "KeyRelease",
            XcbEvent::ButtonPress(_) => "ButtonPress",
            XcbEvent::ButtonRelease(_) => "ButtonRelease",
            XcbEvent::Expose { .. } => "Expose",
            XcbEvent::Other { .. } => "Other",
        }
    }
}
