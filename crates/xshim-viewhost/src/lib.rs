//! # XShim ViewHost
//!
//! XCB window hosting layer for the shim.
//! Creates or adopts a top-level window on an XCB connection and turns
//! native events into a small set of host notifications.
//!
//! ## Design Goals
//!
//! 1. **Explicit ownership**: owned windows tear down their connection, adopted ones never do
//! 2. **Testable dispatch**: every native call goes through [`WindowSystem`], so the event loop runs against an in-memory backend (`test-util` feature)
//! 3. **No fallthrough**: each [`XcbEvent`] kind has its own handler
//! 4. **Fixed geometry**: size hints pin min = max = requested size

mod event;
#[cfg(any(test, feature = "test-util"))]
mod fake;
mod system;
mod window;
mod xcb;

use thiserror::Error;
use xshim_common::ConfigError;
use xshim_loader::LoaderError;

pub use event::{ButtonEvent, KeyDirection, KeyEvent, KeyId, MouseButton, XcbEvent};
#[cfg(any(test, feature = "test-util"))]
pub use fake::{FakeSystem, PropertyValue, SystemCall};
pub use system::{
    CreateWindow, Geometry, PropertyData, ScreenInfo, SizeHints, WindowSystem, WINDOW_EVENT_MASK,
};
pub use window::{CloseHandle, Ownership, WindowState, XcbWindow, POINTER_RECENTER};
pub use xcb::XcbSystem;

/// X11 window id.
pub type NativeWindow = u32;

/// Interned X11 atom.
pub type Atom = u32;

/// X11 keysym.
pub type Keysym = u32;

/// Unique identifier for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

impl WindowId {
    /// Create a new unique WindowId.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur in the ViewHost.
#[derive(Error, Debug)]
pub enum ViewHostError {
    #[error("XCB libraries unavailable: {0}")]
    LoaderUnavailable(#[from] LoaderError),

    #[error("Failed to connect to X display {}", .display.as_deref().unwrap_or("(default)"))]
    ConnectionFailure { display: Option<String> },

    #[error("Failed to query geometry of window {0:#x}")]
    GeometryQueryFailure(NativeWindow),

    #[error("{operation} is only valid on owned windows")]
    NotOwned { operation: &'static str },

    #[error("Window is not initialized")]
    NotInitialized,

    #[error("Invalid window configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Notifications emitted by a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window is closing; fired once per window.
    AboutToClose { window: WindowId },
    /// The user or window manager asked the window to close.
    CloseEvent { window: WindowId },
    /// Relative pointer motion since the previous motion event.
    MouseMoved { window: WindowId, dx: i32, dy: i32 },
    KeypressPressed { window: WindowId, key: KeyId },
    KeypressReleased { window: WindowId, key: KeyId },
}

impl WindowEvent {
    pub fn window(&self) -> WindowId {
        match self {
            WindowEvent::AboutToClose { window }
            | WindowEvent::CloseEvent { window }
            | WindowEvent::MouseMoved { window, .. }
            | WindowEvent::KeypressPressed { window, .. }
            | WindowEvent::KeypressReleased { window, .. } => *window,
        }
    }
}

/// Callback for window notifications.
pub type EventCallback = Box<dyn FnMut(&WindowEvent)>;

/// Callback invoked once per idle iteration and on expose.
pub type PresentCallback = Box<dyn FnMut()>;
