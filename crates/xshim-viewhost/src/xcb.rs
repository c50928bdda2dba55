//! [`WindowSystem`] backed by the dynamically loaded libxcb.
//!
//! Every call goes through the [`XcbProcs`] table owned by the embedded
//! [`XcbLoader`]. Calls made before the table is loaded or without a live
//! connection are dropped, and queries return `None`.

use std::ffi::{c_char, c_int, c_void};
use std::ptr;

use tracing::{debug, error, trace};
use xshim_loader::ffi::*;
use xshim_loader::{XcbLoader, XcbProcs};

use crate::event::{KeyDirection, KeyEvent, XcbEvent};
use crate::system::{CreateWindow, Geometry, PropertyData, ScreenInfo, WindowSystem};
use crate::{Atom, Keysym, NativeWindow, ViewHostError};

/// libxcb allocation (event or reply) released with `free` on drop.
struct XcbBox<T>(*mut T);

impl<T> Drop for XcbBox<T> {
    fn drop(&mut self) {
        // SAFETY: libxcb allocates events and replies with malloc and hands
        // ownership to the caller.
        unsafe { libc::free(self.0 as *mut c_void) };
    }
}

/// Live XCB backend.
pub struct XcbSystem {
    loader: XcbLoader,
    connection: *mut xcb_connection_t,
    key_symbols: *mut xcb_key_symbols_t,
}

impl XcbSystem {
    /// Backend with no connection yet; [`WindowSystem::connect`] opens one.
    pub fn new() -> Self {
        Self {
            loader: XcbLoader::new(),
            connection: ptr::null_mut(),
            key_symbols: ptr::null_mut(),
        }
    }

    /// Backend driving a connection owned by someone else.
    ///
    /// # Safety
    ///
    /// `connection` must be a live XCB connection that stays open for as long
    /// as the returned value is in use.
    pub unsafe fn from_raw_connection(connection: *mut xcb_connection_t) -> Self {
        Self {
            loader: XcbLoader::new(),
            connection,
            key_symbols: ptr::null_mut(),
        }
    }

    /// The underlying connection, null until connected.
    pub fn raw_connection(&self) -> *mut xcb_connection_t {
        self.connection
    }

    pub fn loader(&self) -> &XcbLoader {
        &self.loader
    }

    /// Run `f` with the procs table and a non-null connection.
    fn with_connection<R>(&self, f: impl FnOnce(&XcbProcs, *mut xcb_connection_t) -> R) -> Option<R> {
        let procs = self.loader.get_procs_table()?;
        if self.connection.is_null() {
            trace!("XCB request dropped: not connected");
            return None;
        }
        Some(f(procs, self.connection))
    }

    fn display_name() -> Option<String> {
        std::env::var("DISPLAY").ok()
    }

    fn select_screen(
        procs: &XcbProcs,
        connection: *mut xcb_connection_t,
        screen_number: c_int,
    ) -> Option<ScreenInfo> {
        // SAFETY: connection is live; the setup block and the screens it
        // describes are owned by the connection and outlive this call.
        unsafe {
            let setup = (procs.get_setup)(connection);
            if setup.is_null() {
                return None;
            }
            let mut iter = (procs.setup_roots_iterator)(setup);
            for _ in 0..screen_number {
                (procs.screen_next)(&mut iter);
            }
            if iter.rem <= 0 || iter.data.is_null() {
                return None;
            }
            let screen = *iter.data;
            Some(ScreenInfo {
                number: screen_number,
                root: screen.root,
                root_visual: screen.root_visual,
                black_pixel: screen.black_pixel,
                white_pixel: screen.white_pixel,
                width_in_pixels: screen.width_in_pixels,
                height_in_pixels: screen.height_in_pixels,
            })
        }
    }
}

impl Default for XcbSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowSystem for XcbSystem {
    fn load(&mut self) -> Result<(), ViewHostError> {
        self.loader.init().map_err(ViewHostError::from)
    }

    fn connect(&mut self) -> Result<ScreenInfo, ViewHostError> {
        let procs = *self
            .loader
            .get_procs_table()
            .ok_or(ViewHostError::NotInitialized)?;
        let failure = || ViewHostError::ConnectionFailure {
            display: Self::display_name(),
        };

        let mut screen_number: c_int = 0;
        // SAFETY: a null display name selects $DISPLAY; screen_number is a
        // valid out pointer.
        let connection = unsafe { (procs.connect)(ptr::null(), &mut screen_number) };
        if connection.is_null() {
            error!("xcb_connect returned no connection");
            return Err(failure());
        }

        // SAFETY: connection was just returned by xcb_connect. An errored
        // connection still has to be released with xcb_disconnect.
        if unsafe { (procs.connection_has_error)(connection) } != 0 {
            error!(display = ?Self::display_name(), "XCB connection is in an error state");
            unsafe { (procs.disconnect)(connection) };
            return Err(failure());
        }

        let Some(screen) = Self::select_screen(&procs, connection, screen_number) else {
            error!(screen_number, "Preferred screen not present in connection setup");
            // SAFETY: connection is live and not shared yet.
            unsafe { (procs.disconnect)(connection) };
            return Err(failure());
        };

        self.connection = connection;
        debug!(?screen, "Connected to X server");
        Ok(screen)
    }

    fn disconnect(&mut self) {
        if let Some(()) = self.with_connection(|procs, c| {
            // SAFETY: c is the live connection; it is nulled below so it is
            // never used again.
            unsafe { (procs.disconnect)(c) }
        }) {
            self.connection = ptr::null_mut();
            debug!("Disconnected from X server");
        }
    }

    fn generate_id(&mut self) -> u32 {
        // SAFETY: c is a live connection.
        self.with_connection(|procs, c| unsafe { (procs.generate_id)(c) })
            .unwrap_or(0)
    }

    fn enable_detectable_auto_repeat(&mut self) {
        self.with_connection(|procs, c| {
            // SAFETY: c is a live connection; the replies are never awaited.
            unsafe {
                (procs.xkb_use_extension)(c, XCB_XKB_MAJOR_VERSION, XCB_XKB_MINOR_VERSION);
                (procs.xkb_per_client_flags)(
                    c,
                    XCB_XKB_ID_USE_CORE_KBD,
                    XCB_XKB_PER_CLIENT_FLAG_DETECTABLE_AUTO_REPEAT,
                    XCB_XKB_PER_CLIENT_FLAG_DETECTABLE_AUTO_REPEAT,
                    0,
                    0,
                    0,
                );
            }
        });
    }

    fn create_window(&mut self, request: &CreateWindow) {
        // Value list entries are ordered by mask bit.
        let values = [request.background_pixel, request.event_mask];
        self.with_connection(|procs, c| {
            // SAFETY: values outlives the call and matches value_mask.
            unsafe {
                (procs.create_window)(
                    c,
                    XCB_COPY_FROM_PARENT,
                    request.window,
                    request.parent,
                    0,
                    0,
                    request.width,
                    request.height,
                    0,
                    XCB_WINDOW_CLASS_INPUT_OUTPUT,
                    request.visual,
                    XCB_CW_BACK_PIXEL | XCB_CW_EVENT_MASK,
                    values.as_ptr(),
                )
            }
        });
    }

    fn create_pixmap(&mut self, depth: u8, pixmap: u32, drawable: NativeWindow, width: u16, height: u16) {
        self.with_connection(|procs, c| {
            // SAFETY: c is a live connection; ids were generated on it.
            unsafe { (procs.create_pixmap)(c, depth, pixmap, drawable, width, height) }
        });
    }

    fn create_cursor(&mut self, cursor: u32, source: u32, mask: u32) {
        self.with_connection(|procs, c| {
            // SAFETY: c is a live connection; ids were generated on it.
            unsafe { (procs.create_cursor)(c, cursor, source, mask, 0, 0, 0, 0, 0, 0, 0, 0) }
        });
    }

    fn set_window_cursor(&mut self, window: NativeWindow, cursor: u32) {
        self.with_connection(|procs, c| {
            // SAFETY: cursor outlives the call and is the single value for
            // XCB_CW_CURSOR.
            unsafe {
                (procs.change_window_attributes)(
                    c,
                    window,
                    XCB_CW_CURSOR,
                    &cursor as *const u32 as *const c_void,
                )
            }
        });
    }

    fn change_property(&mut self, window: NativeWindow, property: Atom, kind: Atom, data: PropertyData<'_>) {
        let Ok(len) = u32::try_from(data.len()) else {
            error!(property, len = data.len(), "Property payload too large");
            return;
        };
        let bytes = match data {
            PropertyData::Card32(words) => words.as_ptr() as *const c_void,
            PropertyData::Str(bytes) => bytes.as_ptr() as *const c_void,
        };
        self.with_connection(|procs, c| {
            // SAFETY: bytes points at len elements of the given format.
            unsafe {
                (procs.change_property)(
                    c,
                    XCB_PROP_MODE_REPLACE,
                    window,
                    property,
                    kind,
                    data.format(),
                    len,
                    bytes,
                )
            }
        });
    }

    fn intern_atom(&mut self, name: &str, only_if_exists: bool) -> Option<Atom> {
        let name_len = u16::try_from(name.len()).ok()?;
        self.with_connection(|procs, c| {
            // SAFETY: name is valid for name_len bytes (no terminator needed);
            // the reply is owned by us and freed by XcbBox.
            unsafe {
                let cookie = (procs.intern_atom)(
                    c,
                    u8::from(only_if_exists),
                    name_len,
                    name.as_ptr() as *const c_char,
                );
                let reply = (procs.intern_atom_reply)(c, cookie, ptr::null_mut());
                if reply.is_null() {
                    return None;
                }
                let reply = XcbBox(reply);
                Some((*reply.0).atom)
            }
        })
        .flatten()
    }

    fn map_window(&mut self, window: NativeWindow) {
        // SAFETY: c is a live connection.
        self.with_connection(|procs, c| unsafe { (procs.map_window)(c, window) });
    }

    fn unmap_window(&mut self, window: NativeWindow) {
        // SAFETY: c is a live connection.
        self.with_connection(|procs, c| unsafe { (procs.unmap_window)(c, window) });
    }

    fn destroy_window(&mut self, window: NativeWindow) {
        // SAFETY: c is a live connection.
        self.with_connection(|procs, c| unsafe { (procs.destroy_window)(c, window) });
    }

    fn flush(&mut self) {
        // SAFETY: c is a live connection.
        self.with_connection(|procs, c| unsafe { (procs.flush)(c) });
    }

    fn warp_pointer(&mut self, window: NativeWindow, x: i16, y: i16) {
        self.with_connection(|procs, c| {
            // SAFETY: c is a live connection.
            unsafe { (procs.warp_pointer)(c, window, window, 0, 0, 0, 0, x, y) }
        });
    }

    fn get_geometry(&mut self, window: NativeWindow) -> Option<Geometry> {
        self.with_connection(|procs, c| {
            // SAFETY: the reply is owned by us and freed by XcbBox.
            unsafe {
                let cookie = (procs.get_geometry)(c, window);
                let reply = (procs.get_geometry_reply)(c, cookie, ptr::null_mut());
                if reply.is_null() {
                    return None;
                }
                let reply = XcbBox(reply);
                let geometry = &*reply.0;
                Some(Geometry {
                    x: geometry.x,
                    y: geometry.y,
                    width: geometry.width,
                    height: geometry.height,
                })
            }
        })
        .flatten()
    }

    fn poll_for_event(&mut self) -> Option<XcbEvent> {
        self.with_connection(|procs, c| {
            // SAFETY: a non-null event is a complete malloc'd event that we
            // now own; it is decoded by value and freed by XcbBox.
            unsafe {
                let raw = (procs.poll_for_event)(c);
                if raw.is_null() {
                    return None;
                }
                let raw = XcbBox(raw);
                Some(XcbEvent::from_raw(raw.0))
            }
        })
        .flatten()
    }

    fn alloc_key_symbols(&mut self) {
        self.free_key_symbols();
        // SAFETY: c is a live connection.
        if let Some(symbols) = self.with_connection(|procs, c| unsafe { (procs.key_symbols_alloc)(c) }) {
            self.key_symbols = symbols;
        }
    }

    fn free_key_symbols(&mut self) {
        if self.key_symbols.is_null() {
            return;
        }
        if let Some(procs) = self.loader.get_procs_table() {
            // SAFETY: key_symbols came from xcb_key_symbols_alloc and is
            // nulled right after, so it is freed once.
            unsafe { (procs.key_symbols_free)(self.key_symbols) };
        }
        self.key_symbols = ptr::null_mut();
    }

    fn lookup_keysym(&mut self, event: &KeyEvent, direction: KeyDirection) -> Keysym {
        let Some(procs) = self.loader.get_procs_table() else {
            return 0;
        };
        if self.key_symbols.is_null() {
            return 0;
        }

        // The lookup only reads `detail`; the rest is filled for completeness.
        let mut native = xcb_key_press_event_t {
            response_type: match direction {
                KeyDirection::Pressed => XCB_KEY_PRESS,
                KeyDirection::Released => XCB_KEY_RELEASE,
            },
            detail: event.keycode,
            time: event.time,
            state: event.state,
            ..Default::default()
        };

        // SAFETY: key_symbols is live and native is a valid event for the
        // duration of the call.
        unsafe {
            match direction {
                KeyDirection::Pressed => (procs.key_press_lookup_keysym)(self.key_symbols, &mut native, 0),
                KeyDirection::Released => {
                    (procs.key_release_lookup_keysym)(self.key_symbols, &mut native, 0)
                }
            }
        }
    }
}

impl Drop for XcbSystem {
    fn drop(&mut self) {
        // The connection itself belongs to the window (owned) or the caller
        // (adopted); only the keysym table is ours.
        self.free_key_symbols();
    }
}
