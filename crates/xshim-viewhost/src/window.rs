//! Top-level window adapter and its event loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};
use xshim_common::{ConfigError, WindowConfig};
use xshim_loader::ffi::{
    xcb_connection_t, XCB_ATOM_ATOM, XCB_ATOM_NONE, XCB_ATOM_STRING, XCB_ATOM_WM_NAME,
    XCB_ATOM_WM_NORMAL_HINTS, XCB_ATOM_WM_SIZE_HINTS,
};

use crate::event::{ButtonEvent, KeyDirection, KeyEvent, KeyId, MouseButton, XcbEvent};
use crate::system::{CreateWindow, PropertyData, SizeHints, WindowSystem, WINDOW_EVENT_MASK};
use crate::xcb::XcbSystem;
use crate::{
    Atom, EventCallback, NativeWindow, PresentCallback, ViewHostError, WindowEvent, WindowId,
};

/// Pointer position the cursor is warped back to after every reported motion.
pub const POINTER_RECENTER: (i16, i16) = (256, 256);

/// No pointer position recorded yet.
const NO_POINTER: (i32, i32) = (-1, -1);

/// Who is responsible for the native window and its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created here; destroyed and disconnected on drop.
    Owned,
    /// Supplied by the caller; left untouched on drop.
    Borrowed,
}

/// Lifecycle of an [`XcbWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Uninitialized,
    ConnectionEstablished,
    Created,
    Adopted,
    CloseRequested,
    Closed,
}

/// Cross-thread request to stop a window's event loop.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle(Arc<AtomicBool>);

impl CloseHandle {
    pub fn request_close(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of handling one event.
struct Dispatch {
    keep_running: bool,
    notifications: Vec<WindowEvent>,
}

impl Dispatch {
    fn proceed() -> Self {
        Self {
            keep_running: true,
            notifications: Vec::new(),
        }
    }

    fn stop(notification: WindowEvent) -> Self {
        Self {
            keep_running: false,
            notifications: vec![notification],
        }
    }

    fn notify(notification: WindowEvent) -> Self {
        Self {
            keep_running: true,
            notifications: vec![notification],
        }
    }
}

/// A top-level X11 window driven through a [`WindowSystem`].
pub struct XcbWindow<S: WindowSystem = XcbSystem> {
    id: WindowId,
    system: S,
    ownership: Ownership,
    state: WindowState,
    title: String,
    width: u32,
    height: u32,
    closable: bool,
    native: Option<NativeWindow>,
    present: Option<PresentCallback>,
    callbacks: Vec<EventCallback>,
    delete_window_atom: Option<Atom>,
    key_symbols: bool,
    connected: bool,
    should_close: bool,
    close_finished: bool,
    close_signal: CloseHandle,
    last_pointer: (i32, i32),
    last_release_time: Option<u32>,
}

impl XcbWindow<XcbSystem> {
    /// Describe an owned window backed by the system XCB libraries.
    pub fn new(config: &WindowConfig, present: Option<PresentCallback>) -> Self {
        Self::with_system(XcbSystem::new(), config, present)
    }

    /// [`XcbWindow::new`] followed by [`XcbWindow::init`] with `config.visible`.
    pub fn create(
        config: &WindowConfig,
        present: Option<PresentCallback>,
    ) -> Result<Self, ViewHostError> {
        let mut window = Self::new(config, present);
        window.init(config.visible)?;
        Ok(window)
    }

    /// Wrap a window that lives on a connection owned by the caller.
    ///
    /// # Safety
    ///
    /// `connection` must be a live XCB connection that outlives the returned
    /// window, and `window` must exist on it.
    pub unsafe fn adopt(connection: *mut xcb_connection_t, window: NativeWindow) -> Self {
        // SAFETY: forwarded from the caller's contract.
        let system = unsafe { XcbSystem::from_raw_connection(connection) };
        Self::adopt_with_system(system, window)
    }
}

impl<S: WindowSystem> XcbWindow<S> {
    pub fn with_system(system: S, config: &WindowConfig, present: Option<PresentCallback>) -> Self {
        Self {
            id: WindowId::new(),
            system,
            ownership: Ownership::Owned,
            state: WindowState::Uninitialized,
            title: config.title.clone(),
            width: config.width,
            height: config.height,
            closable: config.closable,
            native: None,
            present,
            callbacks: Vec::new(),
            delete_window_atom: None,
            key_symbols: false,
            connected: false,
            should_close: false,
            close_finished: false,
            close_signal: CloseHandle::default(),
            last_pointer: NO_POINTER,
            last_release_time: None,
        }
    }

    /// Borrow `window`; `system` must already be connected to its display.
    pub fn adopt_with_system(system: S, window: NativeWindow) -> Self {
        Self {
            id: WindowId::new(),
            system,
            ownership: Ownership::Borrowed,
            state: WindowState::Uninitialized,
            title: String::new(),
            width: 0,
            height: 0,
            closable: true,
            native: Some(window),
            present: None,
            callbacks: Vec::new(),
            delete_window_atom: None,
            key_symbols: false,
            connected: false,
            should_close: false,
            close_finished: false,
            close_signal: CloseHandle::default(),
            last_pointer: NO_POINTER,
            last_release_time: None,
        }
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_closable(&self) -> bool {
        self.closable
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    pub fn native_window(&self) -> Option<NativeWindow> {
        self.native
    }

    /// True once `run` (or `pump`) has finished tearing the loop down.
    pub fn close_finished(&self) -> bool {
        self.close_finished
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    /// Handle that stops the event loop from anywhere, including the present
    /// callback or another thread.
    pub fn close_handle(&self) -> CloseHandle {
        self.close_signal.clone()
    }

    /// Subscribe to window notifications. Subscribers run in registration order.
    pub fn add_event_callback(&mut self, callback: EventCallback) {
        self.callbacks.push(callback);
    }

    // ==================== Initialization ====================

    /// Create (owned) or inspect (borrowed) the native window.
    ///
    /// Owned windows are mapped only when `visible` is set. Any error leaves
    /// the window unusable.
    pub fn init(&mut self, visible: bool) -> Result<(), ViewHostError> {
        if matches!(
            self.state,
            WindowState::Created
                | WindowState::Adopted
                | WindowState::CloseRequested
                | WindowState::Closed
        ) {
            warn!(window = ?self.id, state = ?self.state, "Window already initialized");
            return Ok(());
        }

        match self.ownership {
            Ownership::Owned => self.init_owned(visible),
            Ownership::Borrowed => self.init_adopted(),
        }
    }

    fn init_owned(&mut self, visible: bool) -> Result<(), ViewHostError> {
        let (width, height) = self.native_size()?;

        self.system.load()?;
        let screen = self.system.connect()?;
        self.connected = true;
        self.state = WindowState::ConnectionEstablished;
        debug!(window = ?self.id, screen = screen.number, root = screen.root, "Connected to X server");

        self.system.enable_detectable_auto_repeat();

        let window = self.system.generate_id();
        self.system.create_window(&CreateWindow {
            window,
            parent: screen.root,
            visual: screen.root_visual,
            width,
            height,
            background_pixel: screen.black_pixel,
            event_mask: WINDOW_EVENT_MASK,
        });
        self.native = Some(window);

        self.hide_cursor(window);
        self.system.flush();

        let hints = SizeHints::fixed(width, height);
        self.system.change_property(
            window,
            XCB_ATOM_WM_NORMAL_HINTS,
            XCB_ATOM_WM_SIZE_HINTS,
            PropertyData::Card32(&hints.to_words()),
        );

        self.install_delete_protocol(window);

        self.system.change_property(
            window,
            XCB_ATOM_WM_NAME,
            XCB_ATOM_STRING,
            PropertyData::Str(self.title.as_bytes()),
        );

        if visible {
            self.system.map_window(window);
        }
        self.system.flush();

        self.system.alloc_key_symbols();
        self.key_symbols = true;

        self.state = WindowState::Created;
        info!(
            window = ?self.id,
            native = window,
            title = %self.title,
            width,
            height,
            visible,
            "Window created"
        );
        Ok(())
    }

    fn init_adopted(&mut self) -> Result<(), ViewHostError> {
        let window = self.native.ok_or(ViewHostError::NotInitialized)?;

        self.system.load()?;

        let geometry = self.system.get_geometry(window).ok_or_else(|| {
            error!(window = ?self.id, native = window, "Geometry query failed");
            ViewHostError::GeometryQueryFailure(window)
        })?;
        self.state = WindowState::ConnectionEstablished;
        self.width = u32::from(geometry.width);
        self.height = u32::from(geometry.height);

        self.state = WindowState::Adopted;
        info!(
            window = ?self.id,
            native = window,
            width = self.width,
            height = self.height,
            "Window adopted"
        );
        Ok(())
    }

    fn native_size(&self) -> Result<(u16, u16), ViewHostError> {
        let invalid = || {
            ViewHostError::InvalidConfig(ConfigError::InvalidSize {
                width: self.width,
                height: self.height,
            })
        };
        let width = u16::try_from(self.width).map_err(|_| invalid())?;
        let height = u16::try_from(self.height).map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok((width, height))
    }

    /// Replace the pointer with a 1x1 bitmap that is both source and mask.
    fn hide_cursor(&mut self, window: NativeWindow) {
        let cursor = self.system.generate_id();
        let pixmap = self.system.generate_id();
        self.system.create_pixmap(1, pixmap, window, 1, 1);
        self.system.create_cursor(cursor, pixmap, pixmap);
        self.system.set_window_cursor(window, cursor);
    }

    fn install_delete_protocol(&mut self, window: NativeWindow) {
        let protocols = self.system.intern_atom("WM_PROTOCOLS", true);
        let delete = self.system.intern_atom("WM_DELETE_WINDOW", false);

        match (protocols, delete) {
            (Some(protocols), Some(delete))
                if protocols != XCB_ATOM_NONE && delete != XCB_ATOM_NONE =>
            {
                self.system.change_property(
                    window,
                    protocols,
                    XCB_ATOM_ATOM,
                    PropertyData::Card32(&[delete]),
                );
                self.delete_window_atom = Some(delete);
                trace!(window = ?self.id, protocols, delete, "WM_DELETE_WINDOW installed");
            }
            _ => {
                warn!(window = ?self.id, ?protocols, ?delete, "Window manager close protocol unavailable");
            }
        }
    }

    // ==================== Event loop ====================

    /// Block until the window closes, presenting whenever the queue is idle.
    pub fn run(&mut self) -> Result<(), ViewHostError> {
        if !self.loop_ready("run")? {
            return Ok(());
        }

        info!(window = ?self.id, "Entering event loop");
        let mut running = true;
        while running && !self.close_requested() {
            running = match self.system.poll_for_event() {
                Some(event) => self.dispatch(event),
                None => {
                    self.present();
                    !self.close_requested()
                }
            };
        }

        self.finish_close()
    }

    /// Dispatch every queued event without blocking or presenting.
    ///
    /// Returns `Ok(false)` once the window has closed.
    pub fn pump(&mut self) -> Result<bool, ViewHostError> {
        if !self.loop_ready("pump")? {
            return Ok(false);
        }

        while !self.close_requested() {
            let Some(event) = self.system.poll_for_event() else {
                return Ok(true);
            };
            if !self.dispatch(event) {
                break;
            }
        }

        self.finish_close()?;
        Ok(false)
    }

    /// Handle one event. Returns whether the loop should keep running.
    pub fn dispatch(&mut self, event: XcbEvent) -> bool {
        trace!(window = ?self.id, event = event.name(), "Dispatching");

        let outcome = match event {
            XcbEvent::ClientMessage { data, .. } => self.on_client_message(data[0]),
            XcbEvent::DestroyNotify { window } => self.on_destroy_notify(window),
            XcbEvent::MotionNotify { x, y, .. } => self.on_motion(x, y),
            XcbEvent::KeyPress(key) => self.on_key(&key, KeyDirection::Pressed),
            XcbEvent::KeyRelease(key) => self.on_key(&key, KeyDirection::Released),
            XcbEvent::ButtonPress(button) => self.on_button_press(&button),
            XcbEvent::ButtonRelease(button) => self.on_button_release(&button),
            XcbEvent::Expose { .. } => self.on_expose(),
            XcbEvent::Other { .. } => Dispatch::proceed(),
        };

        for notification in &outcome.notifications {
            self.emit(notification);
        }
        outcome.keep_running
    }

    fn on_client_message(&mut self, first_word: u32) -> Dispatch {
        match self.delete_window_atom {
            Some(atom) if atom == first_word && self.closable => {
                debug!(window = ?self.id, "Close requested by window manager");
                Dispatch::stop(WindowEvent::CloseEvent { window: self.id })
            }
            _ => Dispatch::proceed(),
        }
    }

    fn on_destroy_notify(&mut self, native: NativeWindow) -> Dispatch {
        debug!(window = ?self.id, native, "Window destroyed");
        Dispatch::stop(WindowEvent::CloseEvent { window: self.id })
    }

    fn on_motion(&mut self, x: i16, y: i16) -> Dispatch {
        let (last_x, last_y) = self.last_pointer;
        let recentered = (x, y) == POINTER_RECENTER;
        let (x, y) = (i32::from(x), i32::from(y));
        self.last_pointer = (x, y);

        if last_x == -1 || last_y == -1 || recentered {
            return Dispatch::proceed();
        }

        if let Some(native) = self.native {
            let (cx, cy) = POINTER_RECENTER;
            self.system.warp_pointer(native, cx, cy);
        }
        Dispatch::notify(WindowEvent::MouseMoved {
            window: self.id,
            dx: x - last_x,
            dy: y - last_y,
        })
    }

    fn on_key(&mut self, key: &KeyEvent, direction: KeyDirection) -> Dispatch {
        let keysym = self.system.lookup_keysym(key, direction);
        let key = KeyId::from_keysym(keysym);
        let window = self.id;
        Dispatch::notify(match direction {
            KeyDirection::Pressed => WindowEvent::KeypressPressed { window, key },
            KeyDirection::Released => WindowEvent::KeypressReleased { window, key },
        })
    }

    fn on_button_release(&mut self, button: &ButtonEvent) -> Dispatch {
        self.last_release_time = Some(button.time);
        match MouseButton::from_detail(button.button) {
            Some(pressed) => Dispatch::notify(WindowEvent::KeypressReleased {
                window: self.id,
                key: pressed.key_id(),
            }),
            None => Dispatch::proceed(),
        }
    }

    fn on_button_press(&mut self, button: &ButtonEvent) -> Dispatch {
        if self.last_release_time == Some(button.time) {
            trace!(window = ?self.id, time = button.time, "Suppressed duplicate button press");
            return Dispatch::proceed();
        }
        match MouseButton::from_detail(button.button) {
            Some(pressed) => Dispatch::notify(WindowEvent::KeypressPressed {
                window: self.id,
                key: pressed.key_id(),
            }),
            None => Dispatch::proceed(),
        }
    }

    fn on_expose(&mut self) -> Dispatch {
        self.present();
        Dispatch {
            keep_running: !self.close_requested(),
            notifications: Vec::new(),
        }
    }

    fn present(&mut self) {
        if let Some(present) = self.present.as_mut() {
            present();
        }
    }

    fn emit(&mut self, event: &WindowEvent) {
        for callback in &mut self.callbacks {
            callback(event);
        }
    }

    fn close_requested(&self) -> bool {
        self.should_close || self.close_signal.is_requested()
    }

    /// Check the loop preconditions. `Ok(false)` means the loop already ended.
    fn loop_ready(&self, operation: &'static str) -> Result<bool, ViewHostError> {
        self.require_owned(operation)?;
        match self.state {
            WindowState::Created | WindowState::CloseRequested => Ok(true),
            WindowState::Closed => Ok(false),
            _ => {
                error!(window = ?self.id, operation, state = ?self.state, "Window is not initialized");
                Err(ViewHostError::NotInitialized)
            }
        }
    }

    fn require_owned(&self, operation: &'static str) -> Result<(), ViewHostError> {
        if self.ownership == Ownership::Borrowed {
            error!(window = ?self.id, operation, "Operation requires an owned window");
            return Err(ViewHostError::NotOwned { operation });
        }
        Ok(())
    }

    fn finish_close(&mut self) -> Result<(), ViewHostError> {
        self.close()?;
        self.close_finished = true;
        self.state = WindowState::Closed;
        info!(window = ?self.id, "Event loop finished");
        Ok(())
    }

    // ==================== Teardown ====================

    /// Announce the close and release the keysym table. Repeated calls do
    /// nothing. Fails with [`ViewHostError::NotInitialized`] before `init`.
    pub fn close(&mut self) -> Result<(), ViewHostError> {
        self.require_owned("close")?;
        if self.should_close {
            return Ok(());
        }
        if matches!(
            self.state,
            WindowState::Uninitialized | WindowState::ConnectionEstablished
        ) {
            error!(window = ?self.id, state = ?self.state, "close called before init");
            return Err(ViewHostError::NotInitialized);
        }

        self.emit(&WindowEvent::AboutToClose { window: self.id });
        self.should_close = true;
        self.close_signal.request_close();

        if self.key_symbols {
            self.system.free_key_symbols();
            self.key_symbols = false;
        }
        self.delete_window_atom = None;

        if self.state == WindowState::Created {
            self.state = WindowState::CloseRequested;
        }
        debug!(window = ?self.id, "Window closing");
        Ok(())
    }
}

impl<S: WindowSystem> Drop for XcbWindow<S> {
    fn drop(&mut self) {
        if self.ownership == Ownership::Borrowed || !self.connected {
            return;
        }

        if self.key_symbols {
            self.system.free_key_symbols();
            self.key_symbols = false;
        }
        if let Some(window) = self.native.take() {
            self.system.unmap_window(window);
            self.system.destroy_window(window);
            self.system.flush();
        }
        self.system.disconnect();
        self.connected = false;
        debug!(window = ?self.id, "Window destroyed and disconnected");
    }
}

impl<S: WindowSystem> fmt::Debug for XcbWindow<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XcbWindow")
            .field("id", &self.id)
            .field("ownership", &self.ownership)
            .field("state", &self.state)
            .field("title", &self.title)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeSystem, SystemCall};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder<S: WindowSystem>(window: &mut XcbWindow<S>) -> Rc<RefCell<Vec<WindowEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        window.add_event_callback(Box::new(move |event| sink.borrow_mut().push(event.clone())));
        events
    }

    fn created(fake: &FakeSystem) -> XcbWindow<FakeSystem> {
        let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("test", 320, 200), None);
        assert!(window.init(true).is_ok());
        window
    }

    #[test]
    fn test_close_handle_shared() {
        let handle = CloseHandle::default();
        let other = handle.clone();
        assert!(!handle.is_requested());
        other.request_close();
        assert!(handle.is_requested());
    }

    #[test]
    fn test_new_window_holds_no_resources() {
        let fake = FakeSystem::new();
        let window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("idle", 10, 10), None);
        assert_eq!(window.state(), WindowState::Uninitialized);
        assert_eq!(window.native_window(), None);
        assert_eq!(window.title(), "idle");
        drop(window);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_oversized_window_rejected_before_connecting() {
        let fake = FakeSystem::new();
        let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("big", 70_000, 10), None);
        assert!(matches!(
            window.init(true),
            Err(ViewHostError::InvalidConfig(ConfigError::InvalidSize { width: 70_000, .. }))
        ));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_cursor_is_hidden_with_one_pixel_bitmap() {
        let fake = FakeSystem::new();
        let window = created(&fake);
        let native = window.native_window().unwrap_or_default();
        let calls = fake.calls();
        let pixmap = calls.iter().find_map(|call| match call {
            SystemCall::CreatePixmap {
                depth: 1,
                pixmap,
                drawable,
                width: 1,
                height: 1,
            } if *drawable == native => Some(*pixmap),
            _ => None,
        });
        let pixmap = pixmap.expect("no 1x1 pixmap created");
        assert!(calls.iter().any(|call| matches!(
            call,
            SystemCall::CreateCursor { source, mask, .. } if *source == pixmap && *mask == pixmap
        )));
        assert!(calls
            .iter()
            .any(|call| matches!(call, SystemCall::SetWindowCursor { window, .. } if *window == native)));
    }

    #[test]
    fn test_motion_sentinel_and_warp() {
        let fake = FakeSystem::new();
        let mut window = created(&fake);
        let events = recorder(&mut window);

        assert!(window.dispatch(XcbEvent::MotionNotify { x: 100, y: 100, time: 1 }));
        assert!(window.dispatch(XcbEvent::MotionNotify { x: 110, y: 95, time: 2 }));
        assert!(window.dispatch(XcbEvent::MotionNotify { x: 256, y: 256, time: 3 }));
        assert!(window.dispatch(XcbEvent::MotionNotify { x: 250, y: 260, time: 4 }));

        let id = window.id();
        assert_eq!(
            *events.borrow(),
            vec![
                WindowEvent::MouseMoved { window: id, dx: 10, dy: -5 },
                WindowEvent::MouseMoved { window: id, dx: -6, dy: 4 },
            ]
        );
        assert_eq!(
            fake.count_calls(|call| matches!(call, SystemCall::WarpPointer { x: 256, y: 256, .. })),
            2
        );
    }

    #[test]
    fn test_unmapped_buttons_only_record_release_time() {
        let fake = FakeSystem::new();
        let mut window = created(&fake);
        let events = recorder(&mut window);

        assert!(window.dispatch(XcbEvent::ButtonRelease(ButtonEvent { button: 4, time: 9 })));
        assert!(window.dispatch(XcbEvent::ButtonPress(ButtonEvent { button: 1, time: 9 })));
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_pump_drains_queue() {
        let fake = FakeSystem::new();
        let mut window = created(&fake);
        let events = recorder(&mut window);
        fake.push_event(XcbEvent::ButtonPress(ButtonEvent { button: 3, time: 1 }));
        fake.push_event(XcbEvent::Other { response_type: 22 });

        assert!(matches!(window.pump(), Ok(true)));
        assert_eq!(fake.pending_events(), 0);
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(window.state(), WindowState::Created);

        fake.push_event(XcbEvent::DestroyNotify { window: 0 });
        assert!(matches!(window.pump(), Ok(false)));
        assert!(window.close_finished());
        assert_eq!(window.state(), WindowState::Closed);
    }

    #[test]
    fn test_run_requires_initialization() {
        let fake = FakeSystem::new();
        let mut window = XcbWindow::with_system(fake, &WindowConfig::default(), None);
        assert!(matches!(window.run(), Err(ViewHostError::NotInitialized)));
    }

    #[test]
    fn test_double_init_is_ignored() {
        let fake = FakeSystem::new();
        let mut window = created(&fake);
        let before = fake.calls().len();
        assert!(window.init(true).is_ok());
        assert_eq!(fake.calls().len(), before);
    }
}
