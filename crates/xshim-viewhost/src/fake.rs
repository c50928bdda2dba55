//! In-memory [`WindowSystem`] for exercising the adapter without an X server.
//!
//! `FakeSystem` is a cheap handle over shared state. Keep a clone before
//! handing one to a window and inspect what it recorded afterwards, even once
//! the window has been dropped.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use xshim_loader::ffi::XCB_ATOM_NONE;
use xshim_loader::{LoaderError, XcbLibrary};

use crate::event::{KeyDirection, KeyEvent, XcbEvent};
use crate::system::{CreateWindow, Geometry, PropertyData, ScreenInfo, WindowSystem};
use crate::{Atom, Keysym, NativeWindow, ViewHostError};

/// Owned copy of a property write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Card32(Vec<u32>),
    Str(Vec<u8>),
}

impl From<PropertyData<'_>> for PropertyValue {
    fn from(data: PropertyData<'_>) -> Self {
        match data {
            PropertyData::Card32(words) => PropertyValue::Card32(words.to_vec()),
            PropertyData::Str(bytes) => PropertyValue::Str(bytes.to_vec()),
        }
    }
}

/// One recorded [`WindowSystem`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemCall {
    Load,
    Connect,
    Disconnect,
    GenerateId(u32),
    EnableDetectableAutoRepeat,
    CreateWindow(CreateWindow),
    CreatePixmap {
        depth: u8,
        pixmap: u32,
        drawable: NativeWindow,
        width: u16,
        height: u16,
    },
    CreateCursor {
        cursor: u32,
        source: u32,
        mask: u32,
    },
    SetWindowCursor {
        window: NativeWindow,
        cursor: u32,
    },
    ChangeProperty {
        window: NativeWindow,
        property: Atom,
        kind: Atom,
        value: PropertyValue,
    },
    InternAtom {
        name: String,
        only_if_exists: bool,
    },
    MapWindow(NativeWindow),
    UnmapWindow(NativeWindow),
    DestroyWindow(NativeWindow),
    Flush,
    WarpPointer {
        window: NativeWindow,
        x: i16,
        y: i16,
    },
    GetGeometry(NativeWindow),
    AllocKeySymbols,
    FreeKeySymbols,
    LookupKeysym {
        keycode: u8,
        direction: KeyDirection,
    },
}

struct FakeState {
    calls: Vec<SystemCall>,
    events: VecDeque<XcbEvent>,
    keymap: HashMap<u8, Keysym>,
    atoms: HashMap<String, Atom>,
    properties: HashMap<(NativeWindow, Atom), (Atom, PropertyValue)>,
    mapped: HashSet<NativeWindow>,
    existing: HashSet<NativeWindow>,
    geometry: HashMap<NativeWindow, Geometry>,
    screen: ScreenInfo,
    fail_load: bool,
    fail_connect: bool,
    connected: bool,
    key_symbols: bool,
    next_id: u32,
    next_atom: Atom,
}

impl Default for FakeState {
    fn default() -> Self {
        // WM_PROTOCOLS always exists once a window manager has run.
        let atoms = HashMap::from([("WM_PROTOCOLS".to_string(), 300)]);
        Self {
            calls: Vec::new(),
            events: VecDeque::new(),
            keymap: HashMap::new(),
            atoms,
            properties: HashMap::new(),
            mapped: HashSet::new(),
            existing: HashSet::new(),
            geometry: HashMap::new(),
            screen: ScreenInfo {
                number: 0,
                root: 0x100,
                root_visual: 0x21,
                black_pixel: 0x000000,
                white_pixel: 0xffffff,
                width_in_pixels: 1920,
                height_in_pixels: 1080,
            },
            fail_load: false,
            fail_connect: false,
            connected: false,
            key_symbols: false,
            next_id: 0x0040_0001,
            next_atom: 301,
        }
    }
}

/// Recording fake of the XCB backend.
#[derive(Clone, Default)]
pub struct FakeSystem {
    state: Rc<RefCell<FakeState>>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// `load` fails as if `libxcb.so.1` were missing.
    pub fn failing_load() -> Self {
        let fake = Self::new();
        fake.state.borrow_mut().fail_load = true;
        fake
    }

    /// `connect` fails as if no X server were reachable.
    pub fn failing_connect() -> Self {
        let fake = Self::new();
        fake.state.borrow_mut().fail_connect = true;
        fake
    }

    /// Pretend the caller already holds a connection and `window` exists
    /// with the given size.
    pub fn with_existing_window(window: NativeWindow, width: u16, height: u16) -> Self {
        let fake = Self::new();
        {
            let mut state = fake.state.borrow_mut();
            state.connected = true;
            state.existing.insert(window);
            state.mapped.insert(window);
            state.geometry.insert(
                window,
                Geometry {
                    x: 0,
                    y: 0,
                    width,
                    height,
                },
            );
        }
        fake
    }

    /// A connection that is live but knows nothing about any window.
    pub fn connected() -> Self {
        let fake = Self::new();
        fake.state.borrow_mut().connected = true;
        fake
    }

    /// Queue an event for `poll_for_event`.
    pub fn push_event(&self, event: XcbEvent) {
        self.state.borrow_mut().events.push_back(event);
    }

    /// Resolve `keycode` to `keysym` in keysym lookups.
    pub fn map_key(&self, keycode: u8, keysym: Keysym) {
        self.state.borrow_mut().keymap.insert(keycode, keysym);
    }

    /// The `WM_PROTOCOLS` client message a window manager sends when the
    /// close button is pressed.
    pub fn delete_window_message(&self, window: NativeWindow) -> XcbEvent {
        let protocols = self.atom("WM_PROTOCOLS").unwrap_or(XCB_ATOM_NONE);
        let delete = self.atom("WM_DELETE_WINDOW").unwrap_or(XCB_ATOM_NONE);
        XcbEvent::ClientMessage {
            window,
            message_type: protocols,
            data: [delete, 0, 0, 0, 0],
        }
    }

    pub fn calls(&self) -> Vec<SystemCall> {
        self.state.borrow().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&SystemCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn atom(&self, name: &str) -> Option<Atom> {
        self.state.borrow().atoms.get(name).copied()
    }

    /// Last value written to `property` on `window`, with its type atom.
    pub fn property(&self, window: NativeWindow, property: Atom) -> Option<(Atom, PropertyValue)> {
        self.state.borrow().properties.get(&(window, property)).cloned()
    }

    pub fn is_mapped(&self, window: NativeWindow) -> bool {
        self.state.borrow().mapped.contains(&window)
    }

    pub fn window_exists(&self, window: NativeWindow) -> bool {
        self.state.borrow().existing.contains(&window)
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn key_symbols_allocated(&self) -> bool {
        self.state.borrow().key_symbols
    }

    pub fn pending_events(&self) -> usize {
        self.state.borrow().events.len()
    }

    fn record(&self, call: SystemCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl WindowSystem for FakeSystem {
    fn load(&mut self) -> Result<(), ViewHostError> {
        self.record(SystemCall::Load);
        if self.state.borrow().fail_load {
            return Err(ViewHostError::LoaderUnavailable(LoaderError::Unavailable {
                library: XcbLibrary::Xcb,
                source: libloading::Error::DlOpenUnknown,
            }));
        }
        Ok(())
    }

    fn connect(&mut self) -> Result<ScreenInfo, ViewHostError> {
        self.record(SystemCall::Connect);
        let mut state = self.state.borrow_mut();
        if state.fail_connect {
            return Err(ViewHostError::ConnectionFailure { display: None });
        }
        state.connected = true;
        Ok(state.screen)
    }

    fn disconnect(&mut self) {
        self.record(SystemCall::Disconnect);
        self.state.borrow_mut().connected = false;
    }

    fn generate_id(&mut self) -> u32 {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            id
        };
        self.record(SystemCall::GenerateId(id));
        id
    }

    fn enable_detectable_auto_repeat(&mut self) {
        self.record(SystemCall::EnableDetectableAutoRepeat);
    }

    fn create_window(&mut self, request: &CreateWindow) {
        self.record(SystemCall::CreateWindow(*request));
        let mut state = self.state.borrow_mut();
        state.existing.insert(request.window);
        state.geometry.insert(
            request.window,
            Geometry {
                x: 0,
                y: 0,
                width: request.width,
                height: request.height,
            },
        );
    }

    fn create_pixmap(&mut self, depth: u8, pixmap: u32, drawable: NativeWindow, width: u16, height: u16) {
        self.record(SystemCall::CreatePixmap {
            depth,
            pixmap,
            drawable,
            width,
            height,
        });
    }

    fn create_cursor(&mut self, cursor: u32, source: u32, mask: u32) {
        self.record(SystemCall::CreateCursor { cursor, source, mask });
    }

    fn set_window_cursor(&mut self, window: NativeWindow, cursor: u32) {
        self.record(SystemCall::SetWindowCursor { window, cursor });
    }

    fn change_property(&mut self, window: NativeWindow, property: Atom, kind: Atom, data: PropertyData<'_>) {
        let value = PropertyValue::from(data);
        self.record(SystemCall::ChangeProperty {
            window,
            property,
            kind,
            value: value.clone(),
        });
        self.state
            .borrow_mut()
            .properties
            .insert((window, property), (kind, value));
    }

    fn intern_atom(&mut self, name: &str, only_if_exists: bool) -> Option<Atom> {
        self.record(SystemCall::InternAtom {
            name: name.to_string(),
            only_if_exists,
        });
        let mut state = self.state.borrow_mut();
        if let Some(atom) = state.atoms.get(name) {
            return Some(*atom);
        }
        if only_if_exists {
            return Some(XCB_ATOM_NONE);
        }
        let atom = state.next_atom;
        state.next_atom += 1;
        state.atoms.insert(name.to_string(), atom);
        Some(atom)
    }

    fn map_window(&mut self, window: NativeWindow) {
        self.record(SystemCall::MapWindow(window));
        self.state.borrow_mut().mapped.insert(window);
    }

    fn unmap_window(&mut self, window: NativeWindow) {
        self.record(SystemCall::UnmapWindow(window));
        self.state.borrow_mut().mapped.remove(&window);
    }

    fn destroy_window(&mut self, window: NativeWindow) {
        self.record(SystemCall::DestroyWindow(window));
        let mut state = self.state.borrow_mut();
        state.mapped.remove(&window);
        state.existing.remove(&window);
    }

    fn flush(&mut self) {
        self.record(SystemCall::Flush);
    }

    fn warp_pointer(&mut self, window: NativeWindow, x: i16, y: i16) {
        self.record(SystemCall::WarpPointer { window, x, y });
    }

    fn get_geometry(&mut self, window: NativeWindow) -> Option<Geometry> {
        self.record(SystemCall::GetGeometry(window));
        let state = self.state.borrow();
        if !state.connected {
            return None;
        }
        state.geometry.get(&window).copied()
    }

    fn poll_for_event(&mut self) -> Option<XcbEvent> {
        self.state.borrow_mut().events.pop_front()
    }

    fn alloc_key_symbols(&mut self) {
        self.record(SystemCall::AllocKeySymbols);
        self.state.borrow_mut().key_symbols = true;
    }

    fn free_key_symbols(&mut self) {
        self.record(SystemCall::FreeKeySymbols);
        self.state.borrow_mut().key_symbols = false;
    }

    fn lookup_keysym(&mut self, event: &KeyEvent, direction: KeyDirection) -> Keysym {
        self.record(SystemCall::LookupKeysym {
            keycode: event.keycode,
            direction,
        });
        let state = self.state.borrow();
        if !state.key_symbols {
            return 0;
        }
        state.keymap.get(&event.keycode).copied().unwrap_or(0)
    }
}
