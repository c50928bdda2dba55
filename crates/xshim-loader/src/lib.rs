//! # xshim Loader
//!
//! Resolves the XCB entry points used by the window shim at run time.
//!
//! The three client libraries (`libxcb-keysyms`, `libxcb`, `libxcb-xkb`) are
//! opened in a fixed order and every required symbol is copied into a flat
//! [`XcbProcs`] table. Resolution is all-or-nothing: a single missing library
//! or symbol fails [`XcbLoader::init`] and leaves the loader empty.
//!
//! # Safety
//!
//! The table holds raw `extern "C"` function pointers. They stay valid for as
//! long as the owning [`XcbLoader`] is alive, which is why the table is only
//! reachable through a borrow of the loader.

#![allow(non_camel_case_types)]

pub mod ffi;

use libloading::Library;
use std::ffi::CStr;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use ffi::*;

/// Native libraries opened by the loader, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XcbLibrary {
    Keysyms = 0,
    Xcb = 1,
    Xkb = 2,
}

impl XcbLibrary {
    pub const ALL: [XcbLibrary; 3] = [XcbLibrary::Keysyms, XcbLibrary::Xcb, XcbLibrary::Xkb];

    /// Versioned soname, so the loader never depends on `-dev` packages.
    pub fn soname(&self) -> &'static str {
        match self {
            XcbLibrary::Keysyms => "libxcb-keysyms.so.1",
            XcbLibrary::Xcb => "libxcb.so.1",
            XcbLibrary::Xkb => "libxcb-xkb.so.1",
        }
    }
}

impl fmt::Display for XcbLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.soname())
    }
}

/// Errors raised while resolving the XCB entry points.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Library {library} is unavailable: {source}")]
    Unavailable {
        library: XcbLibrary,
        #[source]
        source: libloading::Error,
    },

    #[error("Symbol {symbol} not found in {library}: {source}")]
    MissingSymbol {
        symbol: &'static str,
        library: XcbLibrary,
        #[source]
        source: libloading::Error,
    },
}

impl LoaderError {
    /// Both variants mean the windowing backend cannot be used at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            LoaderError::Unavailable { .. } | LoaderError::MissingSymbol { .. }
        )
    }

    pub fn library(&self) -> XcbLibrary {
        match self {
            LoaderError::Unavailable { library, .. } => *library,
            LoaderError::MissingSymbol { library, .. } => *library,
        }
    }
}

/// Declares the procs table once and derives the struct, the symbol list and
/// the resolver from it, so the three cannot drift apart.
macro_rules! xcb_procs {
    ($($library:ident { $($field:ident: $ty:ty = $symbol:literal,)* })*) => {
        /// Resolved XCB entry points.
        #[derive(Clone, Copy)]
        pub struct XcbProcs {
            $($(pub $field: $ty,)*)*
        }

        impl XcbProcs {
            /// Every symbol the table needs, with the library that exports it.
            pub const SYMBOLS: &'static [(XcbLibrary, &'static CStr)] = &[
                $($((XcbLibrary::$library, $symbol),)*)*
            ];

            fn resolve(libraries: &[Library]) -> Result<Self, LoaderError> {
                Ok(Self {
                    $($($field: resolve_symbol::<$ty>(
                        &libraries[XcbLibrary::$library as usize],
                        XcbLibrary::$library,
                        $symbol,
                    )?,)*)*
                })
            }
        }
    };
}

xcb_procs! {
    Keysyms {
        key_press_lookup_keysym: XcbKeyPressLookupKeysymFn = c"xcb_key_press_lookup_keysym",
        key_release_lookup_keysym: XcbKeyReleaseLookupKeysymFn = c"xcb_key_release_lookup_keysym",
        key_symbols_alloc: XcbKeySymbolsAllocFn = c"xcb_key_symbols_alloc",
        key_symbols_free: XcbKeySymbolsFreeFn = c"xcb_key_symbols_free",
    }
    Xcb {
        change_property: XcbChangePropertyFn = c"xcb_change_property",
        connect: XcbConnectFn = c"xcb_connect",
        connection_has_error: XcbConnectionHasErrorFn = c"xcb_connection_has_error",
        create_window: XcbCreateWindowFn = c"xcb_create_window",
        change_window_attributes: XcbChangeWindowAttributesFn = c"xcb_change_window_attributes",
        destroy_window: XcbDestroyWindowFn = c"xcb_destroy_window",
        disconnect: XcbDisconnectFn = c"xcb_disconnect",
        flush: XcbFlushFn = c"xcb_flush",
        generate_id: XcbGenerateIdFn = c"xcb_generate_id",
        get_geometry: XcbGetGeometryFn = c"xcb_get_geometry",
        get_geometry_reply: XcbGetGeometryReplyFn = c"xcb_get_geometry_reply",
        get_setup: XcbGetSetupFn = c"xcb_get_setup",
        warp_pointer: XcbWarpPointerFn = c"xcb_warp_pointer",
        intern_atom: XcbInternAtomFn = c"xcb_intern_atom",
        intern_atom_reply: XcbInternAtomReplyFn = c"xcb_intern_atom_reply",
        map_window: XcbMapWindowFn = c"xcb_map_window",
        poll_for_event: XcbPollForEventFn = c"xcb_poll_for_event",
        wait_for_event: XcbWaitForEventFn = c"xcb_wait_for_event",
        send_event: XcbSendEventFn = c"xcb_send_event",
        screen_next: XcbScreenNextFn = c"xcb_screen_next",
        setup_roots_iterator: XcbSetupRootsIteratorFn = c"xcb_setup_roots_iterator",
        unmap_window: XcbUnmapWindowFn = c"xcb_unmap_window",
        create_pixmap: XcbCreatePixmapFn = c"xcb_create_pixmap",
        create_cursor: XcbCreateCursorFn = c"xcb_create_cursor",
    }
    Xkb {
        xkb_use_extension: XcbXkbUseExtensionFn = c"xcb_xkb_use_extension",
        xkb_per_client_flags: XcbXkbPerClientFlagsFn = c"xcb_xkb_per_client_flags",
    }
}

impl fmt::Debug for XcbProcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XcbProcs")
            .field("symbols", &Self::SYMBOLS.len())
            .finish_non_exhaustive()
    }
}

fn resolve_symbol<T: Copy>(
    library: &Library,
    owner: XcbLibrary,
    symbol: &'static CStr,
) -> Result<T, LoaderError> {
    // SAFETY: T is one of the function pointer types in `ffi`, each matching
    // the C prototype of the symbol it is paired with in `xcb_procs!`.
    let resolved = unsafe { library.get::<T>(symbol.to_bytes_with_nul()) };
    match resolved {
        Ok(sym) => {
            trace!(symbol = ?symbol, %owner, "Resolved symbol");
            Ok(*sym)
        }
        Err(source) => Err(LoaderError::MissingSymbol {
            symbol: symbol.to_str().unwrap_or("<non-utf8>"),
            library: owner,
            source,
        }),
    }
}

/// Owns the opened XCB libraries and the procs table resolved from them.
#[derive(Default)]
pub struct XcbLoader {
    // Declared before `libraries` so the pointers go away first.
    procs: Option<XcbProcs>,
    libraries: Vec<Library>,
}

impl XcbLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every library and resolve the full symbol table.
    ///
    /// Calling this again after a successful load is a no-op.
    pub fn init(&mut self) -> Result<(), LoaderError> {
        if self.procs.is_some() {
            return Ok(());
        }

        let libraries = match Self::open_libraries() {
            Ok(libraries) => libraries,
            Err(err) => {
                warn!(%err, "XCB libraries unavailable");
                return Err(err);
            }
        };

        match XcbProcs::resolve(&libraries) {
            Ok(procs) => {
                self.procs = Some(procs);
                self.libraries = libraries;
                info!(symbols = XcbProcs::SYMBOLS.len(), "XCB entry points resolved");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "XCB symbol resolution failed");
                Err(err)
            }
        }
    }

    /// Whether the most recent [`init`](Self::init) succeeded.
    pub fn is_initialized(&self) -> bool {
        self.procs.is_some()
    }

    /// The resolved table, or `None` before a successful [`init`](Self::init).
    pub fn get_procs_table(&self) -> Option<&XcbProcs> {
        self.procs.as_ref()
    }

    fn open_libraries() -> Result<Vec<Library>, LoaderError> {
        XcbLibrary::ALL
            .iter()
            .map(|&library| {
                // SAFETY: the XCB client libraries have no initialisers with
                // preconditions; loading them only maps code.
                let handle = unsafe { Library::new(library.soname()) }
                    .map_err(|source| LoaderError::Unavailable { library, source })?;
                debug!(%library, "Opened library");
                Ok(handle)
            })
            .collect()
    }
}

impl fmt::Debug for XcbLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XcbLoader")
            .field("initialized", &self.is_initialized())
            .field("libraries", &self.libraries.len())
            .finish()
    }
}
