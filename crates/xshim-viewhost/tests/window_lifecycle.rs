//! Lifecycle tests: init, close and teardown against the in-memory backend.

use std::cell::RefCell;
use std::rc::Rc;

use xshim_common::WindowConfig;
use xshim_loader::ffi::{XCB_ATOM_ATOM, XCB_ATOM_STRING, XCB_ATOM_WM_NAME, XCB_ATOM_WM_NORMAL_HINTS, XCB_ATOM_WM_SIZE_HINTS};
use xshim_viewhost::{
    FakeSystem, PropertyValue, SizeHints, SystemCall, ViewHostError, WindowEvent, WindowState,
    XcbWindow, WINDOW_EVENT_MASK,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn record_events(window: &mut XcbWindow<FakeSystem>) -> Rc<RefCell<Vec<WindowEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    window.add_event_callback(Box::new(move |event| sink.borrow_mut().push(event.clone())));
    events
}

fn size_hints(fake: &FakeSystem, window: u32) -> Option<SizeHints> {
    match fake.property(window, XCB_ATOM_WM_NORMAL_HINTS) {
        Some((XCB_ATOM_WM_SIZE_HINTS, PropertyValue::Card32(words))) => SizeHints::from_words(&words),
        _ => None,
    }
}

#[test]
fn test_end_to_end_close_from_window_manager() {
    init_tracing();
    let fake = FakeSystem::new();
    let config = WindowConfig::new("T", 640, 480);
    let mut window = XcbWindow::with_system(fake.clone(), &config, None);
    let events = record_events(&mut window);

    window.init(true).expect("init failed");
    assert_eq!(window.state(), WindowState::Created);

    let native = window.native_window().expect("no native window");
    assert!(fake.is_mapped(native));
    assert!(fake.key_symbols_allocated());

    let hints = size_hints(&fake, native).expect("size hints missing");
    assert_eq!((hints.min_width, hints.min_height), (640, 480));
    assert_eq!((hints.max_width, hints.max_height), (640, 480));
    assert!(!hints.is_resizable());

    assert_eq!(
        fake.property(native, XCB_ATOM_WM_NAME),
        Some((XCB_ATOM_STRING, PropertyValue::Str(b"T".to_vec())))
    );

    fake.push_event(fake.delete_window_message(native));
    window.run().expect("run failed");

    let id = window.id();
    let close_events = events
        .borrow()
        .iter()
        .filter(|event| matches!(event, WindowEvent::CloseEvent { .. }))
        .count();
    assert_eq!(close_events, 1);
    assert_eq!(events.borrow().last(), Some(&WindowEvent::AboutToClose { window: id }));
    assert!(window.close_finished());
    assert_eq!(window.state(), WindowState::Closed);
    assert!(!fake.key_symbols_allocated());

    drop(window);
    assert!(!fake.window_exists(native));
    assert!(!fake.is_mapped(native));
    assert!(!fake.is_connected());
}

#[test]
fn test_hidden_window_is_not_mapped() {
    let fake = FakeSystem::new();
    let config = WindowConfig::new("hidden", 100, 100).visible(false);
    let mut window = XcbWindow::with_system(fake.clone(), &config, None);

    window.init(config.visible).expect("init failed");

    let native = window.native_window().expect("no native window");
    assert!(fake.window_exists(native));
    assert!(!fake.is_mapped(native));
    assert_eq!(fake.count_calls(|call| matches!(call, SystemCall::MapWindow(_))), 0);
}

#[test]
fn test_size_hints_pin_every_size() {
    for (width, height) in [(1, 1), (800, 600), (65535, 3)] {
        let fake = FakeSystem::new();
        let config = WindowConfig::new("sized", width, height);
        let mut window = XcbWindow::with_system(fake.clone(), &config, None);
        window.init(true).expect("init failed");

        let native = window.native_window().expect("no native window");
        let hints = size_hints(&fake, native).expect("size hints missing");
        let (w, h) = (width as i32, height as i32);
        assert_eq!((hints.min_width, hints.max_width), (w, w));
        assert_eq!((hints.min_height, hints.max_height), (h, h));
        assert_eq!(
            hints.flags,
            SizeHints::P_MAX_SIZE | SizeHints::P_MIN_SIZE | SizeHints::P_SIZE | SizeHints::US_SIZE
        );
    }
}

#[test]
fn test_window_created_on_root_with_event_mask() {
    let fake = FakeSystem::new();
    let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("mask", 64, 32), None);
    window.init(true).expect("init failed");

    let request = fake
        .calls()
        .into_iter()
        .find_map(|call| match call {
            SystemCall::CreateWindow(request) => Some(request),
            _ => None,
        })
        .expect("window never created");
    assert_eq!(Some(request.window), window.native_window());
    assert_eq!(request.parent, 0x100);
    assert_eq!((request.width, request.height), (64, 32));
    assert_eq!(request.background_pixel, 0);
    assert_eq!(request.event_mask, WINDOW_EVENT_MASK);
    assert_eq!(
        fake.count_calls(|call| matches!(call, SystemCall::EnableDetectableAutoRepeat)),
        1
    );
}

#[test]
fn test_delete_protocol_registered() {
    let fake = FakeSystem::new();
    let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("wm", 10, 10), None);
    window.init(true).expect("init failed");

    let native = window.native_window().expect("no native window");
    let protocols = fake.atom("WM_PROTOCOLS").expect("WM_PROTOCOLS not interned");
    let delete = fake.atom("WM_DELETE_WINDOW").expect("WM_DELETE_WINDOW not interned");
    assert_eq!(
        fake.property(native, protocols),
        Some((XCB_ATOM_ATOM, PropertyValue::Card32(vec![delete])))
    );
    assert!(fake.calls().contains(&SystemCall::InternAtom {
        name: "WM_PROTOCOLS".to_string(),
        only_if_exists: true,
    }));
    assert!(fake.calls().contains(&SystemCall::InternAtom {
        name: "WM_DELETE_WINDOW".to_string(),
        only_if_exists: false,
    }));
}

#[test]
fn test_close_twice_announces_once() {
    let fake = FakeSystem::new();
    let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("twice", 10, 10), None);
    let events = record_events(&mut window);
    window.init(true).expect("init failed");

    window.close().expect("close failed");
    window.close().expect("close failed");

    let id = window.id();
    assert_eq!(*events.borrow(), vec![WindowEvent::AboutToClose { window: id }]);
    assert_eq!(fake.count_calls(|call| matches!(call, SystemCall::FreeKeySymbols)), 1);
    assert_eq!(window.state(), WindowState::CloseRequested);
}

#[test]
fn test_run_after_close_returns_immediately() {
    let fake = FakeSystem::new();
    let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("closed", 10, 10), None);
    let events = record_events(&mut window);
    window.init(true).expect("init failed");
    window.close().expect("close failed");

    window.run().expect("run failed");

    assert_eq!(events.borrow().len(), 1);
    assert_eq!(window.state(), WindowState::Closed);
    assert!(window.run().is_ok());
}

#[test]
fn test_load_failure_is_fatal() {
    init_tracing();
    let fake = FakeSystem::failing_load();
    let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("lib", 10, 10), None);

    assert!(matches!(window.init(true), Err(ViewHostError::LoaderUnavailable(_))));
    assert_eq!(window.state(), WindowState::Uninitialized);
    assert_eq!(fake.calls(), vec![SystemCall::Load]);
    assert!(matches!(window.run(), Err(ViewHostError::NotInitialized)));
}

#[test]
fn test_connection_failure_is_fatal() {
    let fake = FakeSystem::failing_connect();
    let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("conn", 10, 10), None);

    assert!(matches!(
        window.init(true),
        Err(ViewHostError::ConnectionFailure { .. })
    ));
    assert_eq!(window.native_window(), None);

    drop(window);
    assert_eq!(fake.count_calls(|call| matches!(call, SystemCall::Disconnect)), 0);
}

#[test]
fn test_adopted_window_reads_geometry() {
    let fake = FakeSystem::with_existing_window(0x0060_0001, 1024, 768);
    let mut window = XcbWindow::adopt_with_system(fake.clone(), 0x0060_0001);
    assert!(!window.is_owned());

    window.init(true).expect("init failed");
    assert_eq!(window.state(), WindowState::Adopted);
    assert_eq!((window.width(), window.height()), (1024, 768));
    assert_eq!(
        fake.count_calls(|call| matches!(call, SystemCall::CreateWindow(_))),
        0
    );

    drop(window);
    assert!(fake.window_exists(0x0060_0001));
    assert!(fake.is_mapped(0x0060_0001));
    assert!(fake.is_connected());
}

#[test]
fn test_adopted_window_geometry_failure() {
    let fake = FakeSystem::connected();
    let mut window = XcbWindow::adopt_with_system(fake, 0x0060_0002);

    assert!(matches!(
        window.init(true),
        Err(ViewHostError::GeometryQueryFailure(0x0060_0002))
    ));
}

#[test]
fn test_adopted_geometry_failure_stays_fatal() {
    init_tracing();
    let fake = FakeSystem::connected();
    let mut window = XcbWindow::adopt_with_system(fake, 0x0060_0002);

    for _ in 0..2 {
        assert!(matches!(
            window.init(true),
            Err(ViewHostError::GeometryQueryFailure(0x0060_0002))
        ));
        assert_eq!(window.state(), WindowState::Uninitialized);
        assert_eq!((window.width(), window.height()), (0, 0));
    }
}

#[test]
fn test_close_before_init_is_rejected() {
    let fake = FakeSystem::new();
    let mut window = XcbWindow::with_system(fake.clone(), &WindowConfig::new("early", 10, 10), None);
    let events = record_events(&mut window);

    assert!(matches!(window.close(), Err(ViewHostError::NotInitialized)));
    assert!(events.borrow().is_empty());
    assert!(!window.close_handle().is_requested());

    window.init(true).expect("init failed");
    assert_eq!(window.state(), WindowState::Created);
    window.close().expect("close failed");
    assert_eq!(*events.borrow(), vec![WindowEvent::AboutToClose { window: window.id() }]);
}

#[test]
fn test_adopted_window_rejects_owned_operations() {
    let fake = FakeSystem::with_existing_window(7, 10, 10);
    let mut window = XcbWindow::adopt_with_system(fake.clone(), 7);
    let events = record_events(&mut window);
    window.init(true).expect("init failed");

    assert!(matches!(
        window.run(),
        Err(ViewHostError::NotOwned { operation: "run" })
    ));
    assert!(matches!(
        window.close(),
        Err(ViewHostError::NotOwned { operation: "close" })
    ));
    assert!(matches!(
        window.pump(),
        Err(ViewHostError::NotOwned { operation: "pump" })
    ));
    assert!(events.borrow().is_empty());
}
