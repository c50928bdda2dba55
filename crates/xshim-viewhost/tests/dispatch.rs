//! Event loop and dispatch behaviour.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use xshim_common::WindowConfig;
use xshim_viewhost::{
    ButtonEvent, CloseHandle, FakeSystem, KeyEvent, KeyId, PresentCallback, SystemCall, WindowEvent,
    WindowState, XcbEvent, XcbWindow,
};

struct Harness {
    fake: FakeSystem,
    window: XcbWindow<FakeSystem>,
    events: Rc<RefCell<Vec<WindowEvent>>>,
}

impl Harness {
    fn new(config: WindowConfig, present: Option<PresentCallback>) -> Self {
        let fake = FakeSystem::new();
        let mut window = XcbWindow::with_system(fake.clone(), &config, present);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        window.add_event_callback(Box::new(move |event| sink.borrow_mut().push(event.clone())));
        window.init(true).expect("init failed");
        Self {
            fake,
            window,
            events,
        }
    }

    fn closable() -> Self {
        Self::new(WindowConfig::new("dispatch", 320, 240), None)
    }

    fn native(&self) -> u32 {
        self.window.native_window().expect("no native window")
    }

    fn take_events(&self) -> Vec<WindowEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

fn key(keycode: u8) -> KeyEvent {
    KeyEvent {
        keycode,
        state: 0,
        time: 0,
    }
}

fn button(button: u8, time: u32) -> ButtonEvent {
    ButtonEvent { button, time }
}

#[test]
fn test_delete_message_stops_closable_window() {
    let mut h = Harness::closable();
    let message = h.fake.delete_window_message(h.native());

    assert!(!h.window.dispatch(message));

    let id = h.window.id();
    assert_eq!(h.take_events(), vec![WindowEvent::CloseEvent { window: id }]);
}

#[test]
fn test_delete_message_ignored_by_non_closable_window() {
    let frames = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&frames);
    let handle_slot: Rc<RefCell<Option<CloseHandle>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&handle_slot);
    let present: PresentCallback = Box::new(move || {
        counter.set(counter.get() + 1);
        if let Some(handle) = slot.borrow().as_ref() {
            handle.request_close();
        }
    });
    let config = WindowConfig::new("pinned", 320, 240).closable(false);
    let mut h = Harness::new(config, Some(present));
    *handle_slot.borrow_mut() = Some(h.window.close_handle());

    let message = h.fake.delete_window_message(h.native());
    assert!(h.window.dispatch(message.clone()));
    assert!(h.take_events().is_empty());

    // Both messages are consumed; only the idle present stops the loop.
    h.fake.push_event(message.clone());
    h.fake.push_event(message);
    h.window.run().expect("run failed");

    let id = h.window.id();
    assert_eq!(frames.get(), 1);
    assert_eq!(h.fake.pending_events(), 0);
    assert_eq!(h.take_events(), vec![WindowEvent::AboutToClose { window: id }]);
    assert_eq!(h.window.state(), WindowState::Closed);
}

#[test]
fn test_destroy_notify_always_stops() {
    let config = WindowConfig::new("pinned", 320, 240).closable(false);
    let mut h = Harness::new(config, None);
    let native = h.native();

    assert!(!h.window.dispatch(XcbEvent::DestroyNotify { window: native }));

    let id = h.window.id();
    assert_eq!(h.take_events(), vec![WindowEvent::CloseEvent { window: id }]);
}

#[test]
fn test_foreign_client_message_ignored() {
    let mut h = Harness::closable();
    let message = XcbEvent::ClientMessage {
        window: h.native(),
        message_type: 999,
        data: [12345, 0, 0, 0, 0],
    };

    assert!(h.window.dispatch(message));
    assert!(h.take_events().is_empty());
}

#[test]
fn test_first_motion_only_records_position() {
    let mut h = Harness::closable();

    assert!(h.window.dispatch(XcbEvent::MotionNotify { x: 40, y: 30, time: 1 }));
    assert!(h.take_events().is_empty());
    assert_eq!(
        h.fake.count_calls(|call| matches!(call, SystemCall::WarpPointer { .. })),
        0
    );

    assert!(h.window.dispatch(XcbEvent::MotionNotify { x: 43, y: 20, time: 2 }));
    let id = h.window.id();
    assert_eq!(
        h.take_events(),
        vec![WindowEvent::MouseMoved { window: id, dx: 3, dy: -10 }]
    );
    assert!(h.fake.calls().contains(&SystemCall::WarpPointer {
        window: h.native(),
        x: 256,
        y: 256,
    }));
}

#[test]
fn test_recentered_motion_never_notifies() {
    let mut h = Harness::closable();

    for time in 0..5 {
        assert!(h.window.dispatch(XcbEvent::MotionNotify { x: 256, y: 256, time }));
    }
    assert!(h.take_events().is_empty());

    assert!(h.window.dispatch(XcbEvent::MotionNotify { x: 260, y: 250, time: 6 }));
    let id = h.window.id();
    assert_eq!(
        h.take_events(),
        vec![WindowEvent::MouseMoved { window: id, dx: 4, dy: -6 }]
    );
}

#[test]
fn test_letters_reported_uppercase() {
    let mut h = Harness::closable();
    h.fake.map_key(38, u32::from(b'a'));
    h.fake.map_key(52, u32::from(b'z'));
    h.fake.map_key(9, KeyId::ESCAPE.raw());

    assert!(h.window.dispatch(XcbEvent::KeyPress(key(38))));
    assert!(h.window.dispatch(XcbEvent::KeyRelease(key(52))));
    assert!(h.window.dispatch(XcbEvent::KeyPress(key(9))));

    let id = h.window.id();
    assert_eq!(
        h.take_events(),
        vec![
            WindowEvent::KeypressPressed {
                window: id,
                key: KeyId::from_keysym(u32::from(b'A')),
            },
            WindowEvent::KeypressReleased {
                window: id,
                key: KeyId::from_keysym(u32::from(b'Z')),
            },
            WindowEvent::KeypressPressed {
                window: id,
                key: KeyId::ESCAPE,
            },
        ]
    );
}

#[test]
fn test_mouse_buttons_map_to_logical_keys() {
    let mut h = Harness::closable();

    for (detail, time) in [(1, 10), (2, 20), (3, 30)] {
        assert!(h.window.dispatch(XcbEvent::ButtonPress(button(detail, time))));
        assert!(h.window.dispatch(XcbEvent::ButtonRelease(button(detail, time + 1))));
    }

    let id = h.window.id();
    assert_eq!(
        h.take_events(),
        vec![
            WindowEvent::KeypressPressed { window: id, key: KeyId::LBUTTON },
            WindowEvent::KeypressReleased { window: id, key: KeyId::LBUTTON },
            WindowEvent::KeypressPressed { window: id, key: KeyId::MBUTTON },
            WindowEvent::KeypressReleased { window: id, key: KeyId::MBUTTON },
            WindowEvent::KeypressPressed { window: id, key: KeyId::RBUTTON },
            WindowEvent::KeypressReleased { window: id, key: KeyId::RBUTTON },
        ]
    );
}

#[test]
fn test_press_with_release_timestamp_suppressed() {
    let mut h = Harness::closable();
    let id = h.window.id();

    assert!(h.window.dispatch(XcbEvent::ButtonRelease(button(1, 500))));
    assert!(h.window.dispatch(XcbEvent::ButtonPress(button(1, 500))));
    assert_eq!(
        h.take_events(),
        vec![WindowEvent::KeypressReleased { window: id, key: KeyId::LBUTTON }]
    );

    assert!(h.window.dispatch(XcbEvent::ButtonPress(button(1, 501))));
    assert_eq!(
        h.take_events(),
        vec![WindowEvent::KeypressPressed { window: id, key: KeyId::LBUTTON }]
    );
}

#[test]
fn test_expose_presents_without_notifying() {
    let frames = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&frames);
    let present: PresentCallback = Box::new(move || counter.set(counter.get() + 1));
    let mut h = Harness::new(WindowConfig::new("expose", 100, 100), Some(present));
    let native = h.native();

    assert!(h.window.dispatch(XcbEvent::Expose { window: native, count: 0 }));
    assert_eq!(frames.get(), 1);
    assert!(h.take_events().is_empty());

    h.window.close_handle().request_close();
    assert!(!h.window.dispatch(XcbEvent::Expose { window: native, count: 0 }));
    assert_eq!(frames.get(), 2);
}

#[test]
fn test_button_release_does_not_present() {
    let frames = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&frames);
    let present: PresentCallback = Box::new(move || counter.set(counter.get() + 1));
    let mut h = Harness::new(WindowConfig::new("independent", 100, 100), Some(present));

    assert!(h.window.dispatch(XcbEvent::ButtonRelease(button(1, 1))));
    assert!(h.window.dispatch(XcbEvent::ButtonPress(button(1, 2))));
    assert_eq!(frames.get(), 0);
}

#[test]
fn test_run_presents_until_close_handle() {
    let frames = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&frames);
    let handle_slot: Rc<RefCell<Option<CloseHandle>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&handle_slot);
    let present: PresentCallback = Box::new(move || {
        counter.set(counter.get() + 1);
        if counter.get() == 5 {
            if let Some(handle) = slot.borrow().as_ref() {
                handle.request_close();
            }
        }
    });
    let mut h = Harness::new(WindowConfig::new("frames", 100, 100), Some(present));
    *handle_slot.borrow_mut() = Some(h.window.close_handle());

    h.window.run().expect("run failed");

    assert_eq!(frames.get(), 5);
    let id = h.window.id();
    assert_eq!(h.take_events(), vec![WindowEvent::AboutToClose { window: id }]);
    assert!(h.window.close_finished());
}

#[test]
fn test_events_reach_every_subscriber_in_order() {
    let mut h = Harness::closable();
    let order = Rc::new(RefCell::new(Vec::new()));
    for tag in ["first", "second"] {
        let order = Rc::clone(&order);
        h.window
            .add_event_callback(Box::new(move |_| order.borrow_mut().push(tag)));
    }

    h.fake.push_event(XcbEvent::ButtonPress(button(1, 1)));
    assert!(matches!(h.window.pump(), Ok(true)));

    assert_eq!(*order.borrow(), vec!["first", "second"]);
    assert_eq!(h.take_events().len(), 1);
}
