//! LED worker loop against a recording strip.

use std::cell::RefCell;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Waker};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use nrf_velokeys::config::{LED_COUNT, LED_EVENT_CAPACITY};
use nrf_velokeys::events::LedEvent;
use nrf_velokeys::led::engine::run_led_engine;
use nrf_velokeys::led::{BLACK, Frame, LedStrip};
use nrf_velokeys::power::{BLACKOUT_DONE, BLACKOUT_REQUEST};
use nrf_velokeys::watchdog::LivenessChannel;

#[derive(Clone, Default)]
struct RecordingStrip {
    frames: Rc<RefCell<Vec<Frame>>>,
}

impl LedStrip for RecordingStrip {
    fn render(&mut self, pixels: &Frame) {
        self.frames.borrow_mut().push(*pixels);
    }
}

#[derive(Clone, Default)]
struct FeedCounter {
    feeds: Rc<RefCell<u32>>,
}

impl LivenessChannel for FeedCounter {
    fn feed(&mut self) {
        *self.feeds.borrow_mut() += 1;
    }
}

#[test]
fn blackout_request_renders_black_and_answers() {
    let events: Channel<CriticalSectionRawMutex, LedEvent, LED_EVENT_CAPACITY> = Channel::new();
    let mut strip = RecordingStrip::default();
    let frames = strip.frames.clone();
    let mut watchdog = FeedCounter::default();
    let feeds = watchdog.feeds.clone();

    let mut cx = Context::from_waker(Waker::noop());
    let mut worker = pin!(run_led_engine(&mut strip, events.receiver(), &mut watchdog));

    // first startup frame, then parked on the frame timer
    assert!(worker.as_mut().poll(&mut cx).is_pending());
    assert_eq!(frames.borrow().len(), 1);
    assert_eq!(*feeds.borrow(), 1);
    assert!(!BLACKOUT_DONE.signaled());

    BLACKOUT_REQUEST.signal(());
    assert!(worker.as_mut().poll(&mut cx).is_pending());

    let frames = frames.borrow();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1], [BLACK; LED_COUNT]);
    assert!(BLACKOUT_DONE.signaled());
    // the worker went round once more after answering
    assert_eq!(*feeds.borrow(), 2);
}
