//! Program output capture
//!
//! The interpreter writes through a [`StdoutSlot`]. By default the slot holds a
//! [`ConsoleSink`]; while a trace is recorded a [`RedirectGuard`] swaps in a
//! [`CaptureBuffer`] and puts the previous sink back when dropped, on every exit
//! path including unwinding.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Destination for text printed by a program
pub trait OutputSink {
    fn write_str(&mut self, text: &str);
}

/// Sink that forwards to the process stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn write_str(&mut self, text: &str) {
        let mut stdout = std::io::stdout();
        // Console output is best effort; a closed pipe must not abort the program
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// In-process buffer shared between the sink slot and its reader
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    text: Rc<RefCell<String>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything captured so far
    pub fn contents(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.text.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.borrow().is_empty()
    }
}

impl OutputSink for CaptureBuffer {
    fn write_str(&mut self, text: &str) {
        self.text.borrow_mut().push_str(text);
    }
}

/// Shared, swappable output destination
pub type StdoutSlot = Rc<RefCell<Box<dyn OutputSink>>>;

/// Create a slot that writes to the console
pub fn console_slot() -> StdoutSlot {
    Rc::new(RefCell::new(Box::new(ConsoleSink)))
}

/// Scoped redirection of a [`StdoutSlot`]
pub struct RedirectGuard {
    slot: StdoutSlot,
    previous: Option<Box<dyn OutputSink>>,
}

impl RedirectGuard {
    /// Install `sink` into `slot` until the guard is dropped
    pub fn install(slot: &StdoutSlot, sink: Box<dyn OutputSink>) -> Self {
        let previous = std::mem::replace(&mut *slot.borrow_mut(), sink);
        RedirectGuard {
            slot: Rc::clone(slot),
            previous: Some(previous),
        }
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            // try_borrow_mut: a panic raised mid-write leaves the slot borrowed
            if let Ok(mut current) = self.slot.try_borrow_mut() {
                *current = previous;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_previous_sink() {
        let outer = CaptureBuffer::new();
        let slot: StdoutSlot = Rc::new(RefCell::new(Box::new(outer.clone())));

        {
            let inner = CaptureBuffer::new();
            let _guard = RedirectGuard::install(&slot, Box::new(inner.clone()));
            slot.borrow_mut().write_str("captured");
            assert_eq!(inner.contents(), "captured");
        }

        slot.borrow_mut().write_str("after");
        assert_eq!(outer.contents(), "after");
    }

    #[test]
    fn test_guard_restores_on_unwind() {
        let outer = CaptureBuffer::new();
        let slot: StdoutSlot = Rc::new(RefCell::new(Box::new(outer.clone())));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = RedirectGuard::install(&slot, Box::new(CaptureBuffer::new()));
            panic!("boom");
        }));
        assert!(result.is_err());

        slot.borrow_mut().write_str("restored");
        assert_eq!(outer.contents(), "restored");
    }
}
