//! Redraw coalescing and frame scheduling.
//!
//! Redraw requests arrive many times per frame (cell updates, viewport
//! changes, hover transitions). The [`RedrawQueue`] collapses them into a
//! single pending level and asks the host [`FrameScheduler`] for one frame
//! callback per batch. A [`Redraw::Full`] request always absorbs a pending
//! [`Redraw::Quick`], never the other way round.

use std::rc::Rc;

/// Host hook used to schedule a frame callback.
///
/// The engine calls [`FrameScheduler::request_frame`] at most once per
/// coalesced batch of redraw requests; the host answers by calling
/// `Engine::tick` on its next animation frame.
pub trait FrameScheduler {
    /// Ask the host to run one frame callback.
    fn request_frame(&self);
}

/// How much of the frame pipeline the next tick has to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Redraw {
    /// Repaint only; element state is already up to date.
    Quick,
    /// Recompute the scene tree, then repaint.
    Full,
}

/// Pending-redraw flag shared by the engine, the viewport and elements.
pub struct RedrawQueue {
    pending: std::cell::Cell<Option<Redraw>>,
    scheduler: Rc<dyn FrameScheduler>,
}

impl RedrawQueue {
    /// Create an empty queue driving `scheduler`.
    pub fn new(scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self {
            pending: std::cell::Cell::new(None),
            scheduler,
        }
    }

    /// Request a redraw, promoting the pending level when needed.
    ///
    /// The scheduler is poked only on the transition from idle to pending,
    /// so repeated requests within one frame cost a flag update each.
    pub fn request(&self, redraw: Redraw) {
        let previous = self.pending.get();
        let next = match previous {
            None => redraw,
            Some(pending) => pending.max(redraw),
        };
        self.pending.set(Some(next));
        if previous.is_none() {
            self.scheduler.request_frame();
        }
    }

    /// Take the pending level, leaving the queue idle.
    pub fn take(&self) -> Option<Redraw> {
        self.pending.take()
    }

    /// Peek at the pending level without consuming it.
    pub fn pending(&self) -> Option<Redraw> {
        self.pending.get()
    }
}

/// Scheduler that drops every request, for hosts that tick on their own.
#[derive(Debug, Default)]
pub struct NoopScheduler;

impl FrameScheduler for NoopScheduler {
    fn request_frame(&self) {}
}

/// Scheduler that counts requests, for tests and headless drivers.
#[derive(Debug, Default)]
pub struct CountingScheduler {
    frames: std::cell::Cell<usize>,
}

impl CountingScheduler {
    /// Number of frame callbacks requested so far.
    pub fn requested(&self) -> usize {
        self.frames.get()
    }
}

impl FrameScheduler for CountingScheduler {
    fn request_frame(&self) {
        self.frames.set(self.frames.get() + 1);
    }
}
