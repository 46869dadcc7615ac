//! Shared fixtures for element unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use inkplot_core::attractor::AttractorRegistry;
use inkplot_core::metrics::NullMetrics;
use inkplot_core::render::{DrawSurface, RecordingSurface};
use inkplot_core::scene::ElementContext;
use inkplot_core::schedule::{NoopScheduler, RedrawQueue};
use inkplot_core::viewport::Viewport;

/// An element context over a default 800x600 viewport and a recording
/// surface, detached from any engine.
pub fn harness() -> (ElementContext, Rc<RefCell<RecordingSurface>>) {
    let redraw = Rc::new(RedrawQueue::new(Rc::new(NoopScheduler)));
    let viewport = Rc::new(RefCell::new(Viewport::new(
        800.0,
        600.0,
        1.0,
        Rc::clone(&redraw),
    )));
    let attractors = Rc::new(RefCell::new(AttractorRegistry::new()));
    let surface = Rc::new(RefCell::new(RecordingSurface::new()));
    let ctx = ElementContext::new(
        viewport,
        attractors,
        redraw,
        Rc::new(NullMetrics),
        Rc::clone(&surface) as Rc<RefCell<dyn DrawSurface>>,
    );
    (ctx, surface)
}
