//! The engine: scene tree, viewport, input and the frame loop.
//!
//! The engine owns the authoritative state (root elements, viewport,
//! attractor registry, redraw queue) and glues the other modules together.
//! Hosts feed it raw pointer input and call [`Engine::tick`] once per
//! animation frame whenever the [`FrameScheduler`] was poked; everything
//! else happens inside.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use kurbo::Point;
use peniko::Color;
use serde::{Deserialize, Serialize};

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

use crate::attractor::{AttractorRegistry, ATTRACTOR_RADIUS_PX};
use crate::cells::PointCell;
use crate::gesture::{GestureConfig, GestureDispatcher, GestureEvent, PointerInput, WheelAction};
use crate::metrics::{self, MetricsSink, NullMetrics};
use crate::render::{Batch, DrawSurface, RecordingSurface};
use crate::scene::{attach_element, render_element, tick_element, Element, ElementContext};
use crate::schedule::{FrameScheduler, NoopScheduler, Redraw, RedrawQueue};
use crate::stream::Subscription;
use crate::viewport::{Viewport, ViewportConfig};

/// Pixel radius of a rendered attractor marker.
const ATTRACTOR_MARKER_RADIUS: f64 = 5.0;

/// Pixel radius of a hovered attractor marker.
const HOVERED_ATTRACTOR_MARKER_RADIUS: f64 = 8.0;

/// Engine-wide configuration, deserializable from host settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial viewport state.
    pub viewport: ViewportConfig,
    /// Gesture tuning.
    pub gesture: GestureConfig,
}

/// Handle identifying a root element, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

/// Deferred element additions.
///
/// Gesture callbacks cannot reach into the engine while it is dispatching,
/// so authoring code pushes new elements here and the engine adopts them
/// right after input handling and at the start of every tick.
#[derive(Clone, Default)]
pub struct ElementQueue {
    pending: Rc<RefCell<Vec<Box<dyn Element>>>>,
}

impl ElementQueue {
    /// Queue an element for adoption into the engine.
    pub fn push(&self, element: Box<dyn Element>) {
        self.pending.borrow_mut().push(element);
    }

    fn drain(&self) -> Vec<Box<dyn Element>> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

/// Which gestures an edit session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// Author with clicks: first click starts, every click reports.
    Clicks,
    /// Author with a press-drag-release gesture.
    DragAndDrop,
    /// Whichever of the two happens first.
    Auto,
}

/// Callbacks and switches for [`Engine::activate_edit_mode`].
pub struct EditModeOptions {
    /// Gesture style to listen for.
    pub mode: EditMode,
    /// Request a full redraw on every pointer move while active.
    pub auto_rerender: bool,
    /// Runs once when authoring starts (first click or drag start).
    pub on_start: Option<Box<dyn FnMut(Point)>>,
    /// Runs for every world-space pointer move after authoring started.
    pub on_move: Option<Box<dyn FnMut(Point)>>,
    /// Runs for every click, the starting one included.
    pub on_click: Option<Box<dyn FnMut(Point)>>,
    /// Runs when a drag ends, after authoring started via drag.
    pub on_end: Option<Box<dyn FnMut(Point)>>,
}

impl Default for EditModeOptions {
    fn default() -> Self {
        Self {
            mode: EditMode::Auto,
            auto_rerender: false,
            on_start: None,
            on_move: None,
            on_click: None,
            on_end: None,
        }
    }
}

/// A live edit-mode binding. Cancelling tears down every subscription the
/// activation created and restores default pointer behavior.
pub struct EditSession {
    subscriptions: Rc<RefCell<Vec<Subscription>>>,
    active: Rc<std::cell::Cell<bool>>,
}

impl EditSession {
    /// Tear the session down. Safe to call more than once, including from
    /// inside the session's own callbacks.
    pub fn cancel(&self) {
        for subscription in self.subscriptions.borrow().iter() {
            subscription.cancel();
        }
        self.active.set(false);
    }

    /// Whether the session still intercepts input.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// The drafting engine.
pub struct Engine {
    viewport: Rc<RefCell<Viewport>>,
    attractors: Rc<RefCell<AttractorRegistry>>,
    redraw: Rc<RedrawQueue>,
    metrics: Rc<dyn MetricsSink>,
    surface: Rc<RefCell<dyn DrawSurface>>,
    dispatcher: GestureDispatcher,
    ctx: ElementContext,
    roots: Vec<(ElementId, Box<dyn Element>)>,
    next_element_id: u64,
    queue: ElementQueue,
    dragged: Option<PointCell>,
    edit_active: Rc<std::cell::Cell<bool>>,
    last_tick: Option<Instant>,
}

impl Engine {
    /// Create an engine drawing onto `surface`.
    pub fn new(
        surface: Rc<RefCell<dyn DrawSurface>>,
        scheduler: Rc<dyn FrameScheduler>,
        metrics: Rc<dyn MetricsSink>,
        config: EngineConfig,
    ) -> Self {
        let redraw = Rc::new(RedrawQueue::new(scheduler));
        let viewport = Rc::new(RefCell::new(Viewport::with_config(
            &config.viewport,
            Rc::clone(&redraw),
        )));
        let attractors = Rc::new(RefCell::new(AttractorRegistry::new()));
        let ctx = ElementContext::new(
            Rc::clone(&viewport),
            Rc::clone(&attractors),
            Rc::clone(&redraw),
            Rc::clone(&metrics),
            Rc::clone(&surface),
        );
        Self {
            viewport,
            attractors,
            redraw,
            metrics,
            surface,
            dispatcher: GestureDispatcher::new(config.gesture),
            ctx,
            roots: Vec::new(),
            next_element_id: 1,
            queue: ElementQueue::default(),
            dragged: None,
            edit_active: Rc::new(std::cell::Cell::new(false)),
            last_tick: None,
        }
    }

    /// Convenience constructor for tests and headless hosts: a recording
    /// surface, no-op scheduling and no metrics.
    pub fn with_recording_surface(config: EngineConfig) -> (Self, Rc<RefCell<RecordingSurface>>) {
        let surface = Rc::new(RefCell::new(RecordingSurface::new()));
        let engine = Self::new(
            Rc::clone(&surface) as Rc<RefCell<dyn DrawSurface>>,
            Rc::new(NoopScheduler),
            Rc::new(NullMetrics),
            config,
        );
        (engine, surface)
    }

    /// The viewport, shared with every attached element.
    pub fn viewport(&self) -> Ref<'_, Viewport> {
        self.viewport.borrow()
    }

    /// Handle for deferred element additions from gesture callbacks.
    pub fn element_queue(&self) -> ElementQueue {
        self.queue.clone()
    }

    /// Number of root elements.
    pub fn element_count(&self) -> usize {
        self.roots.len()
    }

    /// The pending redraw level, if any.
    pub fn pending_redraw(&self) -> Option<Redraw> {
        self.redraw.pending()
    }

    /// Ask for a redraw on the next frame.
    pub fn request_redraw(&self, redraw: Redraw) {
        self.redraw.request(redraw);
    }

    /// Attach and add a root element. Requests a full redraw.
    pub fn add(&mut self, element: impl Element + 'static) -> ElementId {
        self.add_boxed(Box::new(element))
    }

    fn add_boxed(&mut self, mut element: Box<dyn Element>) -> ElementId {
        attach_element(element.as_mut(), &self.ctx);
        let id = ElementId(self.next_element_id);
        self.next_element_id += 1;
        self.roots.push((id, element));
        self.redraw.request(Redraw::Full);
        id
    }

    /// Remove a root element. Returns whether it was present.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let before = self.roots.len();
        self.roots.retain(|(existing, _)| *existing != id);
        let removed = self.roots.len() != before;
        if removed {
            self.redraw.request(Redraw::Full);
        }
        removed
    }

    /// Adopt a new canvas size from the host.
    pub fn resize(&mut self, logical_width: f64, logical_height: f64, scale_factor: f64) {
        self.viewport
            .borrow_mut()
            .on_resize(logical_width, logical_height, scale_factor);
    }

    /// Feed one raw pointer event through gesture classification and apply
    /// the resulting behavior.
    pub fn pointer_input(&mut self, input: PointerInput) {
        let events = {
            let viewport = self.viewport.borrow();
            self.dispatcher.handle(input, &viewport)
        };
        for event in events {
            self.apply_gesture(event);
        }
        self.adopt_pending_elements();
    }

    fn apply_gesture(&mut self, event: GestureEvent) {
        match event {
            GestureEvent::PointerMoved { world, .. } => {
                self.metrics.incr(metrics::HOVER_CHECKS);
                let radius = self
                    .viewport
                    .borrow()
                    .measure_screen_in_world(ATTRACTOR_RADIUS_PX);
                if self.attractors.borrow_mut().check_hover(world, radius) {
                    self.redraw.request(Redraw::Quick);
                }
            }
            GestureEvent::Click { .. } => {
                // Click consumers subscribe to the dispatcher streams.
            }
            GestureEvent::DragStarted { world } => {
                if !self.edit_active.get() {
                    let radius = self
                        .viewport
                        .borrow()
                        .measure_screen_in_world(ATTRACTOR_RADIUS_PX);
                    self.dragged = self.attractors.borrow().find(world, radius);
                }
            }
            GestureEvent::DragMoved { world, movement } => {
                if self.edit_active.get() {
                    return;
                }
                if let Some(dragged) = &self.dragged {
                    dragged.set(world);
                    self.redraw.request(Redraw::Full);
                } else {
                    self.viewport.borrow_mut().pan(movement);
                }
            }
            GestureEvent::DragEnded { .. } => {
                self.dragged = None;
            }
            GestureEvent::Wheel(action) => self.apply_wheel(action),
        }
    }

    fn apply_wheel(&mut self, action: WheelAction) {
        let mut viewport = self.viewport.borrow_mut();
        match action {
            WheelAction::PinchZoom { anchor, zoom_delta } => {
                let target = viewport.zoom() + zoom_delta;
                viewport.set_zoom_at(anchor, target);
            }
            WheelAction::Pan { delta } => viewport.pan(delta),
            WheelAction::ZoomStep { anchor, factor } => viewport.zoom_at(anchor, factor),
        }
    }

    /// Bind pointer gestures to authoring callbacks.
    ///
    /// While a session is active the default drag behaviors (panning,
    /// attractor dragging) are suspended; wheel zoom and hover highlighting
    /// keep working. The returned [`EditSession`] is the only way to end
    /// the binding.
    pub fn activate_edit_mode(&mut self, options: EditModeOptions) -> EditSession {
        let EditModeOptions {
            mode,
            auto_rerender,
            on_start,
            on_move,
            on_click,
            on_end,
        } = options;

        self.edit_active.set(true);
        let subscriptions: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
        let started = Rc::new(std::cell::Cell::new(false));

        let on_start = Rc::new(RefCell::new(on_start));
        let on_move = Rc::new(RefCell::new(on_move));
        let on_click = Rc::new(RefCell::new(on_click));
        let on_end = Rc::new(RefCell::new(on_end));

        let world_moves = self.dispatcher.world_moves().clone();

        if auto_rerender {
            let redraw = Rc::clone(&self.redraw);
            let sub = world_moves.subscribe(move |_| redraw.request(Redraw::Full));
            subscriptions.borrow_mut().push(sub);
        }

        // Click path, wired in every mode: each click reports, the first
        // one starts authoring and opens the move feed.
        let clicks_sub = {
            let started = Rc::clone(&started);
            let on_click = Rc::clone(&on_click);
            let on_start = Rc::clone(&on_start);
            let on_move = Rc::clone(&on_move);
            let world_moves = world_moves.clone();
            let subscriptions = Rc::clone(&subscriptions);
            self.dispatcher.clicks().subscribe(move |point| {
                if let Some(callback) = on_click.borrow_mut().as_mut() {
                    callback(*point);
                }
                if !started.get() {
                    started.set(true);
                    if let Some(callback) = on_start.borrow_mut().as_mut() {
                        callback(*point);
                    }
                    let on_move = Rc::clone(&on_move);
                    let move_sub = world_moves.subscribe(move |p| {
                        if let Some(callback) = on_move.borrow_mut().as_mut() {
                            callback(*p);
                        }
                    });
                    subscriptions.borrow_mut().push(move_sub);
                }
            })
        };
        subscriptions.borrow_mut().push(clicks_sub.clone());

        // Drag path: the first drag start retires the click path and its
        // own detector, then opens the move and end feeds.
        if matches!(mode, EditMode::DragAndDrop | EditMode::Auto) {
            let started = Rc::clone(&started);
            let on_start = Rc::clone(&on_start);
            let on_move = Rc::clone(&on_move);
            let on_end = Rc::clone(&on_end);
            let world_moves = world_moves.clone();
            let drag_ends = self.dispatcher.drag_ends().clone();
            let subscriptions_handle = Rc::clone(&subscriptions);
            let own_sub: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
            let own_sub_handle = Rc::clone(&own_sub);

            let drag_sub = self.dispatcher.drag_starts().subscribe(move |point| {
                if let Some(own) = own_sub_handle.borrow().as_ref() {
                    own.cancel();
                }
                clicks_sub.cancel();

                if !started.get() {
                    started.set(true);
                    if let Some(callback) = on_start.borrow_mut().as_mut() {
                        callback(*point);
                    }
                    let on_move = Rc::clone(&on_move);
                    let move_sub = world_moves.subscribe(move |p| {
                        if let Some(callback) = on_move.borrow_mut().as_mut() {
                            callback(*p);
                        }
                    });
                    subscriptions_handle.borrow_mut().push(move_sub);
                }

                let on_end = Rc::clone(&on_end);
                let end_sub = drag_ends.subscribe(move |p| {
                    if let Some(callback) = on_end.borrow_mut().as_mut() {
                        callback(*p);
                    }
                });
                subscriptions_handle.borrow_mut().push(end_sub);
            });
            *own_sub.borrow_mut() = Some(drag_sub.clone());
            subscriptions.borrow_mut().push(drag_sub);
        }

        EditSession {
            subscriptions,
            active: Rc::clone(&self.edit_active),
        }
    }

    /// Run one frame if a redraw is pending.
    ///
    /// A [`Redraw::Full`] walks the scene tree (compute, constraints,
    /// update) before painting; a [`Redraw::Quick`] repaints only.
    pub fn tick(&mut self) {
        self.adopt_pending_elements();
        let Some(redraw) = self.redraw.take() else {
            return;
        };

        let now = Instant::now();
        let dt = self
            .last_tick
            .map(|previous| now.duration_since(previous).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        if redraw == Redraw::Full {
            let mut visited = 0;
            for (_, element) in &mut self.roots {
                visited += tick_element(element.as_mut(), &self.ctx, dt);
            }
            self.metrics
                .gauge(metrics::ELEMENTS_UPDATED, visited as f64);
        }

        self.render_frame();

        self.metrics.gauge(metrics::ZOOM, self.viewport.borrow().zoom());
        self.metrics
            .gauge(metrics::FRAME_MS, now.elapsed().as_secs_f64() * 1000.0);
        self.metrics.frame_finished();
    }

    fn render_frame(&mut self) {
        {
            let viewport = self.viewport.borrow();
            self.surface
                .borrow_mut()
                .begin_frame(viewport.view(), viewport.size());
        }
        for (_, element) in &self.roots {
            render_element(element.as_ref(), &self.ctx);
        }
        self.render_attractors();
        self.surface.borrow_mut().end_frame();
    }

    fn render_attractors(&self) {
        let attractors = self.attractors.borrow();
        if attractors.is_empty() {
            return;
        }
        let mut batch = Batch::new(Color::from_rgba8(255, 165, 0, 255)); // orange
        for attractor in attractors.iter() {
            let radius = if attractor.is_hovered() {
                HOVERED_ATTRACTOR_MARKER_RADIUS
            } else {
                ATTRACTOR_MARKER_RADIUS
            };
            batch.point_sized(attractor.position().get(), radius);
        }
        batch.fill(&mut *self.surface.borrow_mut());
    }

    fn adopt_pending_elements(&mut self) {
        for element in self.queue.drain() {
            self.add_boxed(element);
        }
    }
}
