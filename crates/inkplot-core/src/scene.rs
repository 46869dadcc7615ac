//! Scene tree, element protocol and the per-frame walks.
//!
//! An [`Element`] is a node in a tree with per-frame hooks. Every full frame
//! runs two walks over the tree:
//!
//! 1. the tick walk ([`tick_element`]): depth-first pre-order `compute`,
//!    then the element's declarative constraints in registration order,
//!    then the children, then `update`. Parents compute before their
//!    children read them, and update bottom-up after the children settled;
//! 2. the render walk ([`render_element`]): children paint before their
//!    parent, each element bracketed by a rotation push/pop when its
//!    rotation is nonzero.
//!
//! A failing hook is logged and skipped; it never stalls sibling elements.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use kurbo::{Point, Size};
use thiserror::Error;

use crate::attractor::AttractorRegistry;
use crate::cells::Binding;
use crate::metrics::MetricsSink;
use crate::render::DrawSurface;
use crate::schedule::{Redraw, RedrawQueue};
use crate::viewport::Viewport;

/// Scene-tree errors.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Element needed its engine context before being attached.
    #[error("Element is not attached to an engine")]
    Detached,
    /// A declarative constraint could not be evaluated.
    #[error("Constraint `{name}` failed: {message}")]
    Constraint { name: String, message: String },
    /// An element hook reported a failure.
    #[error("Element error: {0}")]
    Element(String),
}

/// Result type for element hooks.
pub type SceneResult<T> = Result<T, SceneError>;

/// Shared engine state handed to every element at attach time.
///
/// Elements resolve the viewport, the attractor registry, the redraw queue
/// and the draw surface through their context instead of reaching for a
/// parent chain or a global.
#[derive(Clone)]
pub struct ElementContext {
    viewport: Rc<RefCell<Viewport>>,
    attractors: Rc<RefCell<AttractorRegistry>>,
    redraw: Rc<RedrawQueue>,
    metrics: Rc<dyn MetricsSink>,
    surface: Rc<RefCell<dyn DrawSurface>>,
}

impl ElementContext {
    /// Bundle the engine-owned state into a context.
    pub fn new(
        viewport: Rc<RefCell<Viewport>>,
        attractors: Rc<RefCell<AttractorRegistry>>,
        redraw: Rc<RedrawQueue>,
        metrics: Rc<dyn MetricsSink>,
        surface: Rc<RefCell<dyn DrawSurface>>,
    ) -> Self {
        Self {
            viewport,
            attractors,
            redraw,
            metrics,
            surface,
        }
    }

    /// The viewport, for coordinate conversion.
    pub fn viewport(&self) -> Ref<'_, Viewport> {
        self.viewport.borrow()
    }

    /// The attractor registry, for registering draggable points.
    pub fn attractors(&self) -> RefMut<'_, AttractorRegistry> {
        self.attractors.borrow_mut()
    }

    /// The draw surface. Borrow it only for the duration of a flush.
    pub fn surface_mut(&self) -> RefMut<'_, dyn DrawSurface> {
        self.surface.borrow_mut()
    }

    /// The engine's metrics sink.
    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }

    /// Ask for a redraw.
    pub fn request_redraw(&self, redraw: Redraw) {
        self.redraw.request(redraw);
    }

    /// Convert a pixel length to world units at the current zoom.
    pub fn measure_screen_in_world(&self, pixels: f64) -> f64 {
        self.viewport.borrow().measure_screen_in_world(pixels)
    }

    /// Measure a text run; the result is in physical pixels.
    pub fn measure_text(&self, text: &str, font_px: f64) -> Size {
        self.surface.borrow_mut().measure_text(text, font_px)
    }
}

struct Constraint {
    name: String,
    apply: Box<dyn FnMut() -> SceneResult<()>>,
}

/// Per-node state every element carries.
#[derive(Default)]
pub struct ElementBase {
    /// Render-time rotation in radians, counter-clockwise in world
    /// orientation, applied around `origin`.
    pub rotation: Binding<f64>,
    /// World-space pivot for `rotation`.
    pub origin: Binding<Point>,
    children: Vec<Box<dyn Element>>,
    constraints: Vec<Constraint>,
    context: Option<ElementContext>,
    composed: bool,
}

impl ElementBase {
    /// Create an empty base with no rotation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the element has been attached to an engine.
    pub fn is_attached(&self) -> bool {
        self.context.is_some()
    }

    /// The engine context, failing fast before attach.
    pub fn context(&self) -> SceneResult<&ElementContext> {
        self.context.as_ref().ok_or(SceneError::Detached)
    }

    /// Append a child. When this element is already attached the child is
    /// attached immediately; otherwise attach happens with the parent.
    pub fn add_child(&mut self, mut child: Box<dyn Element>) {
        if let Some(ctx) = self.context.clone() {
            attach_element(child.as_mut(), &ctx);
        }
        self.children.push(child);
    }

    /// Drop every child the predicate rejects. Removed children simply
    /// stop being walked; there is no explicit destroy step.
    pub fn retain_children(&mut self, mut keep: impl FnMut(&dyn Element) -> bool) {
        self.children.retain(|child| keep(child.as_ref()));
    }

    /// Current children, in paint order.
    pub fn children(&self) -> &[Box<dyn Element>] {
        &self.children
    }

    /// Register a named constraint evaluated once per tick, in
    /// registration order, after `compute` and before the children tick.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        apply: impl FnMut() -> SceneResult<()> + 'static,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            apply: Box::new(apply),
        });
    }
}

/// A node in the scene tree.
///
/// All hooks default to no-ops; an element implements the ones it needs.
pub trait Element {
    /// The shared per-node state.
    fn base(&self) -> &ElementBase;

    /// The shared per-node state, mutably.
    fn base_mut(&mut self) -> &mut ElementBase;

    /// Short name used in log messages.
    fn kind(&self) -> &'static str;

    /// Runs once when the element joins an attached tree, before
    /// children are attached and before composition.
    fn on_attach(&mut self, ctx: &ElementContext) -> SceneResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Expand into implicit children. Runs exactly once, at attach; the
    /// returned elements are appended after any manually added children.
    fn compose(&mut self, ctx: &ElementContext) -> SceneResult<Vec<Box<dyn Element>>> {
        let _ = ctx;
        Ok(Vec::new())
    }

    /// Recompute geometry from cells before constraints and children run.
    fn compute(&mut self, ctx: &ElementContext) -> SceneResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Per-frame state step, called bottom-up after the children ticked.
    /// `dt` is the time since the previous full frame, in seconds.
    fn update(&mut self, ctx: &ElementContext, dt: f64) -> SceneResult<()> {
        let _ = (ctx, dt);
        Ok(())
    }

    /// Emit draw batches. Children have already rendered.
    fn render(&self, ctx: &ElementContext) -> SceneResult<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Attach `element` (and its subtree) to an engine context.
///
/// Idempotent: an already-attached element is left alone. Attach order is
/// `on_attach`, then existing children, then one-time composition with the
/// composed children appended last.
pub fn attach_element(element: &mut dyn Element, ctx: &ElementContext) {
    if element.base().is_attached() {
        return;
    }
    element.base_mut().context = Some(ctx.clone());

    if let Err(err) = element.on_attach(ctx) {
        log::warn!("{} failed to attach: {err}", element.kind());
    }

    let mut children = std::mem::take(&mut element.base_mut().children);
    for child in &mut children {
        attach_element(child.as_mut(), ctx);
    }
    element.base_mut().children = children;

    if !element.base().composed {
        element.base_mut().composed = true;
        match element.compose(ctx) {
            Ok(mut composed) => {
                for child in &mut composed {
                    attach_element(child.as_mut(), ctx);
                }
                element.base_mut().children.append(&mut composed);
            }
            Err(err) => log::warn!("{} failed to compose: {err}", element.kind()),
        }
    }
}

/// Run the tick walk over `element` and its subtree.
///
/// Returns the number of elements visited. A failed `compute` skips the
/// element's constraints, children and update; failures elsewhere skip only
/// the failing hook. Siblings always continue.
pub fn tick_element(element: &mut dyn Element, ctx: &ElementContext, dt: f64) -> usize {
    let mut visited = 1;

    if let Err(err) = element.compute(ctx) {
        log::warn!("{} compute failed: {err}", element.kind());
        return visited;
    }

    let base = element.base_mut();
    for constraint in &mut base.constraints {
        if let Err(err) = (constraint.apply)() {
            log::warn!("constraint `{}` failed: {err}", constraint.name);
        }
    }
    for child in &mut base.children {
        visited += tick_element(child.as_mut(), ctx, dt);
    }

    if let Err(err) = element.update(ctx, dt) {
        log::warn!("{} update failed: {err}", element.kind());
    }
    visited
}

/// Run the render walk over `element` and its subtree.
pub fn render_element(element: &dyn Element, ctx: &ElementContext) {
    let rotation = element.base().rotation.get();
    let rotated = rotation != 0.0;
    if rotated {
        let origin = element.base().origin.get();
        let pivot = ctx.viewport().world_to_screen(origin);
        ctx.surface_mut().push_rotation(pivot, rotation);
    }

    for child in element.base().children() {
        render_element(child.as_ref(), ctx);
    }

    if let Err(err) = element.render(ctx) {
        log::warn!("{} render failed: {err}", element.kind());
    }

    if rotated {
        ctx.surface_mut().pop_rotation();
    }
}
