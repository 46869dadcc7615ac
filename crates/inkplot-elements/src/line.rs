//! Straight segment between two reactive endpoints.

use kurbo::Point;
use peniko::Color;

use inkplot_core::cells::{Binding, Cell, PointCell};
use inkplot_core::render::Batch;
use inkplot_core::scene::{Element, ElementBase, ElementContext, SceneResult};

use crate::chevron::Chevron;
use crate::length::LengthLabel;
use crate::marker::PointMarker;

/// A line segment. The endpoints are cells, so anything sharing them
/// (labels, chevrons, other elements) follows along when they move.
pub struct LineElement {
    base: ElementBase,
    p1: PointCell,
    p2: PointCell,
    color: Color,
    show_length: Cell<bool>,
    draggable_ends: bool,
}

impl LineElement {
    pub fn new(p1: impl Into<Binding<Point>>, p2: impl Into<Binding<Point>>) -> Self {
        let own_p1 = PointCell::new(Point::ZERO);
        let own_p2 = PointCell::new(Point::ZERO);
        let _ = own_p1.adopt(p1);
        let _ = own_p2.adopt(p2);
        Self {
            base: ElementBase::new(),
            p1: own_p1,
            p2: own_p2,
            color: Color::from_rgba8(0, 0, 0, 255), // black
            show_length: Cell::new(false),
            draggable_ends: false,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Register both endpoints as drag targets when the line attaches.
    pub fn with_draggable_ends(mut self) -> Self {
        self.draggable_ends = true;
        self
    }

    /// Keep a marker pinned to the midpoint via a constraint.
    pub fn with_middle_point(mut self) -> Self {
        let marker = PointMarker::new(self.p1.get().midpoint(self.p2.get()));
        let position = marker.position().clone();
        let p1 = self.p1.clone();
        let p2 = self.p2.clone();
        self.base.add_constraint("middle point", move || {
            let middle = p1.get().midpoint(p2.get());
            if position.get() != middle {
                position.set(middle);
            }
            Ok(())
        });
        self.base.add_child(Box::new(marker));
        self
    }

    /// Show the measurement label from construction on.
    pub fn with_length_label(self) -> Self {
        self.show_length.set(true);
        self
    }

    /// Arrowhead at the first endpoint, pointing outward.
    pub fn show_start_arrow(&mut self) {
        self.base
            .add_child(Box::new(Chevron::new(&self.p1, &self.p2)));
    }

    /// Arrowhead at the second endpoint, pointing outward.
    pub fn show_end_arrow(&mut self) {
        self.base
            .add_child(Box::new(Chevron::new(&self.p2, &self.p1)));
    }

    /// Toggle the measurement label. Takes effect on the next full pass.
    pub fn set_show_length(&self, show: bool) {
        self.show_length.set(show);
    }

    /// Shared handle onto the label toggle.
    pub fn show_length(&self) -> &Cell<bool> {
        &self.show_length
    }

    pub fn p1(&self) -> &PointCell {
        &self.p1
    }

    pub fn p2(&self) -> &PointCell {
        &self.p2
    }
}

impl Element for LineElement {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "line"
    }

    fn on_attach(&mut self, ctx: &ElementContext) -> SceneResult<()> {
        if self.draggable_ends {
            let mut attractors = ctx.attractors();
            attractors.add(&self.p1);
            attractors.add(&self.p2);
        }
        Ok(())
    }

    fn compute(&mut self, _ctx: &ElementContext) -> SceneResult<()> {
        let want = self.show_length.get();
        let have = self
            .base
            .children()
            .iter()
            .any(|child| child.kind() == "length-label");
        if want && !have {
            self.base
                .add_child(Box::new(LengthLabel::new(&self.p1, &self.p2)));
        } else if !want && have {
            self.base.retain_children(|child| child.kind() != "length-label");
        }
        Ok(())
    }

    fn render(&self, ctx: &ElementContext) -> SceneResult<()> {
        let mut batch = Batch::new(self.color);
        batch.line(self.p1.get(), self.p2.get());
        batch.stroke(&mut *ctx.surface_mut());
        Ok(())
    }
}
