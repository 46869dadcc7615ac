//! Filled dot at a world position.

use kurbo::Point;
use peniko::Color;

use inkplot_core::cells::{Binding, PointCell};
use inkplot_core::render::Batch;
use inkplot_core::scene::{Element, ElementBase, ElementContext, SceneResult};

/// A constant-size filled marker.
pub struct PointMarker {
    base: ElementBase,
    position: PointCell,
    color: Color,
}

impl PointMarker {
    pub fn new(position: impl Into<Binding<Point>>) -> Self {
        let marker = Self {
            base: ElementBase::new(),
            position: PointCell::new(Point::ZERO),
            color: Color::from_rgba8(255, 165, 0, 255), // orange
        };
        let _ = marker.position.adopt(position);
        marker
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// The marker's position cell, shared with whatever drives it.
    pub fn position(&self) -> &PointCell {
        &self.position
    }
}

impl Element for PointMarker {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "marker"
    }

    fn render(&self, ctx: &ElementContext) -> SceneResult<()> {
        let mut batch = Batch::new(self.color);
        batch.point(self.position.get());
        batch.fill(&mut *ctx.surface_mut());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::harness;
    use inkplot_core::cells::Cell;
    use inkplot_core::render::{BatchOp, PaintMode, RenderCommand};
    use inkplot_core::scene::{attach_element, render_element};

    #[test]
    fn test_renders_a_filled_dot() {
        let (ctx, surface) = harness();
        let mut marker: Box<dyn Element> = Box::new(PointMarker::new(Point::new(0.25, 0.75)));
        attach_element(marker.as_mut(), &ctx);
        render_element(marker.as_ref(), &ctx);

        let surface = surface.borrow();
        let modes: Vec<PaintMode> = surface
            .commands()
            .iter()
            .filter_map(|command| match command {
                RenderCommand::Submit { mode, .. } => Some(*mode),
                _ => None,
            })
            .collect();
        assert_eq!(modes, vec![PaintMode::Fill]);

        let batch = surface.batches().next().expect("one batch");
        match &batch.ops[0] {
            BatchOp::Marker { at, .. } => assert_eq!(*at, Point::new(0.25, 0.75)),
            other => panic!("expected marker, got {other:?}"),
        }
    }

    #[test]
    fn test_tracks_an_adopted_cell() {
        let (ctx, surface) = harness();
        let cell = Cell::new(Point::new(0.0, 0.0));
        let marker = PointMarker::new(&cell);
        let mut boxed: Box<dyn Element> = Box::new(marker);
        attach_element(boxed.as_mut(), &ctx);

        cell.set(Point::new(0.4, 0.6));
        render_element(boxed.as_ref(), &ctx);

        let surface = surface.borrow();
        let batch = surface.batches().next().expect("one batch");
        match &batch.ops[0] {
            BatchOp::Marker { at, .. } => assert_eq!(*at, Point::new(0.4, 0.6)),
            other => panic!("expected marker, got {other:?}"),
        }
    }
}
