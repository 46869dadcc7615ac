//! Axis-aligned rectangle outline.

use kurbo::Point;
use peniko::Color;

use inkplot_core::cells::Cell;
use inkplot_core::math::WorldRect;
use inkplot_core::render::Batch;
use inkplot_core::scene::{Element, ElementBase, ElementContext, SceneResult};

pub struct RectElement {
    base: ElementBase,
    rect: Cell<WorldRect>,
    color: Color,
}

impl RectElement {
    pub fn new(a: Point, b: Point) -> Self {
        Self::from_cell(Cell::new(WorldRect::new(a, b)))
    }

    /// Wrap an existing rect cell, sharing its state.
    pub fn from_cell(rect: Cell<WorldRect>) -> Self {
        Self {
            base: ElementBase::new(),
            rect,
            color: Color::from_rgba8(255, 165, 0, 255), // orange
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn rect(&self) -> &Cell<WorldRect> {
        &self.rect
    }
}

impl Element for RectElement {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "rect"
    }

    fn render(&self, ctx: &ElementContext) -> SceneResult<()> {
        let mut batch = Batch::new(self.color);
        batch.rect(self.rect.get());
        batch.stroke(&mut *ctx.surface_mut());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::harness;
    use inkplot_core::render::BatchOp;
    use inkplot_core::scene::{attach_element, render_element};

    #[test]
    fn test_outlines_the_current_rect() {
        let (ctx, surface) = harness();
        let element = RectElement::new(Point::new(0.6, 0.2), Point::new(0.1, 0.9));
        let rect = element.rect().clone();
        let mut boxed: Box<dyn Element> = Box::new(element);
        attach_element(boxed.as_mut(), &ctx);

        rect.set(WorldRect::new(Point::new(0.0, 0.0), Point::new(0.5, 0.5)));
        render_element(boxed.as_ref(), &ctx);

        let surface = surface.borrow();
        let batch = surface.batches().next().expect("one batch");
        match &batch.ops[0] {
            BatchOp::Rect(r) => {
                assert_eq!(r.min, Point::new(0.0, 0.0));
                assert_eq!(r.max, Point::new(0.5, 0.5));
            }
            other => panic!("expected rect, got {other:?}"),
        }
    }
}
