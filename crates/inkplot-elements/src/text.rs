//! Text label anchored at a world position.

use kurbo::{Point, Size, Vec2};
use peniko::Color;

use inkplot_core::cells::{Binding, Cell, PointCell};
use inkplot_core::math::WorldRect;
use inkplot_core::render::{Batch, TextAlign, DEFAULT_FONT_PX};
use inkplot_core::scene::{Element, ElementBase, ElementContext, SceneResult};

use crate::rect::RectElement;

/// A text run whose content and anchor can both be reactive.
///
/// The measured footprint is republished through [`TextElement::size`] in
/// world units, so sibling geometry (dimension lines, boxes) can track it.
pub struct TextElement {
    base: ElementBase,
    text: Cell<String>,
    anchor: PointCell,
    color: Color,
    align: TextAlign,
    font_px: f64,
    size: Cell<Size>,
    boundary: Option<Cell<WorldRect>>,
}

impl TextElement {
    pub fn new(text: impl Into<Binding<String>>, anchor: impl Into<Binding<Point>>) -> Self {
        let mut element = Self {
            base: ElementBase::new(),
            text: Cell::new(String::new()),
            anchor: PointCell::new(Point::ZERO),
            color: Color::from_rgba8(0, 0, 0, 255), // black
            align: TextAlign::Left,
            font_px: DEFAULT_FONT_PX,
            size: Cell::new(Size::ZERO),
            boundary: None,
        };
        let _ = element.text.adopt(text);
        let _ = element.anchor.adopt(anchor);
        // Rotation pivots on the anchor.
        element.base.origin = Binding::from(&element.anchor);
        element
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    /// Bind the render-time rotation, in radians around the anchor.
    pub fn with_rotation(mut self, rotation: impl Into<Binding<f64>>) -> Self {
        self.base.rotation = rotation.into();
        self
    }

    /// Show a rectangle around the measured footprint.
    pub fn with_boundary(mut self) -> Self {
        let rect = Cell::new(WorldRect::new(Point::ZERO, Point::ZERO));
        self.base
            .add_child(Box::new(RectElement::from_cell(rect.clone())));
        self.boundary = Some(rect);
        self
    }

    /// Measured footprint in world units, updated once per full frame.
    pub fn size(&self) -> &Cell<Size> {
        &self.size
    }

    pub fn anchor(&self) -> &PointCell {
        &self.anchor
    }
}

impl Element for TextElement {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "text"
    }

    fn compute(&mut self, ctx: &ElementContext) -> SceneResult<()> {
        let measured = ctx.measure_text(&self.text.get(), self.font_px);
        let viewport_size = ctx.viewport().size();
        let world = Size::new(
            measured.width / viewport_size.width,
            measured.height / viewport_size.height,
        );
        if world != self.size.get() {
            self.size.set(world);
        }

        if let Some(boundary) = &self.boundary {
            let anchor = self.anchor.get();
            let half = Vec2::new(world.width / 2.0, world.height / 2.0);
            let rect = match self.align {
                TextAlign::Center => WorldRect::new(anchor - half, anchor + half),
                TextAlign::Left => WorldRect::new(
                    anchor - Vec2::new(0.0, half.y),
                    anchor + Vec2::new(world.width, half.y),
                ),
                TextAlign::Right => WorldRect::new(
                    anchor - Vec2::new(world.width, half.y),
                    anchor + Vec2::new(0.0, half.y),
                ),
            };
            if rect != boundary.get() {
                boundary.set(rect);
            }
        }
        Ok(())
    }

    fn render(&self, ctx: &ElementContext) -> SceneResult<()> {
        let mut batch = Batch::new(self.color);
        batch.text(self.anchor.get(), self.text.get(), self.font_px, self.align);
        batch.fill(&mut *ctx.surface_mut());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::harness;
    use inkplot_core::render::BatchOp;
    use inkplot_core::scene::{attach_element, render_element, tick_element};
    use std::cell::Cell as StdCell;
    use std::rc::Rc;

    #[test]
    fn test_publishes_measured_size_in_world_units() {
        let (ctx, _) = harness();
        let element = TextElement::new("abc", Point::new(0.5, 0.5));
        let size = element.size().clone();
        let mut boxed: Box<dyn Element> = Box::new(element);
        attach_element(boxed.as_mut(), &ctx);
        tick_element(boxed.as_mut(), &ctx, 0.0);

        // The recording surface estimates 0.6 * font_px per character.
        let measured = ctx.measure_text("abc", DEFAULT_FONT_PX);
        let expected = Size::new(measured.width / 800.0, measured.height / 600.0);
        assert_eq!(size.get(), expected);
    }

    #[test]
    fn test_size_cell_fires_only_on_change() {
        let (ctx, _) = harness();
        let element = TextElement::new("steady", Point::new(0.5, 0.5));
        let size = element.size().clone();
        let fired = Rc::new(StdCell::new(0));
        let counter = Rc::clone(&fired);
        let _sub = size.subscribe(move |_| counter.set(counter.get() + 1));

        let mut boxed: Box<dyn Element> = Box::new(element);
        attach_element(boxed.as_mut(), &ctx);
        tick_element(boxed.as_mut(), &ctx, 0.0);
        tick_element(boxed.as_mut(), &ctx, 0.0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_renders_with_alignment_and_rotation() {
        let (ctx, surface) = harness();
        let rotation = Cell::new(0.3);
        let element = TextElement::new("1.41", Point::new(0.2, 0.2))
            .with_align(TextAlign::Center)
            .with_rotation(&rotation);
        let mut boxed: Box<dyn Element> = Box::new(element);
        attach_element(boxed.as_mut(), &ctx);
        render_element(boxed.as_ref(), &ctx);

        let surface = surface.borrow();
        let batch = surface.batches().next().expect("one batch");
        match &batch.ops[0] {
            BatchOp::Text { text, align, .. } => {
                assert_eq!(text, "1.41");
                assert_eq!(*align, TextAlign::Center);
            }
            other => panic!("expected text, got {other:?}"),
        }

        use inkplot_core::render::RenderCommand;
        assert!(surface
            .commands()
            .iter()
            .any(|c| matches!(c, RenderCommand::PushRotation { angle, .. } if (*angle - 0.3).abs() < 1e-12)));
    }

    #[test]
    fn test_boundary_tracks_the_footprint() {
        let (ctx, surface) = harness();
        let element = TextElement::new("ab", Point::new(0.5, 0.5))
            .with_align(TextAlign::Center)
            .with_boundary();
        let mut boxed: Box<dyn Element> = Box::new(element);
        attach_element(boxed.as_mut(), &ctx);
        assert_eq!(boxed.base().children().len(), 1);
        assert_eq!(boxed.base().children()[0].kind(), "rect");

        tick_element(boxed.as_mut(), &ctx, 0.0);
        render_element(boxed.as_ref(), &ctx);

        let measured = ctx.measure_text("ab", DEFAULT_FONT_PX);
        let half = Vec2::new(measured.width / 800.0 / 2.0, measured.height / 600.0 / 2.0);
        let surface = surface.borrow();
        let rect = surface
            .batches()
            .find_map(|batch| match batch.ops.first() {
                Some(BatchOp::Rect(r)) => Some(*r),
                _ => None,
            })
            .expect("boundary rect drawn");
        assert!((rect.min.x - (0.5 - half.x)).abs() < 1e-12);
        assert!((rect.min.y - (0.5 - half.y)).abs() < 1e-12);
        assert!((rect.max.x - (0.5 + half.x)).abs() < 1e-12);
        assert!((rect.max.y - (0.5 + half.y)).abs() < 1e-12);
    }
}
