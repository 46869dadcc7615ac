//! Arrowhead glyph for line ends.

use std::f64::consts::FRAC_PI_6;

use kurbo::{Point, Vec2};
use peniko::Color;

use inkplot_core::cells::{Binding, PointCell};
use inkplot_core::math;
use inkplot_core::render::Batch;
use inkplot_core::scene::{Element, ElementBase, ElementContext, SceneResult};

/// Whether a size is interpreted in world units or screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    /// Fixed in world units, scales with zoom.
    World,
    /// Fixed in screen pixels, constant on screen at any zoom.
    Px,
}

/// Appearance of a [`Chevron`].
#[derive(Debug, Clone, Copy)]
pub struct ChevronStyle {
    /// Leg length, in `sizing` units.
    pub size: f64,
    pub color: Color,
    pub sizing: Sizing,
}

impl Default for ChevronStyle {
    fn default() -> Self {
        Self {
            size: 0.007,
            color: Color::from_rgba8(255, 0, 0, 255), // red
            sizing: Sizing::World,
        }
    }
}

/// A two-legged arrowhead sitting at `tip`, pointing away from `tail`.
pub struct Chevron {
    base: ElementBase,
    tip: PointCell,
    tail: PointCell,
    style: ChevronStyle,
}

impl Chevron {
    pub fn new(tip: impl Into<Binding<Point>>, tail: impl Into<Binding<Point>>) -> Self {
        let chevron = Self {
            base: ElementBase::new(),
            tip: PointCell::new(Point::ZERO),
            tail: PointCell::new(Point::ZERO),
            style: ChevronStyle::default(),
        };
        let _ = chevron.tip.adopt(tip);
        let _ = chevron.tail.adopt(tail);
        chevron
    }

    pub fn with_style(mut self, style: ChevronStyle) -> Self {
        self.style = style;
        self
    }
}

impl Element for Chevron {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "chevron"
    }

    fn render(&self, ctx: &ElementContext) -> SceneResult<()> {
        let tip = self.tip.get();
        let tail = self.tail.get();
        let angle = math::direction(tail, tip);

        let size = match self.style.sizing {
            Sizing::World => self.style.size,
            Sizing::Px => ctx.measure_screen_in_world(self.style.size),
        };

        let leg1 = math::with_angle(Vec2::new(size, 0.0), angle + FRAC_PI_6);
        let leg2 = math::with_angle(Vec2::new(size, 0.0), angle - FRAC_PI_6);

        let mut batch = Batch::new(self.style.color);
        batch.line(tip, tip - leg1);
        batch.line(tip, tip - leg2);
        batch.stroke(&mut *ctx.surface_mut());
        Ok(())
    }
}
