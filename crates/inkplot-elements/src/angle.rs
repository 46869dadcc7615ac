//! Angle measurement marker at a shared vertex.

use std::f64::consts::{FRAC_PI_6, PI};

use kurbo::{Point, Vec2};
use peniko::Color;

use inkplot_core::cells::{Binding, Cell, PointCell};
use inkplot_core::math;
use inkplot_core::render::{Batch, TextAlign};
use inkplot_core::scene::{Element, ElementBase, ElementContext, SceneResult};

use crate::chevron::{Chevron, ChevronStyle, Sizing};
use crate::text::TextElement;

/// Appearance of an [`AngleMarker`].
#[derive(Debug, Clone, Copy)]
pub struct AngleStyle {
    pub color: Color,
    /// Arc radius, in `sizing` units.
    pub radius: f64,
    pub sizing: Sizing,
}

impl Default for AngleStyle {
    fn default() -> Self {
        Self {
            color: Color::from_rgba8(238, 130, 238, 255), // violet
            radius: 50.0,
            sizing: Sizing::Px,
        }
    }
}

/// Measures the angle at `vertex` between the rays towards `from` and
/// `towards`: an arc, arrowheads at both arc ends and a degree readout.
///
/// Geometry lands in output cells each compute pass; the composed text
/// and chevron children adopt those cells and follow along.
///
/// Arc angles are screen-side (y grows downward), hence the sign flips
/// against the world-side ray directions.
pub struct AngleMarker {
    base: ElementBase,
    vertex: PointCell,
    from: PointCell,
    towards: PointCell,
    style: AngleStyle,

    angle: Cell<f64>,
    anticlockwise: Cell<bool>,
    start_angle: Cell<f64>,
    end_angle: Cell<f64>,
    start_point: PointCell,
    start_perpendicular: PointCell,
    end_point: PointCell,
    end_perpendicular: PointCell,
    text_anchor: PointCell,
}

impl AngleMarker {
    pub fn new(
        vertex: impl Into<Binding<Point>>,
        from: impl Into<Binding<Point>>,
        towards: impl Into<Binding<Point>>,
    ) -> Self {
        let marker = Self {
            base: ElementBase::new(),
            vertex: PointCell::new(Point::ZERO),
            from: PointCell::new(Point::ZERO),
            towards: PointCell::new(Point::ZERO),
            style: AngleStyle::default(),
            angle: Cell::new(0.0),
            anticlockwise: Cell::new(false),
            start_angle: Cell::new(0.0),
            end_angle: Cell::new(0.0),
            start_point: PointCell::new(Point::ZERO),
            start_perpendicular: PointCell::new(Point::ZERO),
            end_point: PointCell::new(Point::ZERO),
            end_perpendicular: PointCell::new(Point::ZERO),
            text_anchor: PointCell::new(Point::ZERO),
        };
        let _ = marker.vertex.adopt(vertex);
        let _ = marker.from.adopt(from);
        let _ = marker.towards.adopt(towards);
        marker
    }

    pub fn with_style(mut self, style: AngleStyle) -> Self {
        self.style = style;
        self
    }

    /// The measured angle in radians, in `[0, pi]`.
    pub fn angle(&self) -> &Cell<f64> {
        &self.angle
    }

    /// Whether the arc sweeps anticlockwise in screen terms.
    pub fn anticlockwise(&self) -> &Cell<bool> {
        &self.anticlockwise
    }

    pub fn start_point(&self) -> &PointCell {
        &self.start_point
    }

    pub fn end_point(&self) -> &PointCell {
        &self.end_point
    }

    fn arc_radius(&self, ctx: &ElementContext) -> f64 {
        match self.style.sizing {
            Sizing::World => self.style.radius,
            Sizing::Px => ctx.measure_screen_in_world(self.style.radius),
        }
    }
}

impl Element for AngleMarker {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "angle"
    }

    fn compose(&mut self, _ctx: &ElementContext) -> SceneResult<Vec<Box<dyn Element>>> {
        let readout = TextElement::new(
            self.angle.derive(|angle| math::format_degrees(*angle)),
            &self.text_anchor,
        )
        .with_align(TextAlign::Center);

        let arrow_style = ChevronStyle {
            size: 10.0,
            sizing: Sizing::Px,
            ..ChevronStyle::default()
        };
        Ok(vec![
            Box::new(readout),
            Box::new(
                Chevron::new(&self.start_point, &self.start_perpendicular).with_style(arrow_style),
            ),
            Box::new(
                Chevron::new(&self.end_point, &self.end_perpendicular).with_style(arrow_style),
            ),
        ])
    }

    fn compute(&mut self, ctx: &ElementContext) -> SceneResult<()> {
        let vertex = self.vertex.get();
        let from = self.from.get();
        let towards = self.towards.get();

        let ba = vertex - from;
        let bc = vertex - towards;

        let angle = math::angle_between_points(from, vertex, towards);
        let anticlockwise = ba.cross(bc) > 0.0;

        let start_angle = -ba.atan2() + PI;
        let end_angle = start_angle + angle * if anticlockwise { -1.0 } else { 1.0 };

        // A sweep narrower than 30 degrees leaves no room inside the arc;
        // the readout and the arrowheads swing to the outside.
        let would_jump_out = (start_angle - end_angle).abs() < FRAC_PI_6;
        let middle_angle = if would_jump_out { -FRAC_PI_6 } else { 0.0 }
            + (start_angle + end_angle) / 2.0;

        let radius = self.arc_radius(ctx);
        let start_point = vertex + math::with_angle(Vec2::new(radius, 0.0), -start_angle);
        let end_point = vertex + math::with_angle(Vec2::new(radius, 0.0), -end_angle);
        let text_anchor = vertex + math::with_angle(Vec2::new(radius * 2.0, 0.0), -middle_angle);

        let perpendicular_distance = ctx.measure_screen_in_world(20.0);
        let flip = |yes: bool| if yes { -1.0 } else { 1.0 };
        let start_perpendicular = start_point
            + Vec2::new(-ba.y, ba.x)
                * perpendicular_distance
                * flip(anticlockwise)
                * flip(would_jump_out);
        let end_perpendicular = end_point
            + Vec2::new(-bc.y, bc.x)
                * perpendicular_distance
                * flip(!anticlockwise)
                * flip(would_jump_out);

        self.angle.set(angle);
        self.anticlockwise.set(anticlockwise);
        self.start_angle.set(start_angle);
        self.end_angle.set(end_angle);
        self.start_point.set(start_point);
        self.end_point.set(end_point);
        self.start_perpendicular.set(start_perpendicular);
        self.end_perpendicular.set(end_perpendicular);
        self.text_anchor.set(text_anchor);
        Ok(())
    }

    fn render(&self, ctx: &ElementContext) -> SceneResult<()> {
        let start_angle = self.start_angle.get();
        let end_angle = self.end_angle.get();
        let anticlockwise = self.anticlockwise.get();
        let start_offset = if (start_angle - end_angle).abs() < FRAC_PI_6 {
            FRAC_PI_6
        } else {
            0.0
        };

        let mut batch = Batch::new(self.style.color);
        batch.arc(
            self.vertex.get(),
            self.arc_radius(ctx),
            start_angle - start_offset * if anticlockwise { 0.0 } else { 1.0 },
            end_angle - start_offset * if anticlockwise { 1.0 } else { 0.0 },
            anticlockwise,
        );
        batch.stroke(&mut *ctx.surface_mut());
        Ok(())
    }
}
