//! Dimension annotation that tracks two endpoints.

use std::f64::consts::{FRAC_PI_2, PI};

use kurbo::{Point, Vec2};
use peniko::Color;

use inkplot_core::cells::{combine, Binding, Cell, PointCell};
use inkplot_core::math;
use inkplot_core::render::TextAlign;
use inkplot_core::scene::{Element, ElementBase};

use crate::line::LineElement;
use crate::text::TextElement;

/// World-space gap between the measured segment and the dimension line;
/// half of it also pads the text gap.
const DIMENSION_OFFSET: f64 = 0.01;

fn label_color() -> Color {
    Color::from_rgba8(102, 102, 102, 255) // dim gray
}

/// A measurement readout between two points: an offset dimension line,
/// parted around a rotated length text, with arrowheads at both ends.
///
/// Everything is wired through cells at construction; the label keeps
/// itself current as the endpoints move, with no per-frame recompute of
/// its own.
pub struct LengthLabel {
    base: ElementBase,
    p1: PointCell,
    p2: PointCell,
    angle: Cell<f64>,
    length: Cell<f64>,
    middle: PointCell,
}

impl LengthLabel {
    pub fn new(p1: impl Into<Binding<Point>>, p2: impl Into<Binding<Point>>) -> Self {
        let own_p1 = PointCell::new(Point::ZERO);
        let own_p2 = PointCell::new(Point::ZERO);
        let _ = own_p1.adopt(p1);
        let _ = own_p2.adopt(p2);

        // Perpendicular shift that always lands on the upper side of the
        // segment, whichever way the endpoints are ordered.
        let offset: Cell<Vec2> = combine(own_p1.cell(), own_p2.cell(), |p1, p2| {
            let mut angle = math::direction(*p2, *p1) - FRAC_PI_2;
            if angle > -PI && angle < 0.0 {
                angle += PI;
            }
            math::with_angle(Vec2::new(0.0, DIMENSION_OFFSET), angle)
        });

        let angle = own_p1.angle_to(&own_p2);
        let length = own_p1.distance_to(&own_p2);
        let middle = own_p1.plus(&own_p2).scaled(0.5);

        let s1 = PointCell::from_cell(combine(own_p1.cell(), &offset, |p, off| *p + *off));
        let s2 = PointCell::from_cell(combine(own_p2.cell(), &offset, |p, off| *p + *off));
        let text_anchor =
            PointCell::from_cell(combine(middle.cell(), &offset, |m, off| *m + *off));

        // Keep the text readable: fold the angle into [-pi/2, pi/2].
        let upright = angle.derive(|angle| {
            if *angle > FRAC_PI_2 {
                *angle - PI
            } else if *angle < -FRAC_PI_2 {
                *angle + PI
            } else {
                *angle
            }
        });

        let text = TextElement::new(length.derive(|value| format!("{value:.2}")), &text_anchor)
            .with_color(label_color())
            .with_align(TextAlign::Center)
            .with_rotation(&upright);
        let text_size = text.size().clone();

        // Half the text width plus some air, aligned with the segment;
        // the dimension line parts around it.
        let text_gap: Cell<Vec2> = combine(&angle, &text_size, |angle, size| {
            math::with_angle(
                Vec2::new(size.width / 2.0 + DIMENSION_OFFSET / 2.0, 0.0),
                *angle,
            )
        });

        let left_end =
            PointCell::from_cell(combine(text_anchor.cell(), &text_gap, |anchor, gap| {
                *anchor - *gap
            }));
        let right_start =
            PointCell::from_cell(combine(text_anchor.cell(), &text_gap, |anchor, gap| {
                *anchor + *gap
            }));

        let mut left_line = LineElement::new(&s1, &left_end).with_color(label_color());
        left_line.show_start_arrow();
        let mut right_line = LineElement::new(&right_start, &s2).with_color(label_color());
        right_line.show_end_arrow();

        let mut base = ElementBase::new();
        base.add_child(Box::new(text));
        base.add_child(Box::new(left_line));
        base.add_child(Box::new(right_line));

        Self {
            base,
            p1: own_p1,
            p2: own_p2,
            angle,
            length,
            middle,
        }
    }

    /// Distance between the endpoints, kept current by the cell graph.
    pub fn length(&self) -> &Cell<f64> {
        &self.length
    }

    /// Direction from the first endpoint towards the second, in radians.
    pub fn angle(&self) -> &Cell<f64> {
        &self.angle
    }

    pub fn middle(&self) -> &PointCell {
        &self.middle
    }

    pub fn p1(&self) -> &PointCell {
        &self.p1
    }

    pub fn p2(&self) -> &PointCell {
        &self.p2
    }
}

impl Element for LengthLabel {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "length-label"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::harness;
    use inkplot_core::render::{BatchOp, RenderCommand};
    use inkplot_core::scene::{attach_element, render_element, tick_element};
    use std::f64::consts::FRAC_PI_4;

    fn texts(surface: &inkplot_core::render::RecordingSurface) -> Vec<String> {
        surface
            .batches()
            .flat_map(|batch| batch.ops.iter())
            .filter_map(|op| match op {
                BatchOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_length_cell_tracks_the_endpoints() {
        let p2 = PointCell::new(Point::new(1.0, 0.0));
        let label = LengthLabel::new(Point::new(0.0, 0.0), &p2);
        assert!((label.length().get() - 1.0).abs() < 1e-12);

        p2.set(Point::new(1.0, 1.0));
        assert!((label.length().get() - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_renders_the_formatted_length() {
        let (ctx, surface) = harness();
        let p2 = PointCell::new(Point::new(1.0, 0.0));
        let label = LengthLabel::new(Point::new(0.0, 0.0), &p2);
        let mut boxed: Box<dyn Element> = Box::new(label);
        attach_element(boxed.as_mut(), &ctx);
        tick_element(boxed.as_mut(), &ctx, 0.0);
        render_element(boxed.as_ref(), &ctx);
        assert_eq!(texts(&surface.borrow()), vec!["1.00".to_string()]);

        p2.set(Point::new(1.0, 1.0));
        surface.borrow_mut().clear();
        tick_element(boxed.as_mut(), &ctx, 0.0);
        render_element(boxed.as_ref(), &ctx);
        assert_eq!(texts(&surface.borrow()), vec!["1.41".to_string()]);
    }

    #[test]
    fn test_dimension_line_sits_above_the_segment() {
        let (ctx, surface) = harness();
        for (a, b) in [
            (Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
            (Point::new(1.0, 0.0), Point::new(0.0, 0.0)), // reversed
        ] {
            surface.borrow_mut().clear();
            let label = LengthLabel::new(a, b);
            let mut boxed: Box<dyn Element> = Box::new(label);
            attach_element(boxed.as_mut(), &ctx);
            tick_element(boxed.as_mut(), &ctx, 0.0);
            render_element(boxed.as_ref(), &ctx);

            let surface_ref = surface.borrow();
            let side_lines: Vec<(Point, Point)> = surface_ref
                .batches()
                .flat_map(|batch| batch.ops.iter())
                .filter_map(|op| match op {
                    BatchOp::Line { from, to } => Some((*from, *to)),
                    _ => None,
                })
                .filter(|(from, to)| (from.y - to.y).abs() < 1e-12)
                .collect();
            assert!(!side_lines.is_empty());
            for (from, _) in side_lines {
                assert!((from.y - DIMENSION_OFFSET).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_text_rotation_stays_upright() {
        let (ctx, surface) = harness();
        // Direction 3pi/4 folds to -pi/4.
        let label = LengthLabel::new(Point::new(0.0, 0.0), Point::new(-1.0, 1.0));
        let mut boxed: Box<dyn Element> = Box::new(label);
        attach_element(boxed.as_mut(), &ctx);
        tick_element(boxed.as_mut(), &ctx, 0.0);
        render_element(boxed.as_ref(), &ctx);

        let surface = surface.borrow();
        let angle = surface
            .commands()
            .iter()
            .find_map(|command| match command {
                RenderCommand::PushRotation { angle, .. } => Some(*angle),
                _ => None,
            })
            .expect("text rotation pushed");
        assert!((angle - (-FRAC_PI_4)).abs() < 1e-12);
    }
}
