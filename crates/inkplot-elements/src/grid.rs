//! Adaptive background grid.
//!
//! Grid pitch follows the visible range on a log10 scale, so zooming in
//! keeps revealing finer decades. Minor lines fade in as the next decade
//! approaches, which makes the handover between levels continuous instead
//! of a pop.

use kurbo::Point;
use peniko::Color;

use inkplot_core::math::WorldRect;
use inkplot_core::render::Batch;
use inkplot_core::scene::{Element, ElementBase, ElementContext, SceneResult};

fn grid_primary() -> Color {
    Color::from_rgba8(201, 201, 202, 255) // #c9c9ca
}

fn grid_secondary(opacity: f64) -> Color {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::from_rgba8(201, 201, 202, alpha)
}

/// Grid positions along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSteps {
    /// Decade lines.
    pub major: Vec<f64>,
    /// Tenth-of-a-decade lines, majors excluded.
    pub minor: Vec<f64>,
    /// Fade level for the minor lines, 0 right after they appear, 1 when
    /// the next split is due.
    pub minor_opacity: f64,
}

impl AxisSteps {
    fn empty() -> Self {
        Self {
            major: Vec::new(),
            minor: Vec::new(),
            minor_opacity: 0.0,
        }
    }
}

/// Snap an accumulated step value back onto the decimal lattice.
fn snap(value: f64) -> f64 {
    (value * 1e10).round() / 1e10
}

/// Compute the grid positions covering `[from, to]`.
///
/// `density` shifts the whole ladder: 0 picks the decade fitting the range,
/// each further level is ten times finer.
pub fn axis_steps(from: f64, to: f64, density: u32) -> AxisSteps {
    let range = to - from;
    if !range.is_finite() || range <= 0.0 {
        return AxisSteps::empty();
    }

    let magnitude = range.log10();
    let major_magnitude = magnitude.floor() as i32 - density as i32;
    let major_step = 10f64.powi(major_magnitude);
    let minor_step = major_step / 10.0;

    let minor_opacity = (1.0 - (magnitude - magnitude.floor())).clamp(0.0, 1.0);

    let mut major = Vec::new();
    let mut value = (from / major_step).ceil() * major_step;
    while value <= to {
        major.push(snap(value));
        value += major_step;
    }

    let mut minor = Vec::new();
    let mut value = (from / minor_step).ceil() * minor_step;
    while value <= to {
        // A minor landing on a major is the major's own line.
        if (value % major_step).abs() >= minor_step / 100.0 {
            minor.push(snap(value));
        }
        value += minor_step;
    }

    AxisSteps {
        major,
        minor,
        minor_opacity,
    }
}

/// How the grid is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridMode {
    /// Full-width and full-height rules.
    #[default]
    Lines,
    /// Dots at the rule intersections.
    Dots,
}

/// Background grid element covering the visible area.
pub struct Grid {
    base: ElementBase,
    density: u32,
    mode: GridMode,
}

impl Grid {
    pub fn new(density: u32) -> Self {
        Self {
            base: ElementBase::new(),
            density,
            mode: GridMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: GridMode) -> Self {
        self.mode = mode;
        self
    }

    fn render_lines(
        &self,
        ctx: &ElementContext,
        area: WorldRect,
        steps_x: &AxisSteps,
        steps_y: &AxisSteps,
        opacity: f64,
    ) {
        let mut batch = Batch::new(grid_secondary(opacity));

        for &x in &steps_x.minor {
            batch.line(Point::new(x, area.min.y), Point::new(x, area.max.y));
        }
        for &y in &steps_y.minor {
            batch.line(Point::new(area.min.x, y), Point::new(area.max.x, y));
        }
        batch.stroke(&mut *ctx.surface_mut());

        batch.renew(grid_primary());
        for &x in &steps_x.major {
            batch.line(Point::new(x, area.min.y), Point::new(x, area.max.y));
        }
        for &y in &steps_y.major {
            batch.line(Point::new(area.min.x, y), Point::new(area.max.x, y));
        }
        batch.stroke(&mut *ctx.surface_mut());
    }

    fn render_dots(
        &self,
        ctx: &ElementContext,
        steps_x: &AxisSteps,
        steps_y: &AxisSteps,
        opacity: f64,
    ) {
        let mut batch = Batch::new(grid_secondary(opacity));
        for &x in &steps_x.minor {
            for &y in &steps_y.minor {
                batch.point_sized(Point::new(x, y), 1.0);
            }
            for &y in &steps_y.major {
                batch.point_sized(Point::new(x, y), 1.0);
            }
        }
        for &x in &steps_x.major {
            for &y in &steps_y.minor {
                batch.point_sized(Point::new(x, y), 1.0);
            }
        }
        batch.fill(&mut *ctx.surface_mut());

        batch.renew(grid_primary());
        for &x in &steps_x.major {
            for &y in &steps_y.major {
                batch.point_sized(Point::new(x, y), 2.0);
            }
        }
        batch.fill(&mut *ctx.surface_mut());
    }
}

impl Element for Grid {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "grid"
    }

    fn render(&self, ctx: &ElementContext) -> SceneResult<()> {
        let area = ctx.viewport().visible_world_rect();
        let steps_x = axis_steps(area.min.x, area.max.x, self.density);
        let steps_y = axis_steps(area.min.y, area.max.y, self.density);
        // The vertical extent drives the fade for both directions.
        let opacity = steps_y.minor_opacity;
        log::trace!(
            "grid: {}x{} major, {}x{} minor, fade {opacity:.2}",
            steps_x.major.len(),
            steps_y.major.len(),
            steps_x.minor.len(),
            steps_y.minor.len(),
        );

        match self.mode {
            GridMode::Lines => self.render_lines(ctx, area, &steps_x, &steps_y, opacity),
            GridMode::Dots => self.render_dots(ctx, &steps_x, &steps_y, opacity),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::harness;
    use inkplot_core::render::{BatchOp, PaintMode, RenderCommand};
    use inkplot_core::scene::{attach_element, render_element};

    #[test]
    fn test_unit_range_steps_by_tenths() {
        let steps = axis_steps(0.0, 1.0, 0);
        assert_eq!(steps.major, vec![0.0, 1.0]);
        assert_eq!(
            steps.minor,
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]
        );
        assert!((steps.minor_opacity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_density_shifts_the_ladder_a_decade_down() {
        let steps = axis_steps(0.0, 1.0, 1);
        assert_eq!(steps.major.len(), 11);
        assert_eq!(steps.major[0], 0.0);
        assert_eq!(steps.major[10], 1.0);
        assert!(steps.minor.contains(&0.05));
        assert!(steps.minor.contains(&0.95));
        assert!(!steps.minor.contains(&0.0));
        assert!(steps.minor.len() >= 90);
    }

    #[test]
    fn test_minor_opacity_fades_between_decades() {
        // log10(0.5) is about -0.301, so the range sits 70% of the way
        // through its decade and the minors are mostly faded out.
        let steps = axis_steps(0.0, 0.5, 0);
        assert!((steps.minor_opacity - 0.30103).abs() < 1e-5);
    }

    #[test]
    fn test_offset_range_keeps_the_lattice_alignment() {
        let steps = axis_steps(0.25, 2.25, 0);
        // Lines sit on absolute multiples of the step, not on `from`.
        assert_eq!(steps.major, vec![1.0, 2.0]);
        assert_eq!(steps.minor.first().copied(), Some(0.3));
        assert!(!steps.minor.contains(&0.25));
    }

    #[test]
    fn test_empty_and_degenerate_ranges() {
        assert_eq!(axis_steps(0.0, 0.0, 0), AxisSteps::empty());
        assert_eq!(axis_steps(1.0, 0.0, 0), AxisSteps::empty());
        assert_eq!(axis_steps(f64::NAN, 1.0, 0), AxisSteps::empty());
    }

    #[test]
    fn test_lines_mode_draws_minors_then_majors() {
        let (ctx, surface) = harness();
        let grid = Grid::new(0);
        let mut boxed: Box<dyn Element> = Box::new(grid);
        attach_element(boxed.as_mut(), &ctx);
        render_element(boxed.as_ref(), &ctx);

        let surface = surface.borrow();
        let submitted: Vec<_> = surface.batches().collect();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[1].color.components, grid_primary().components);
        assert!(submitted[0]
            .ops
            .iter()
            .all(|op| matches!(op, BatchOp::Line { .. })));
        assert!(submitted[0].ops.len() > submitted[1].ops.len());
    }

    #[test]
    fn test_dots_mode_fills_markers() {
        let (ctx, surface) = harness();
        let grid = Grid::new(0).with_mode(GridMode::Dots);
        let mut boxed: Box<dyn Element> = Box::new(grid);
        attach_element(boxed.as_mut(), &ctx);
        render_element(boxed.as_ref(), &ctx);

        let surface = surface.borrow();
        let modes: Vec<_> = surface
            .commands()
            .iter()
            .filter_map(|command| match command {
                RenderCommand::Submit { mode, batch } => Some((*mode, batch.ops.len())),
                _ => None,
            })
            .collect();
        assert!(modes.iter().all(|(mode, _)| *mode == PaintMode::Fill));

        let markers: usize = surface
            .batches()
            .flat_map(|batch| batch.ops.iter())
            .filter(|op| matches!(op, BatchOp::Marker { .. }))
            .count();
        let total: usize = surface.batches().map(|batch| batch.ops.len()).sum();
        assert_eq!(markers, total);
        assert!(markers > 0);
    }
}
