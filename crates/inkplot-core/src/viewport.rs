//! Viewport module for the pan/zoom world-to-screen transform.

use std::rc::Rc;

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::math::WorldRect;
use crate::schedule::{Redraw, RedrawQueue};

/// Smallest allowed zoom level.
pub const MIN_ZOOM: f64 = 0.8;

/// Largest allowed zoom level.
pub const MAX_ZOOM: f64 = 1000.0;

/// Initial viewport state, deserializable from host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Logical canvas width in points.
    pub width: f64,
    /// Logical canvas height in points.
    pub height: f64,
    /// Device pixel ratio of the surface.
    pub scale_factor: f64,
    /// Initial zoom level.
    pub zoom: f64,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            scale_factor: 1.0,
            zoom: 1.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

/// Viewport manages the transform between world and screen coordinates.
///
/// World space is the drafting sheet: the unit square spans the canvas
/// height with Y pointing up. Screen space is physical pixels with Y
/// pointing down. The combined view transform is
/// `translate(center) * scale(zoom) * normalization`, where the
/// normalization matrix maps the unit square onto the canvas and flips Y.
///
/// The view matrix is computed lazily and cached; every mutation marks it
/// stale and requests a full redraw through the shared [`RedrawQueue`].
pub struct Viewport {
    /// Canvas width in physical pixels.
    width: f64,
    /// Canvas height in physical pixels.
    height: f64,
    scale_factor: f64,
    /// Pan offset in physical pixels.
    center: Vec2,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    normalization: Affine,
    view_cache: std::cell::Cell<Option<Affine>>,
    redraw: Rc<RedrawQueue>,
}

impl Viewport {
    /// Create a viewport from logical canvas dimensions.
    pub fn new(
        logical_width: f64,
        logical_height: f64,
        scale_factor: f64,
        redraw: Rc<RedrawQueue>,
    ) -> Self {
        let config = ViewportConfig {
            width: logical_width,
            height: logical_height,
            scale_factor,
            ..ViewportConfig::default()
        };
        Self::with_config(&config, redraw)
    }

    /// Create a viewport from a config snapshot.
    pub fn with_config(config: &ViewportConfig, redraw: Rc<RedrawQueue>) -> Self {
        let width = (config.width * config.scale_factor).max(1.0);
        let height = (config.height * config.scale_factor).max(1.0);
        Self {
            width,
            height,
            scale_factor: config.scale_factor,
            center: Vec2::new(0.2, 0.2),
            zoom: config.zoom.clamp(config.min_zoom, config.max_zoom),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            normalization: Self::normalization_for(height),
            view_cache: std::cell::Cell::new(None),
            redraw,
        }
    }

    /// Unit square to canvas pixels, Y flipped so world Y points up.
    fn normalization_for(height: f64) -> Affine {
        Affine::translate((0.0, height)) * Affine::scale_non_uniform(height, -height)
    }

    /// Current zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current pan offset in physical pixels.
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Device pixel ratio of the surface.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Canvas size in physical pixels.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// The world-to-screen transform for rendering.
    pub fn view(&self) -> Affine {
        if let Some(cached) = self.view_cache.get() {
            return cached;
        }
        let view = Affine::translate(self.center) * Affine::scale(self.zoom) * self.normalization;
        self.view_cache.set(Some(view));
        view
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.view() * world_point
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.view().inverse() * screen_point
    }

    /// Convert a length in physical pixels to world units at the current
    /// zoom, so pixel-sized details render at constant size on screen.
    pub fn measure_screen_in_world(&self, pixels: f64) -> f64 {
        pixels / (self.zoom * self.height)
    }

    /// World-space rectangle currently covered by the canvas.
    pub fn visible_world_rect(&self) -> WorldRect {
        let a = self.screen_to_world(Point::ZERO);
        let b = self.screen_to_world(Point::new(self.width, self.height));
        WorldRect::new(a, b)
    }

    /// Pan by a delta in physical pixels. Pan is unbounded.
    pub fn pan(&mut self, delta: Vec2) {
        self.center += delta;
        self.invalidate();
    }

    /// Multiply the zoom by `factor`, keeping `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        self.apply_zoom(screen_point, self.zoom * factor);
    }

    /// Set the zoom to an absolute level, keeping `screen_point` fixed.
    pub fn set_zoom_at(&mut self, screen_point: Point, zoom: f64) {
        self.apply_zoom(screen_point, zoom);
    }

    fn apply_zoom(&mut self, screen_point: Point, zoom: f64) {
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        // Convert screen point to world before zoom
        let world_point = self.screen_to_world(screen_point);

        // Apply new zoom
        self.zoom = new_zoom;
        self.view_cache.set(None);

        // Adjust center so world_point stays at screen_point
        let new_screen = self.world_to_screen(world_point);
        let correction = Vec2::new(
            screen_point.x - new_screen.x,
            screen_point.y - new_screen.y,
        );
        self.center += correction;
        self.invalidate();
    }

    /// Adopt a new canvas size, preserving pan and zoom.
    pub fn on_resize(&mut self, logical_width: f64, logical_height: f64, scale_factor: f64) {
        self.width = (logical_width * scale_factor).max(1.0);
        self.height = (logical_height * scale_factor).max(1.0);
        self.scale_factor = scale_factor;
        self.normalization = Self::normalization_for(self.height);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.view_cache.set(None);
        self.redraw.request(Redraw::Full);
    }
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale_factor", &self.scale_factor)
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .finish()
    }
}
