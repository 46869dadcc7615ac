//! Snap-point registry for hover tests and dragging.
//!
//! Attractors live outside the scene tree in a flat engine-held list. An
//! element registers the point cells it wants draggable; the engine tests
//! them against the pointer each move and drives the matched cell during a
//! drag.

use std::collections::HashSet;

use kurbo::Point;

use crate::cells::{CellId, PointCell};

/// Pick-up radius around an attractor, in physical pixels.
pub const ATTRACTOR_RADIUS_PX: f64 = 10.0;

/// A registered snap point.
#[derive(Debug)]
pub struct Attractor {
    position: PointCell,
    hovered: bool,
}

impl Attractor {
    /// The point cell this attractor tracks.
    pub fn position(&self) -> &PointCell {
        &self.position
    }

    /// Whether the pointer was within radius at the last hover check.
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }
}

/// Flat list of attractors with identity-based dedup.
#[derive(Debug, Default)]
pub struct AttractorRegistry {
    attractors: Vec<Attractor>,
    registered: HashSet<CellId>,
}

impl AttractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attractor for `position`.
    ///
    /// Idempotent per cell: registering the same cell again is a no-op.
    /// Returns whether a new attractor was created.
    pub fn add(&mut self, position: &PointCell) -> bool {
        if !self.registered.insert(position.id()) {
            return false;
        }
        self.attractors.push(Attractor {
            position: position.clone(),
            hovered: false,
        });
        true
    }

    /// Number of registered attractors.
    pub fn len(&self) -> usize {
        self.attractors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.attractors.is_empty()
    }

    /// Registered attractors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Attractor> {
        self.attractors.iter()
    }

    /// Refresh every hover flag against the pointer position.
    ///
    /// `radius` is in world units. Returns whether any flag changed, which
    /// is the caller's cue to repaint.
    pub fn check_hover(&mut self, world: Point, radius: f64) -> bool {
        let mut changed = false;
        for attractor in &mut self.attractors {
            let hovered = (attractor.position.get() - world).length() < radius;
            if hovered != attractor.hovered {
                attractor.hovered = hovered;
                changed = true;
            }
        }
        changed
    }

    /// First attractor within `radius` of `world`, in registration order.
    pub fn find(&self, world: Point, radius: f64) -> Option<PointCell> {
        self.attractors
            .iter()
            .find(|attractor| (attractor.position.get() - world).length() < radius)
            .map(|attractor| attractor.position.clone())
    }
}
