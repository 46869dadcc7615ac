//! Reactive 2D points.

use kurbo::Point;

use crate::cells::{combine, combine_all, Binding, Cell, CellId};
use crate::math;
use crate::stream::Subscription;

/// A [`Cell`] of a world-space point with geometric derivations.
///
/// `PointCell` is a thin wrapper sharing state with an ordinary
/// `Cell<Point>`: wrapping an existing cell via [`PointCell::from_cell`] does
/// not copy or mirror, both handles see the same value and subscribers.
#[derive(Clone)]
pub struct PointCell {
    cell: Cell<Point>,
}

impl PointCell {
    /// Create an independent point cell.
    pub fn new(value: Point) -> Self {
        Self {
            cell: Cell::new(value),
        }
    }

    /// Wrap an existing cell, sharing its state.
    pub fn from_cell(cell: Cell<Point>) -> Self {
        Self { cell }
    }

    /// The underlying cell.
    pub fn cell(&self) -> &Cell<Point> {
        &self.cell
    }

    /// Identity of the underlying cell.
    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    /// Current point.
    pub fn get(&self) -> Point {
        self.cell.get()
    }

    /// Store a new point and notify subscribers.
    pub fn set(&self, value: Point) {
        self.cell.set(value);
    }

    /// Register `callback` for every future point.
    pub fn subscribe(&self, callback: impl FnMut(&Point) + 'static) -> Subscription {
        self.cell.subscribe(callback)
    }

    /// Whether the point is computed from other cells.
    pub fn is_dependent(&self) -> bool {
        self.cell.is_dependent()
    }

    /// Mirror `source` into this point. See [`Cell::adopt`].
    pub fn adopt(&self, source: impl Into<Binding<Point>>) -> Option<Subscription> {
        self.cell.adopt(source)
    }

    /// Dependent point cell computed as `f(self)`.
    pub fn derive_point(&self, f: impl FnMut(&Point) -> Point + 'static) -> PointCell {
        PointCell::from_cell(self.cell.derive(f))
    }

    /// Dependent point tracking the componentwise sum of the two points.
    pub fn plus(&self, other: &PointCell) -> PointCell {
        PointCell::from_cell(combine(&self.cell, &other.cell, |a, b| {
            Point::new(a.x + b.x, a.y + b.y)
        }))
    }

    /// Dependent point tracking this point scaled from the origin.
    pub fn scaled(&self, factor: f64) -> PointCell {
        self.derive_point(move |p| Point::new(p.x * factor, p.y * factor))
    }

    /// Dependent cell tracking the angle (radians) of the direction from
    /// this point towards `other`.
    pub fn angle_to(&self, other: &PointCell) -> Cell<f64> {
        combine(&self.cell, &other.cell, |a, b| math::direction(*a, *b))
    }

    /// Dependent cell tracking the distance between the two points.
    pub fn distance_to(&self, other: &PointCell) -> Cell<f64> {
        combine(&self.cell, &other.cell, |a, b| (*b - *a).length())
    }
}

impl std::fmt::Debug for PointCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PointCell").field(&self.cell).finish()
    }
}

/// Join several point cells into one dependent `Cell<Vec<Point>>`.
pub fn combine_points(points: &[PointCell]) -> Cell<Vec<Point>> {
    let cells: Vec<Cell<Point>> = points.iter().map(|p| p.cell.clone()).collect();
    combine_all(&cells)
}

impl From<PointCell> for Binding<Point> {
    fn from(point: PointCell) -> Self {
        Binding::Reactive(point.cell)
    }
}

impl From<&PointCell> for Binding<Point> {
    fn from(point: &PointCell) -> Self {
        Binding::Reactive(point.cell.clone())
    }
}
