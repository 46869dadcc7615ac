//! Ready-made drawing elements for the InkPlot scene tree.
//!
//! Everything here implements [`inkplot_core::scene::Element`] and wires
//! its geometry through cells, so elements sharing a point follow each
//! other without glue code:
//!
//! - **Lines**: segments with optional midpoint markers, arrowheads and
//!   live measurement labels
//! - **Annotations**: length labels and angle markers with degree readouts
//! - **Primitives**: point markers, rectangles, text runs, chevrons
//! - **Grid**: adaptive decade grid in line or dot mode

pub mod angle;
pub mod chevron;
pub mod grid;
pub mod length;
pub mod line;
pub mod marker;
pub mod rect;
pub mod text;

#[cfg(test)]
mod test_util;

pub use angle::{AngleMarker, AngleStyle};
pub use chevron::{Chevron, ChevronStyle, Sizing};
pub use grid::{axis_steps, AxisSteps, Grid, GridMode};
pub use length::LengthLabel;
pub use line::LineElement;
pub use marker::PointMarker;
pub use rect::RectElement;
pub use text::TextElement;
