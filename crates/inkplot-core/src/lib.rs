//! InkPlot Core Library
//!
//! Platform-agnostic engine for interactive 2D plotting surfaces: reactive
//! value cells, a scene tree with a deterministic frame protocol, viewport
//! math and gesture recognition. Hosts plug in a [`render::DrawSurface`]
//! and a [`schedule::FrameScheduler`] and feed pointer input to the
//! [`engine::Engine`].

pub mod attractor;
pub mod cells;
pub mod engine;
pub mod gesture;
pub mod math;
pub mod metrics;
pub mod render;
pub mod scene;
pub mod schedule;
pub mod stream;
pub mod viewport;

pub use attractor::{Attractor, AttractorRegistry, ATTRACTOR_RADIUS_PX};
pub use cells::{combine, combine3, combine_all, combine_points, Binding, Cell, CellId, PointCell};
pub use engine::{EditMode, EditModeOptions, EditSession, ElementId, ElementQueue, Engine, EngineConfig};
pub use gesture::{
    GestureConfig, GestureDispatcher, GestureEvent, MouseButton, PointerInput, WheelAction,
    WheelMode,
};
pub use metrics::{MetricsSink, NullMetrics};
pub use render::{Batch, BatchOp, DrawSurface, PaintMode, RecordingSurface, TextAlign};
pub use scene::{
    attach_element, render_element, tick_element, Element, ElementBase, ElementContext,
    SceneError, SceneResult,
};
pub use schedule::{FrameScheduler, NoopScheduler, Redraw, RedrawQueue};
pub use stream::{Stream, Subscription};
pub use viewport::{Viewport, ViewportConfig, MAX_ZOOM, MIN_ZOOM};
