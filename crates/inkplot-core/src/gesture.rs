//! Pointer gesture classification.
//!
//! Raw pointer input arrives as [`PointerInput`] in logical coordinates and
//! comes out the other side as disambiguated [`GestureEvent`]s: moves,
//! clicks, drags and wheel actions. Drag intent uses hysteresis: a press
//! arms the machine, and only movement beyond the threshold turns into a
//! drag. A release while still armed is a click; after a drag it never is.
//!
//! The dispatcher is pure with respect to the viewport: it reads zoom and
//! scale factor to classify, and leaves every mutation to the caller.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

use crate::math;
use crate::stream::Stream;
use crate::viewport::Viewport;

/// Zoom change per wheel unit during a trackpad pinch.
pub const PINCH_ZOOM_RATE: f64 = 0.08;

/// Exponent shaping pinch speed against the current zoom, so zooming feels
/// the same at every magnification.
pub const PINCH_ZOOM_EXPONENT: f64 = 0.7;

/// Pan distance per wheel unit.
pub const WHEEL_PAN_RATE: f64 = 2.0;

/// Pointer button carried on press and release events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Raw pointer input in logical (pre-DPI) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerInput {
    /// Button pressed at `position`.
    Down { position: Point, button: MouseButton },
    /// Pointer moved to `position`; `movement` is the relative delta.
    Move { position: Point, movement: Vec2 },
    /// Button released at `position`.
    Up { position: Point, button: MouseButton },
    /// Wheel or trackpad scroll at `position`.
    Wheel { position: Point, delta: Vec2 },
}

/// How wheel input should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelMode {
    /// Fractional vertical deltas are pinch-zoom, everything else pans.
    #[default]
    Trackpad,
    /// Vertical wheel steps zoom, horizontal wheel pans.
    Mouse,
}

/// Gesture tuning knobs, deserializable from host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Drag intent threshold in physical pixels, measured from the press.
    pub drag_threshold_px: f64,
    /// Wheel interpretation.
    pub wheel_mode: WheelMode,
    /// Zoom factor per wheel notch in [`WheelMode::Mouse`].
    pub zoom_step: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 10.0,
            wheel_mode: WheelMode::Trackpad,
            zoom_step: 1.1,
        }
    }
}

/// A classified pointer event. Positions are world-space unless named
/// otherwise; `movement` deltas are physical pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// The pointer moved, pressed or not.
    PointerMoved {
        screen: Point,
        world: Point,
        movement: Vec2,
    },
    /// Press and release without crossing the drag threshold.
    Click { world: Point },
    /// Movement crossed the drag threshold; `world` is the press position.
    DragStarted { world: Point },
    /// Movement while dragging.
    DragMoved { world: Point, movement: Vec2 },
    /// Release after a drag.
    DragEnded { world: Point },
    /// A classified wheel action for the caller to apply.
    Wheel(WheelAction),
}

/// What a wheel event asks the viewport to do.
#[derive(Debug, Clone, PartialEq)]
pub enum WheelAction {
    /// Add `zoom_delta` to the zoom, anchored at `anchor` (physical px).
    PinchZoom { anchor: Point, zoom_delta: f64 },
    /// Pan by `delta` physical pixels.
    Pan { delta: Vec2 },
    /// Multiply the zoom by `factor`, anchored at `anchor` (physical px).
    ZoomStep { anchor: Point, factor: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragPhase {
    Idle,
    /// Pressed, not yet past the threshold. Holds the press position in
    /// physical pixels.
    Armed { pressed_at: Point },
    Dragging,
}

/// The gesture state machine and its event streams.
///
/// [`GestureDispatcher::handle`] returns the events for one input and also
/// emits them onto the matching [`Stream`]s, which is what edit-mode
/// subscriptions listen to.
pub struct GestureDispatcher {
    config: GestureConfig,
    phase: DragPhase,
    screen_moves: Stream<Point>,
    world_moves: Stream<Point>,
    clicks: Stream<Point>,
    drag_starts: Stream<Point>,
    drag_moves: Stream<Point>,
    drag_ends: Stream<Point>,
}

impl Default for GestureDispatcher {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureDispatcher {
    /// Create a dispatcher with the given tuning.
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phase: DragPhase::Idle,
            screen_moves: Stream::new(),
            world_moves: Stream::new(),
            clicks: Stream::new(),
            drag_starts: Stream::new(),
            drag_moves: Stream::new(),
            drag_ends: Stream::new(),
        }
    }

    /// Pointer position stream in physical screen pixels.
    pub fn screen_moves(&self) -> &Stream<Point> {
        &self.screen_moves
    }

    /// Pointer position stream in world coordinates.
    pub fn world_moves(&self) -> &Stream<Point> {
        &self.world_moves
    }

    /// World-space click positions.
    pub fn clicks(&self) -> &Stream<Point> {
        &self.clicks
    }

    /// World-space drag start positions (the press position).
    pub fn drag_starts(&self) -> &Stream<Point> {
        &self.drag_starts
    }

    /// World-space positions while dragging.
    pub fn drag_moves(&self) -> &Stream<Point> {
        &self.drag_moves
    }

    /// World-space drag end positions.
    pub fn drag_ends(&self) -> &Stream<Point> {
        &self.drag_ends
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.phase == DragPhase::Dragging
    }

    /// Classify one raw input against the current viewport state.
    pub fn handle(&mut self, input: PointerInput, viewport: &Viewport) -> Vec<GestureEvent> {
        let sf = viewport.scale_factor();
        let mut events = Vec::new();

        match input {
            PointerInput::Down { position, .. } => {
                let screen = to_physical(position, sf);
                self.phase = DragPhase::Armed { pressed_at: screen };
            }
            PointerInput::Move { position, movement } => {
                let screen = to_physical(position, sf);
                let movement = movement * sf;
                let world = viewport.screen_to_world(screen);

                self.screen_moves.emit(&screen);
                self.world_moves.emit(&world);
                events.push(GestureEvent::PointerMoved {
                    screen,
                    world,
                    movement,
                });

                match self.phase {
                    DragPhase::Armed { pressed_at } => {
                        let past_threshold = !math::within_distance(
                            screen,
                            pressed_at,
                            self.config.drag_threshold_px,
                        );
                        if past_threshold {
                            self.phase = DragPhase::Dragging;
                            log::debug!("drag threshold crossed at {screen:?}");
                            let start = viewport.screen_to_world(pressed_at);
                            self.drag_starts.emit(&start);
                            events.push(GestureEvent::DragStarted { world: start });
                            // The crossing move doubles as the first drag move.
                            self.drag_moves.emit(&world);
                            events.push(GestureEvent::DragMoved { world, movement });
                        }
                    }
                    DragPhase::Dragging => {
                        self.drag_moves.emit(&world);
                        events.push(GestureEvent::DragMoved { world, movement });
                    }
                    DragPhase::Idle => {}
                }
            }
            PointerInput::Up { position, .. } => {
                let screen = to_physical(position, sf);
                let world = viewport.screen_to_world(screen);
                match self.phase {
                    DragPhase::Armed { .. } => {
                        log::debug!("click at {world:?}");
                        self.clicks.emit(&world);
                        events.push(GestureEvent::Click { world });
                    }
                    DragPhase::Dragging => {
                        self.drag_ends.emit(&world);
                        events.push(GestureEvent::DragEnded { world });
                    }
                    DragPhase::Idle => {}
                }
                self.phase = DragPhase::Idle;
            }
            PointerInput::Wheel { position, delta } => {
                let anchor = to_physical(position, sf);
                if let Some(action) = self.classify_wheel(anchor, delta, viewport) {
                    events.push(GestureEvent::Wheel(action));
                }
            }
        }

        events
    }

    fn classify_wheel(
        &self,
        anchor: Point,
        delta: Vec2,
        viewport: &Viewport,
    ) -> Option<WheelAction> {
        let pan = |delta: Vec2| WheelAction::Pan {
            delta: Vec2::new(-delta.x, -delta.y) * (viewport.scale_factor() * WHEEL_PAN_RATE),
        };

        match self.config.wheel_mode {
            WheelMode::Mouse => {
                if delta.y != 0.0 {
                    let factor = if delta.y < 0.0 {
                        self.config.zoom_step
                    } else {
                        1.0 / self.config.zoom_step
                    };
                    Some(WheelAction::ZoomStep { anchor, factor })
                } else if delta.x != 0.0 {
                    Some(pan(delta))
                } else {
                    None
                }
            }
            WheelMode::Trackpad => {
                // Trackpad pinch reports fractional vertical deltas with an
                // integral (usually zero) horizontal delta.
                let is_pinch = delta.y.fract() != 0.0 && delta.x.fract() == 0.0;
                if is_pinch {
                    let zoom = viewport.zoom();
                    let zoom_delta = -delta.y * PINCH_ZOOM_RATE * zoom.powf(PINCH_ZOOM_EXPONENT);
                    Some(WheelAction::PinchZoom { anchor, zoom_delta })
                } else if delta.x != 0.0 || delta.y != 0.0 {
                    Some(pan(delta))
                } else {
                    None
                }
            }
        }
    }
}

fn to_physical(position: Point, scale_factor: f64) -> Point {
    Point::new(position.x * scale_factor, position.y * scale_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{FrameScheduler, NoopScheduler, RedrawQueue};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn viewport() -> Viewport {
        viewport_with_scale(1.0)
    }

    fn viewport_with_scale(scale_factor: f64) -> Viewport {
        let queue = Rc::new(RedrawQueue::new(
            Rc::new(NoopScheduler) as Rc<dyn FrameScheduler>
        ));
        Viewport::new(800.0, 600.0, scale_factor, queue)
    }

    fn down(x: f64, y: f64) -> PointerInput {
        PointerInput::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn move_to(x: f64, y: f64) -> PointerInput {
        PointerInput::Move {
            position: Point::new(x, y),
            movement: Vec2::ZERO,
        }
    }

    fn up(x: f64, y: f64) -> PointerInput {
        PointerInput::Up {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn wheel(x: f64, y: f64, dx: f64, dy: f64) -> PointerInput {
        PointerInput::Wheel {
            position: Point::new(x, y),
            delta: Vec2::new(dx, dy),
        }
    }

    fn run(
        dispatcher: &mut GestureDispatcher,
        viewport: &Viewport,
        inputs: &[PointerInput],
    ) -> Vec<GestureEvent> {
        inputs
            .iter()
            .flat_map(|input| dispatcher.handle(*input, viewport))
            .collect()
    }

    fn count<F: Fn(&GestureEvent) -> bool>(events: &[GestureEvent], f: F) -> usize {
        events.iter().filter(|event| f(event)).count()
    }

    #[test]
    fn test_press_and_release_within_threshold_is_one_click() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        let events = run(
            &mut dispatcher,
            &viewport,
            &[
                down(100.0, 100.0),
                move_to(103.0, 104.0),
                move_to(106.0, 100.0),
                up(106.0, 100.0),
            ],
        );

        assert_eq!(count(&events, |e| matches!(e, GestureEvent::Click { .. })), 1);
        assert_eq!(
            count(&events, |e| matches!(
                e,
                GestureEvent::DragStarted { .. }
                    | GestureEvent::DragMoved { .. }
                    | GestureEvent::DragEnded { .. }
            )),
            0
        );
    }

    #[test]
    fn test_movement_past_threshold_is_a_drag_not_a_click() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        let events = run(
            &mut dispatcher,
            &viewport,
            &[
                down(100.0, 100.0),
                move_to(120.0, 100.0),
                move_to(140.0, 100.0),
                up(140.0, 100.0),
            ],
        );

        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragStarted { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragMoved { .. })), 2);
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragEnded { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::Click { .. })), 0);
    }

    #[test]
    fn test_drag_starts_at_the_press_position() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        let press_world = viewport.screen_to_world(Point::new(100.0, 100.0));
        let events = run(
            &mut dispatcher,
            &viewport,
            &[down(100.0, 100.0), move_to(150.0, 100.0)],
        );

        let started = events.iter().find_map(|event| match event {
            GestureEvent::DragStarted { world } => Some(*world),
            _ => None,
        });
        let started = started.expect("drag should have started");
        assert!((started.x - press_world.x).abs() < 1e-12);
        assert!((started.y - press_world.y).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        // Exactly at the threshold: still armed.
        let events = run(
            &mut dispatcher,
            &viewport,
            &[down(0.0, 0.0), move_to(10.0, 0.0)],
        );
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragStarted { .. })), 0);

        // A hair past it: dragging.
        let events = dispatcher.handle(move_to(10.01, 0.0), &viewport);
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragStarted { .. })), 1);
    }

    #[test]
    fn test_move_without_press_only_reports_position() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        let events = dispatcher.handle(move_to(42.0, 17.0), &viewport);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GestureEvent::PointerMoved { .. }));
    }

    #[test]
    fn test_positions_scale_to_physical_pixels() {
        let viewport = viewport_with_scale(2.0);
        let mut dispatcher = GestureDispatcher::default();

        // 6 logical px is 12 physical px, past the 10 px threshold.
        let events = run(
            &mut dispatcher,
            &viewport,
            &[down(50.0, 50.0), move_to(56.0, 50.0)],
        );
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragStarted { .. })), 1);

        let moved = events.iter().find_map(|event| match event {
            GestureEvent::PointerMoved { screen, .. } => Some(*screen),
            _ => None,
        });
        assert_eq!(moved, Some(Point::new(112.0, 100.0)));
    }

    #[test]
    fn test_streams_mirror_the_returned_events() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        let clicks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&clicks);
        let _sub = dispatcher.clicks().subscribe(move |p| sink.borrow_mut().push(*p));

        let drags = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&drags);
        let _sub2 = dispatcher
            .drag_moves()
            .subscribe(move |p| sink.borrow_mut().push(*p));

        run(
            &mut dispatcher,
            &viewport,
            &[down(10.0, 10.0), up(10.0, 10.0)],
        );
        assert_eq!(clicks.borrow().len(), 1);

        run(
            &mut dispatcher,
            &viewport,
            &[down(10.0, 10.0), move_to(40.0, 10.0), up(40.0, 10.0)],
        );
        assert_eq!(clicks.borrow().len(), 1);
        assert_eq!(drags.borrow().len(), 1);
    }

    #[test]
    fn test_trackpad_fractional_vertical_delta_is_pinch() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        let events = dispatcher.handle(wheel(400.0, 300.0, 0.0, -2.5), &viewport);
        match &events[0] {
            GestureEvent::Wheel(WheelAction::PinchZoom { anchor, zoom_delta }) => {
                assert_eq!(*anchor, Point::new(400.0, 300.0));
                // -(-2.5) * 0.08 * 1^0.7
                assert!((zoom_delta - 0.2).abs() < 1e-12);
            }
            other => panic!("expected pinch, got {other:?}"),
        }
    }

    #[test]
    fn test_trackpad_integral_deltas_are_pan() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        let events = dispatcher.handle(wheel(0.0, 0.0, 3.0, -4.0), &viewport);
        match &events[0] {
            GestureEvent::Wheel(WheelAction::Pan { delta }) => {
                assert_eq!(*delta, Vec2::new(-6.0, 8.0));
            }
            other => panic!("expected pan, got {other:?}"),
        }

        // Fractional horizontal delta disqualifies a pinch.
        let events = dispatcher.handle(wheel(0.0, 0.0, 1.5, -2.5), &viewport);
        assert!(matches!(
            events[0],
            GestureEvent::Wheel(WheelAction::Pan { .. })
        ));
    }

    #[test]
    fn test_pinch_speed_follows_current_zoom() {
        let mut viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();

        viewport.set_zoom_at(Point::ZERO, 4.0);
        let events = dispatcher.handle(wheel(0.0, 0.0, 0.0, -1.5), &viewport);
        match &events[0] {
            GestureEvent::Wheel(WheelAction::PinchZoom { zoom_delta, .. }) => {
                let expected = 1.5 * PINCH_ZOOM_RATE * 4f64.powf(PINCH_ZOOM_EXPONENT);
                assert!((zoom_delta - expected).abs() < 1e-12);
            }
            other => panic!("expected pinch, got {other:?}"),
        }
    }

    #[test]
    fn test_mouse_mode_wheel_steps_zoom() {
        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::new(GestureConfig {
            wheel_mode: WheelMode::Mouse,
            ..GestureConfig::default()
        });

        let events = dispatcher.handle(wheel(10.0, 20.0, 0.0, -3.0), &viewport);
        match &events[0] {
            GestureEvent::Wheel(WheelAction::ZoomStep { factor, .. }) => {
                assert!((factor - 1.1).abs() < 1e-12);
            }
            other => panic!("expected zoom step, got {other:?}"),
        }

        let events = dispatcher.handle(wheel(10.0, 20.0, 0.0, 3.0), &viewport);
        match &events[0] {
            GestureEvent::Wheel(WheelAction::ZoomStep { factor, .. }) => {
                assert!((factor - 1.0 / 1.1).abs() < 1e-12);
            }
            other => panic!("expected zoom step, got {other:?}"),
        }
    }

    #[test]
    fn test_replay_recorded_input_log() {
        // A captured session: a click, then a drag to the right.
        let recording = r#"[
            {"kind": "down", "position": {"x": 100.0, "y": 100.0}, "button": "left"},
            {"kind": "move", "position": {"x": 102.0, "y": 101.0}, "movement": {"x": 2.0, "y": 1.0}},
            {"kind": "up", "position": {"x": 102.0, "y": 101.0}, "button": "left"},
            {"kind": "down", "position": {"x": 200.0, "y": 200.0}, "button": "left"},
            {"kind": "move", "position": {"x": 230.0, "y": 200.0}, "movement": {"x": 30.0, "y": 0.0}},
            {"kind": "move", "position": {"x": 260.0, "y": 200.0}, "movement": {"x": 30.0, "y": 0.0}},
            {"kind": "up", "position": {"x": 260.0, "y": 200.0}, "button": "left"}
        ]"#;
        let inputs: Vec<PointerInput> = serde_json::from_str(recording).unwrap();
        assert_eq!(inputs.len(), 7);

        let viewport = viewport();
        let mut dispatcher = GestureDispatcher::default();
        let events = run(&mut dispatcher, &viewport, &inputs);

        assert_eq!(count(&events, |e| matches!(e, GestureEvent::Click { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragStarted { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragEnded { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GestureEvent::DragMoved { .. })), 2);
    }
}
