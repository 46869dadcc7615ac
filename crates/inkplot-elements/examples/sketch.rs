//! Headless sketching session.
//!
//! Drives the engine the way an interactive host would: seeds a grid, a
//! greeting and a draggable line, then chains line segments through the
//! click edit mode, drags an endpoint and zooms. Run with
//! `RUST_LOG=trace` to watch the engine work.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Point, Vec2};

use inkplot_core::{
    Cell, EditMode, EditModeOptions, Engine, EngineConfig, MouseButton, PointCell, PointerInput,
};
use inkplot_elements::{Grid, LineElement, TextElement};

fn click(engine: &mut Engine, world: Point) {
    let position = engine.viewport().world_to_screen(world);
    engine.pointer_input(PointerInput::Down {
        position,
        button: MouseButton::Left,
    });
    engine.pointer_input(PointerInput::Up {
        position,
        button: MouseButton::Left,
    });
}

fn glide(engine: &mut Engine, world: Point) {
    let position = engine.viewport().world_to_screen(world);
    engine.pointer_input(PointerInput::Move {
        position,
        movement: Vec2::new(1.0, 1.0),
    });
}

fn main() {
    env_logger::init();

    let (mut engine, surface) = Engine::with_recording_surface(EngineConfig::default());

    engine.add(Grid::new(1));
    engine.add(TextElement::new("Hello world", Point::new(0.5, 0.8)));

    let baseline =
        LineElement::new(Point::new(0.4, 0.1), Point::new(0.9, 0.9)).with_draggable_ends();
    let anchor = baseline.p1().clone();
    engine.add(baseline);
    engine.tick();

    // Chain measured segments: every click finishes the segment under the
    // cursor and starts the next one from the same point.
    let queue = engine.element_queue();
    let active: Rc<RefCell<Option<(PointCell, Cell<bool>)>>> = Rc::new(RefCell::new(None));

    let begin_segment: Rc<dyn Fn(Point)> = {
        let queue = queue.clone();
        let active = Rc::clone(&active);
        Rc::new(move |point: Point| {
            let segment = LineElement::new(point, point)
                .with_middle_point()
                .with_length_label();
            *active.borrow_mut() = Some((segment.p2().clone(), segment.show_length().clone()));
            queue.push(Box::new(segment));
        })
    };

    let session = engine.activate_edit_mode(EditModeOptions {
        mode: EditMode::Clicks,
        auto_rerender: true,
        on_start: Some(Box::new({
            let begin = Rc::clone(&begin_segment);
            move |point| begin(point)
        })),
        on_move: Some(Box::new({
            let active = Rc::clone(&active);
            move |point| {
                if let Some((p2, _)) = active.borrow().as_ref() {
                    p2.set(point);
                }
            }
        })),
        on_click: Some(Box::new({
            let begin = Rc::clone(&begin_segment);
            let active = Rc::clone(&active);
            move |point| {
                let finished = active.borrow_mut().take();
                if let Some((p2, show_length)) = finished {
                    p2.set(point);
                    show_length.set(false);
                    begin(point);
                }
            }
        })),
        ..EditModeOptions::default()
    });

    click(&mut engine, Point::new(0.2, 0.2));
    glide(&mut engine, Point::new(0.6, 0.3));
    engine.tick();
    click(&mut engine, Point::new(0.6, 0.3));
    glide(&mut engine, Point::new(0.3, 0.7));
    engine.tick();
    click(&mut engine, Point::new(0.3, 0.7));
    session.cancel();
    engine.tick();

    // Default input handling is back: drag the baseline's endpoint, then
    // pinch in around the canvas center.
    let grab = engine.viewport().world_to_screen(anchor.get());
    engine.pointer_input(PointerInput::Down {
        position: grab,
        button: MouseButton::Left,
    });
    engine.pointer_input(PointerInput::Move {
        position: grab + Vec2::new(30.0, 0.0),
        movement: Vec2::new(30.0, 0.0),
    });
    engine.pointer_input(PointerInput::Up {
        position: grab + Vec2::new(30.0, 0.0),
        button: MouseButton::Left,
    });
    engine.tick();

    engine.pointer_input(PointerInput::Wheel {
        position: Point::new(400.0, 300.0),
        delta: Vec2::new(0.0, -2.5),
    });
    engine.tick();

    println!("elements: {}", engine.element_count());
    println!("baseline p1: {:.3?}", anchor.get());
    println!("zoom: {:.2}", engine.viewport().zoom());
    println!("frames: {}", surface.borrow().frames());
    println!("batches: {}", surface.borrow().batches().count());
}
