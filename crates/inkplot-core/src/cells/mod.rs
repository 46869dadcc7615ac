//! Reactive value cells.
//!
//! A [`Cell`] is a single mutable value that notifies subscribers
//! synchronously on every set. Cells compose into one-directional graphs:
//! [`Cell::derive`] maps one cell into another, [`combine`] joins several, and
//! [`Cell::adopt`] mirrors another cell into an existing one. Derived cells
//! are flagged `dependent`; their value is owned by the propagation graph and
//! overwritten whenever a source changes.
//!
//! Propagation is synchronous and depth-unbounded. A set performed from
//! inside a notification (a cycle, or a careless subscriber) is detected via
//! a per-cell `notifying` flag: the value is stored, a warning is logged, and
//! no second notification round is started.

mod point;

pub use point::{combine_points, PointCell};

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::stream::{Stream, Subscription};

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a cell, independent of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        CellId(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct CellInner<T> {
    id: CellId,
    value: RefCell<T>,
    subscribers: Stream<T>,
    dependent: std::cell::Cell<bool>,
    notifying: std::cell::Cell<bool>,
}

/// A reactive box holding a value of type `T`.
///
/// Cloning a `Cell` clones a handle to the same shared state.
pub struct Cell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("dependent", &self.inner.dependent.get())
            .finish()
    }
}

impl<T: Clone + 'static> Cell<T> {
    /// Create an independent cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                id: CellId::next(),
                value: RefCell::new(value),
                subscribers: Stream::new(),
                dependent: std::cell::Cell::new(false),
                notifying: std::cell::Cell::new(false),
            }),
        }
    }

    /// Identity of this cell, shared by all clones of the handle.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Store a new value and synchronously notify every subscriber.
    ///
    /// When called from inside one of this cell's own notifications the value
    /// is stored but subscribers are not re-notified for it.
    pub fn set(&self, value: T) {
        if self.inner.notifying.get() {
            *self.inner.value.borrow_mut() = value;
            log::warn!("cell set while notifying its subscribers, suppressing a nested notification round");
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Register `callback` for every future value. Fired in subscription
    /// order; the current value is not replayed.
    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    /// Whether this cell's value is computed from other cells.
    pub fn is_dependent(&self) -> bool {
        self.inner.dependent.get()
    }

    /// Number of active subscribers, propagation edges included.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.subscriber_count()
    }

    fn mark_dependent(&self) {
        self.inner.dependent.set(true);
    }

    fn notify(&self) {
        self.inner.notifying.set(true);
        // Clone out so subscribers can read (or re-set) the cell freely.
        let value = self.inner.value.borrow().clone();
        self.inner.subscribers.emit(&value);
        self.inner.notifying.set(false);
    }

    /// Create a dependent cell whose value is always `f(source)`.
    ///
    /// The initial value is computed eagerly; afterwards every set on `self`
    /// recomputes and pushes downstream.
    pub fn derive<U: Clone + 'static>(&self, mut f: impl FnMut(&T) -> U + 'static) -> Cell<U> {
        let derived = Cell::new(f(&self.get()));
        derived.mark_dependent();
        let target = derived.clone();
        let _ = self.subscribe(move |value| target.set(f(value)));
        derived
    }

    /// Mirror `source` into this cell.
    ///
    /// Given a reactive binding, takes its current value now and every future
    /// value as it changes; this cell becomes dependent and the returned
    /// subscription controls the link. Given a constant binding, sets the
    /// value once and returns `None`.
    pub fn adopt(&self, source: impl Into<Binding<T>>) -> Option<Subscription> {
        match source.into() {
            Binding::Constant(value) => {
                self.set(value);
                None
            }
            Binding::Reactive(cell) => {
                self.set(cell.get());
                self.mark_dependent();
                let target = self.clone();
                Some(cell.subscribe(move |value| target.set(value.clone())))
            }
        }
    }
}

/// Join two cells into a dependent cell recomputed when either input changes.
pub fn combine<A, B, U>(
    a: &Cell<A>,
    b: &Cell<B>,
    f: impl FnMut(&A, &B) -> U + 'static,
) -> Cell<U>
where
    A: Clone + 'static,
    B: Clone + 'static,
    U: Clone + 'static,
{
    let f = Rc::new(RefCell::new(f));
    let initial = (f.borrow_mut())(&a.get(), &b.get());
    let result = Cell::new(initial);
    result.mark_dependent();

    let target = result.clone();
    let recompute = Rc::clone(&f);
    let other = b.clone();
    let _ = a.subscribe(move |va| {
        let vb = other.get();
        let value = (recompute.borrow_mut())(va, &vb);
        target.set(value);
    });

    let target = result.clone();
    let recompute = Rc::clone(&f);
    let other = a.clone();
    let _ = b.subscribe(move |vb| {
        let va = other.get();
        let value = (recompute.borrow_mut())(&va, vb);
        target.set(value);
    });

    result
}

/// Join three cells into a dependent cell recomputed when any input changes.
pub fn combine3<A, B, C, U>(
    a: &Cell<A>,
    b: &Cell<B>,
    c: &Cell<C>,
    f: impl FnMut(&A, &B, &C) -> U + 'static,
) -> Cell<U>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    U: Clone + 'static,
{
    let f = Rc::new(RefCell::new(f));
    let initial = (f.borrow_mut())(&a.get(), &b.get(), &c.get());
    let result = Cell::new(initial);
    result.mark_dependent();

    let target = result.clone();
    let recompute = Rc::clone(&f);
    let (cb, cc) = (b.clone(), c.clone());
    let _ = a.subscribe(move |va| {
        let value = (recompute.borrow_mut())(va, &cb.get(), &cc.get());
        target.set(value);
    });

    let target = result.clone();
    let recompute = Rc::clone(&f);
    let (ca, cc) = (a.clone(), c.clone());
    let _ = b.subscribe(move |vb| {
        let value = (recompute.borrow_mut())(&ca.get(), vb, &cc.get());
        target.set(value);
    });

    let target = result.clone();
    let recompute = Rc::clone(&f);
    let (ca, cb) = (a.clone(), b.clone());
    let _ = c.subscribe(move |vc| {
        let value = (recompute.borrow_mut())(&ca.get(), &cb.get(), vc);
        target.set(value);
    });

    result
}

/// Join any number of same-typed cells into a dependent `Cell<Vec<T>>`.
pub fn combine_all<T: Clone + 'static>(cells: &[Cell<T>]) -> Cell<Vec<T>> {
    let result = Cell::new(cells.iter().map(Cell::get).collect::<Vec<_>>());
    result.mark_dependent();
    let sources: Vec<Cell<T>> = cells.to_vec();
    for cell in cells {
        let target = result.clone();
        let all = sources.clone();
        let _ = cell.subscribe(move |_| {
            target.set(all.iter().map(Cell::get).collect());
        });
    }
    result
}

/// Either a plain value or a live cell, resolved once at construction.
///
/// Element constructors take `impl Into<Binding<T>>` so callers can hand in
/// a concrete value or a cell interchangeably; the element reads through
/// [`Binding::get`] either way and subscribes only when there is something
/// to subscribe to.
#[derive(Clone)]
pub enum Binding<T> {
    /// A fixed value.
    Constant(T),
    /// A value tracking a cell.
    Reactive(Cell<T>),
}

impl<T: Clone + 'static> Binding<T> {
    /// Current value.
    pub fn get(&self) -> T {
        match self {
            Binding::Constant(value) => value.clone(),
            Binding::Reactive(cell) => cell.get(),
        }
    }

    /// Subscribe to changes; `None` for constants, which never change.
    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Option<Subscription> {
        match self {
            Binding::Constant(_) => None,
            Binding::Reactive(cell) => Some(cell.subscribe(callback)),
        }
    }

    /// The underlying cell, when the binding is reactive.
    pub fn as_cell(&self) -> Option<&Cell<T>> {
        match self {
            Binding::Constant(_) => None,
            Binding::Reactive(cell) => Some(cell),
        }
    }
}

impl<T: Clone + std::fmt::Debug + 'static> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Binding::Reactive(cell) => f.debug_tuple("Reactive").field(cell).finish(),
        }
    }
}

impl<T: Default> Default for Binding<T> {
    fn default() -> Self {
        Binding::Constant(T::default())
    }
}

impl<T> From<T> for Binding<T> {
    fn from(value: T) -> Self {
        Binding::Constant(value)
    }
}

impl<T> From<Cell<T>> for Binding<T> {
    fn from(cell: Cell<T>) -> Self {
        Binding::Reactive(cell)
    }
}

impl<T> From<&Cell<T>> for Binding<T> {
    fn from(cell: &Cell<T>) -> Self {
        Binding::Reactive(cell.clone())
    }
}

impl From<&str> for Binding<String> {
    fn from(value: &str) -> Self {
        Binding::Constant(value.to_owned())
    }
}
