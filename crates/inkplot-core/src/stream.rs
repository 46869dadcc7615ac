//! Single-threaded event streams with explicit cancellation.
//!
//! A [`Stream`] is a list of callbacks invoked in subscription order on every
//! [`Stream::emit`]. Cloning a stream clones a handle to the same subscriber
//! list. Streams are the plumbing underneath reactive cells and the pointer
//! gesture events.

use std::cell::RefCell;
use std::rc::Rc;

struct Slot<T> {
    active: Rc<std::cell::Cell<bool>>,
    callback: RefCell<Box<dyn FnMut(&T)>>,
}

struct StreamInner<T> {
    slots: RefCell<Vec<Rc<Slot<T>>>>,
}

/// A broadcast stream of values of type `T`.
pub struct Stream<T> {
    inner: Rc<StreamInner<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Stream<T> {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StreamInner {
                slots: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register `callback` to run on every emitted value.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// cancelled. Dropping the subscription does not cancel it.
    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let active = Rc::new(std::cell::Cell::new(true));
        let slot = Rc::new(Slot {
            active: Rc::clone(&active),
            callback: RefCell::new(Box::new(callback)),
        });
        self.inner.slots.borrow_mut().push(slot);
        Subscription { active }
    }

    /// Deliver `value` to every active subscriber, in subscription order.
    ///
    /// Subscribers added while an emit is running are deferred to the next
    /// emit. Subscribers cancelled while an emit is running are skipped,
    /// including for the value currently in flight.
    pub fn emit(&self, value: &T) {
        // Snapshot so callbacks can subscribe or cancel without holding
        // a borrow on the slot list.
        let snapshot: Vec<Rc<Slot<T>>> = self.inner.slots.borrow().clone();
        for slot in &snapshot {
            if !slot.active.get() {
                continue;
            }
            match slot.callback.try_borrow_mut() {
                Ok(mut callback) => callback(value),
                Err(_) => {
                    // The slot's own callback is somewhere up the stack.
                    log::warn!("skipping re-entrant emit into a subscriber that is still running");
                }
            }
        }
        self.inner
            .slots
            .borrow_mut()
            .retain(|slot| slot.active.get());
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .slots
            .borrow()
            .iter()
            .filter(|slot| slot.active.get())
            .count()
    }
}

/// Handle for a single subscription on a [`Stream`].
#[derive(Clone)]
pub struct Subscription {
    active: Rc<std::cell::Cell<bool>>,
}

impl Subscription {
    /// Stop the subscriber from receiving further values.
    pub fn cancel(&self) {
        self.active.set(false);
    }

    /// Whether the subscription still delivers values.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_emit() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let _sub = stream.subscribe(move |v| sink.borrow_mut().push(*v));

        stream.emit(&1);
        stream.emit(&2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_emit_order_matches_subscription_order() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let a = Rc::clone(&seen);
        let _s1 = stream.subscribe(move |_| a.borrow_mut().push("a"));
        let b = Rc::clone(&seen);
        let _s2 = stream.subscribe(move |_| b.borrow_mut().push("b"));

        stream.emit(&0);
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let sub = stream.subscribe(move |v| sink.borrow_mut().push(*v));

        stream.emit(&1);
        sub.cancel();
        stream.emit(&2);
        assert_eq!(*seen.borrow(), vec![1]);
        assert!(!sub.is_active());
    }

    #[test]
    fn test_drop_does_not_cancel() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let sub = stream.subscribe(move |v| sink.borrow_mut().push(*v));
        drop(sub);

        stream.emit(&7);
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn test_cancel_during_emit_skips_pending_delivery() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        // First subscriber cancels the second before it ever runs.
        let later: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let to_cancel = Rc::clone(&later);
        let _s1 = stream.subscribe(move |_: &i32| {
            if let Some(sub) = to_cancel.borrow().as_ref() {
                sub.cancel();
            }
        });
        let sink = Rc::clone(&seen);
        let s2 = stream.subscribe(move |v| sink.borrow_mut().push(*v));
        *later.borrow_mut() = Some(s2);

        stream.emit(&1);
        assert!(seen.borrow().is_empty());
        assert_eq!(stream.subscriber_count(), 1);
    }

    #[test]
    fn test_subscribe_during_emit_is_deferred() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let outer = stream.clone();
        let sink = Rc::clone(&seen);
        let added = Rc::new(std::cell::Cell::new(false));
        let added_flag = Rc::clone(&added);
        let _s1 = stream.subscribe(move |_: &i32| {
            if !added_flag.get() {
                added_flag.set(true);
                let inner_sink = Rc::clone(&sink);
                let _ = outer.subscribe(move |v| inner_sink.borrow_mut().push(*v));
            }
        });

        // The subscriber added mid-emit must not see the value in flight.
        stream.emit(&1);
        assert!(seen.borrow().is_empty());

        stream.emit(&2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_reentrant_emit_does_not_panic() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner = stream.clone();
        let sink = Rc::clone(&seen);
        let _s1 = stream.subscribe(move |v| {
            sink.borrow_mut().push(*v);
            if *v == 1 {
                // Re-enters emit; this slot is mid-call and gets skipped.
                inner.emit(&99);
            }
        });

        stream.emit(&1);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_subscriber_count() {
        let stream: Stream<i32> = Stream::new();
        assert_eq!(stream.subscriber_count(), 0);
        let s1 = stream.subscribe(|_| {});
        let _s2 = stream.subscribe(|_| {});
        assert_eq!(stream.subscriber_count(), 2);
        s1.cancel();
        assert_eq!(stream.subscriber_count(), 1);
    }
}
