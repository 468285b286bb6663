//! Bounded rings connecting the driver thread to the worker pool.
//!
//! [`Ring`] is a fixed-capacity FIFO with blocking and non-blocking
//! endpoints. The submission ring is filled by the driver and drained by
//! workers; the completion ring is the reverse. Waiters park on condition
//! variables: normal transitions wake one waiter, [`stop`](Ring::stop)
//! wakes them all.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct State<T> {
    items: VecDeque<T>,
    stopped: bool,
}

/// A bounded FIFO of items with blocking push/pop.
///
/// Pushes from a single producer are observed by consumers in program
/// order; across producers only the happens-before through the ring is
/// guaranteed.
pub struct Ring<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

// Compile-time assertion: rings are shared across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Ring<usize>>();
};

impl<T> Ring<T> {
    /// Create a ring holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be at least 1");
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                stopped: false,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Push without blocking. Returns the item when the ring is full or
    /// stopped.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock().unwrap();
        if state.stopped || state.items.len() == self.capacity {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Push, blocking while the ring is full. Returns the item once the
    /// ring has been stopped.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock().unwrap();
        while state.items.len() == self.capacity && !state.stopped {
            state = self.not_full.wait(state).unwrap();
        }
        if state.stopped {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Pop without blocking. `None` when the ring is empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        let item = state.items.pop_front()?;
        drop(state);
        self.not_full.notify_one();
        Some(item)
    }

    /// Pop, blocking while the ring is empty.
    ///
    /// After [`stop`](Ring::stop), remaining items are still handed out;
    /// `None` means the ring is stopped *and* dry, so consumers can use
    /// `while let Some(..)` as their run loop.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            if state.stopped {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Stop the ring, waking every parked producer and consumer.
    ///
    /// Terminal: subsequent pushes fail, pops drain what remains.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.stopped = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Take every queued item at once, waking parked producers.
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock().unwrap();
        let items: Vec<T> = state.items.drain(..).collect();
        drop(state);
        if !items.is_empty() {
            self.not_full.notify_all();
        }
        items
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Whether the ring is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_order_single_thread() {
        let ring = Ring::new(4);
        ring.try_push(1).unwrap();
        ring.try_push(2).unwrap();
        ring.try_push(3).unwrap();
        assert_eq!(ring.try_pop(), Some(1));
        assert_eq!(ring.try_pop(), Some(2));
        assert_eq!(ring.try_pop(), Some(3));
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn try_push_fails_when_full() {
        let ring = Ring::new(2);
        ring.try_push(1).unwrap();
        ring.try_push(2).unwrap();
        assert_eq!(ring.try_push(3), Err(3));
        assert_eq!(ring.len(), 2);
        ring.try_pop().unwrap();
        ring.try_push(3).unwrap();
    }

    #[test]
    #[should_panic(expected = "at least 1")]
    fn zero_capacity_panics() {
        Ring::<u32>::new(0);
    }

    #[test]
    fn stop_fails_pushes_and_drains_pops() {
        let ring = Ring::new(4);
        ring.try_push(1).unwrap();
        ring.try_push(2).unwrap();
        ring.stop();
        assert_eq!(ring.try_push(3), Err(3));
        assert_eq!(ring.push(4), Err(4));
        // Remaining items drain before pop reports the stop.
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn drain_takes_everything() {
        let ring = Ring::new(8);
        for i in 0..5 {
            ring.try_push(i).unwrap();
        }
        assert_eq!(ring.drain(), vec![0, 1, 2, 3, 4]);
        assert!(ring.is_empty());
        assert_eq!(ring.drain(), Vec::<i32>::new());
    }

    #[test]
    fn blocking_pop_sees_later_push() {
        let ring = Arc::new(Ring::new(2));
        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.pop())
        };
        // Give the consumer time to park.
        thread::sleep(Duration::from_millis(20));
        ring.try_push(42u32).unwrap();
        assert_eq!(consumer.join().unwrap(), Some(42));
    }

    #[test]
    fn blocking_push_waits_for_space() {
        let ring = Arc::new(Ring::new(1));
        ring.try_push(1u32).unwrap();
        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.push(2))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ring.pop(), Some(1));
        producer.join().unwrap().unwrap();
        assert_eq!(ring.pop(), Some(2));
    }

    #[test]
    fn stop_wakes_parked_consumers() {
        let ring: Arc<Ring<u32>> = Arc::new(Ring::new(2));
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || ring.pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        ring.stop();
        for c in consumers {
            assert_eq!(c.join().unwrap(), None);
        }
    }

    #[test]
    fn single_producer_order_is_preserved_across_threads() {
        let ring = Arc::new(Ring::new(8));
        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..1000u32 {
                    while ring.try_push(i).is_err() {
                        thread::yield_now();
                    }
                }
            })
        };
        let mut last = None;
        for _ in 0..1000 {
            let item = ring.pop().unwrap();
            if let Some(prev) = last {
                assert!(item > prev, "items reordered: {prev} before {item}");
            }
            last = Some(item);
        }
        producer.join().unwrap();
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ring_is_fifo_under_arbitrary_interleaving(
                ops in prop::collection::vec(any::<bool>(), 0..256),
                capacity in 1usize..16,
            ) {
                let ring = Ring::new(capacity);
                let mut next = 0u32;
                let mut expected = std::collections::VecDeque::new();

                for push in ops {
                    if push {
                        match ring.try_push(next) {
                            Ok(()) => {
                                expected.push_back(next);
                                prop_assert!(expected.len() <= capacity);
                            }
                            Err(v) => {
                                prop_assert_eq!(v, next);
                                prop_assert_eq!(expected.len(), capacity);
                            }
                        }
                        next += 1;
                    } else {
                        prop_assert_eq!(ring.try_pop(), expected.pop_front());
                    }
                    prop_assert_eq!(ring.len(), expected.len());
                }
            }
        }
    }

    #[test]
    fn many_producers_one_consumer_delivers_everything() {
        let ring = Arc::new(Ring::new(4));
        let producers: Vec<_> = (0..4u32)
            .map(|t| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    for i in 0..250u32 {
                        ring.push(t * 1000 + i).unwrap();
                    }
                })
            })
            .collect();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(ring.pop().unwrap()));
        }
        for p in producers {
            p.join().unwrap();
        }
        assert!(ring.is_empty());
    }
}
