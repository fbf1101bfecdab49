//! Ring storage.
//!
//! Live elements occupy slots `[head, head + count) mod capacity`. Slots
//! outside that range are always `None`. The ring itself is not
//! synchronized; `AdaptiveQueue` owns it behind its mutex.

pub(crate) struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    count: usize,
}

impl<T> Ring<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self {
            slots: empty_slots(capacity),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn head(&self) -> usize {
        self.head
    }

    pub(crate) fn tail(&self) -> usize {
        self.tail
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    pub(crate) fn push_back(&mut self, value: T) {
        assert!(!self.is_full(), "push into a full ring");
        debug_assert!(self.slots[self.tail].is_none());

        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
    }

    pub(crate) fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let Some(value) = self.slots[self.head].take() else {
            panic!("slot {} inside the live range is empty", self.head);
        };
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        Some(value)
    }

    /// Most recently pushed element.
    pub(crate) fn back(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        let index = (self.tail + self.capacity() - 1) % self.capacity();
        self.slots[index].as_ref()
    }

    /// Move the live elements, in order, to slots `[0, count)` of fresh
    /// storage of `new_capacity` slots. Afterwards `head == 0` and
    /// `tail == count`.
    pub(crate) fn resize(&mut self, new_capacity: usize) {
        assert!(
            new_capacity > self.count,
            "resize to {} would not fit {} elements plus a free slot",
            new_capacity,
            self.count
        );

        let capacity = self.capacity();
        let mut slots = Vec::with_capacity(new_capacity);
        for offset in 0..self.count {
            slots.push(self.slots[(self.head + offset) % capacity].take());
        }
        slots.resize_with(new_capacity, || None);

        self.slots = slots;
        self.head = 0;
        self.tail = self.count;
        self.assert_consistent();
    }

    /// Elements front to back.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let capacity = self.capacity();
        (0..self.count).filter_map(move |offset| self.slots[(self.head + offset) % capacity].as_ref())
    }

    /// Index invariants. A violation is a logic defect, never clamped.
    pub(crate) fn assert_consistent(&self) {
        let capacity = self.capacity();
        assert!(capacity >= 1, "capacity dropped to 0");
        assert!(
            self.count <= capacity,
            "count {} exceeds capacity {}",
            self.count,
            capacity
        );
        assert!(self.head < capacity && self.tail < capacity, "index out of range");
        assert_eq!(
            (self.head + self.count) % capacity,
            self.tail,
            "head/tail/count disagree"
        );
    }
}

fn empty_slots<T>(capacity: usize) -> Vec<Option<T>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || None);
    slots
}
