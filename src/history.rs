// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Bounded sample history
//!
//! [`History`] is a fixed-capacity ring buffer of [`Value`]s. Appends are
//! O(1) and overwrite the oldest sample once the buffer is full. Readers
//! always see samples oldest first, whatever the physical cursor position.

/// One timestamped sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Value {
    /// Sample time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Numeric payload. Meaningless when `available` is false.
    pub value: f64,
    /// Whether the probe produced a real reading
    pub available: bool,
}

impl Value {
    /// Create an available sample
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
            available: true,
        }
    }

    /// Create a sample marking a missing reading
    pub fn unavailable(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            value: f64::NAN,
            available: false,
        }
    }

    /// The reading, if there is one
    pub fn reading(&self) -> Option<f64> {
        self.available.then_some(self.value)
    }
}

/// Fixed-capacity, overwrite-oldest, time-ordered sample store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    /// Physical storage. Grows up to `capacity`, then wraps.
    slots: Vec<Value>,
    /// Next slot to write once `slots` is full
    head: usize,
    capacity: usize,
}

impl History {
    /// Create an empty history holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Create a history holding exactly `values`, with capacity `values.len()`
    ///
    /// Values are kept in the order given; callers pass them oldest first.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            capacity: values.len(),
            slots: values,
            head: 0,
        }
    }

    /// Maximum number of retained samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no samples are retained
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check if the next append evicts a sample
    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Append a sample, evicting the oldest if full
    ///
    /// Returns false (and stores nothing) when the sample is older than the
    /// newest retained one or when the capacity is zero.
    pub fn push(&mut self, value: Value) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if let Some(newest) = self.latest() {
            if value.timestamp_ms < newest.timestamp_ms {
                return false;
            }
        }

        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
        true
    }

    /// Newest retained sample
    pub fn latest(&self) -> Option<&Value> {
        if self.slots.len() < self.capacity || self.head == 0 {
            self.slots.last()
        } else {
            self.slots.get(self.head - 1)
        }
    }

    /// Oldest retained sample
    pub fn oldest(&self) -> Option<&Value> {
        self.iter().next()
    }

    /// Samples in ascending timestamp order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Value> + '_ {
        // Until the buffer wraps, head stays 0 and storage order is logical order.
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Copy of the samples in ascending timestamp order
    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().copied().collect()
    }

    /// Change the capacity
    ///
    /// Keeps the newest `min(len, capacity)` samples and drops the rest.
    /// Growing never fabricates samples.
    pub fn resize(&mut self, capacity: usize) {
        if capacity == self.capacity && self.head == 0 {
            return;
        }
        let keep = self.slots.len().min(capacity);
        let skip = self.slots.len() - keep;
        let mut slots = Vec::with_capacity(capacity);
        slots.extend(self.iter().skip(skip).copied());

        self.slots = slots;
        self.head = 0;
        self.capacity = capacity;
    }

    /// Drop every sample, keeping the capacity
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(history: &mut History, count: i64) {
        for i in 1..=count {
            assert!(history.push(Value::new(i * 1000, i as f64)));
        }
    }

    fn timestamps(history: &History) -> Vec<i64> {
        history.iter().map(|v| v.timestamp_ms).collect()
    }

    #[test]
    fn test_push_below_capacity() {
        let mut history = History::new(4);
        fill(&mut history, 3);

        assert_eq!(history.len(), 3);
        assert!(!history.is_full());
        assert_eq!(timestamps(&history), vec![1000, 2000, 3000]);
        assert_eq!(history.latest().unwrap().timestamp_ms, 3000);
    }

    #[test]
    fn test_keeps_most_recent_in_order() {
        for capacity in 1..=8 {
            for count in (capacity as i64 + 1)..=(3 * capacity as i64 + 2) {
                let mut history = History::new(capacity);
                fill(&mut history, count);

                let expected: Vec<i64> = ((count - capacity as i64 + 1)..=count)
                    .map(|i| i * 1000)
                    .collect();
                assert_eq!(timestamps(&history), expected, "cap {} n {}", capacity, count);
                assert_eq!(history.latest().unwrap().timestamp_ms, count * 1000);
                assert_eq!(history.oldest().unwrap().timestamp_ms, expected[0]);
            }
        }
    }

    #[test]
    fn test_zero_capacity() {
        let mut history = History::new(0);
        assert!(!history.push(Value::new(1, 1.0)));
        assert!(history.is_empty());
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_rejects_older_sample() {
        let mut history = History::new(3);
        fill(&mut history, 2);

        assert!(!history.push(Value::new(1500, 9.0)));
        assert!(history.push(Value::new(2000, 9.0)));
        assert_eq!(timestamps(&history), vec![1000, 2000, 2000]);
    }

    #[test]
    fn test_shrink_keeps_newest() {
        let mut history = History::new(10);
        fill(&mut history, 10);

        history.resize(3);
        assert_eq!(history.capacity(), 3);
        assert_eq!(timestamps(&history), vec![8000, 9000, 10000]);
    }

    #[test]
    fn test_shrink_after_wrap() {
        let mut history = History::new(4);
        fill(&mut history, 7);
        assert_eq!(timestamps(&history), vec![4000, 5000, 6000, 7000]);

        history.resize(2);
        assert_eq!(timestamps(&history), vec![6000, 7000]);

        history.push(Value::new(8000, 8.0));
        assert_eq!(timestamps(&history), vec![7000, 8000]);
    }

    #[test]
    fn test_grow_does_not_fabricate() {
        let mut history = History::new(3);
        fill(&mut history, 5);

        history.resize(6);
        assert_eq!(history.len(), 3);
        assert_eq!(timestamps(&history), vec![3000, 4000, 5000]);

        for i in 6..=9 {
            history.push(Value::new(i * 1000, i as f64));
        }
        assert_eq!(
            timestamps(&history),
            vec![4000, 5000, 6000, 7000, 8000, 9000]
        );
    }

    #[test]
    fn test_resize_to_zero() {
        let mut history = History::new(3);
        fill(&mut history, 3);
        history.resize(0);
        assert!(history.is_empty());
        assert!(!history.push(Value::new(9000, 9.0)));
    }

    #[test]
    fn test_unavailable_has_no_reading() {
        let value = Value::unavailable(42);
        assert!(!value.available);
        assert_eq!(value.reading(), None);
        assert_eq!(Value::new(42, 1.5).reading(), Some(1.5));
    }

    #[test]
    fn test_from_values() {
        let history = History::from_values(vec![Value::new(1, 1.0), Value::new(2, 2.0)]);
        assert!(history.is_full());
        assert_eq!(timestamps(&history), vec![1, 2]);
    }

    #[test]
    fn test_clear() {
        let mut history = History::new(2);
        fill(&mut history, 5);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 2);
        fill(&mut history, 1);
        assert_eq!(timestamps(&history), vec![1000]);
    }
}
