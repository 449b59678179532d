// Ranges of candidate plaintexts.

use num_bigint::BigUint;

/// A closed range `[low, high]` of integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub low: BigUint,
    pub high: BigUint,
}

impl Interval {
    pub fn new(low: BigUint, high: BigUint) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, x: &BigUint) -> bool {
        &self.low <= x && x <= &self.high
    }

    /// Whether the interval holds exactly one value.
    pub fn is_point(&self) -> bool {
        self.low == self.high
    }
}

/// An unordered set of intervals. Overlapping intervals are kept apart;
/// only exact duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `interval`, returning false if it was already present.
    pub fn insert(&mut self, interval: Interval) -> bool {
        if self.intervals.contains(&interval) {
            return false;
        }
        self.intervals.push(interval);
        true
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    /// Whether any interval contains `x`.
    pub fn contains(&self, x: &BigUint) -> bool {
        self.intervals.iter().any(|interval| interval.contains(x))
    }

    /// The only interval, if there is exactly one.
    pub fn single(&self) -> Option<&Interval> {
        match self.intervals.as_slice() {
            [interval] => Some(interval),
            _ => None,
        }
    }
}

impl From<Interval> for IntervalSet {
    fn from(interval: Interval) -> Self {
        Self {
            intervals: vec![interval],
        }
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
