//! Reference points: one concrete use or definition of a temp.

use std::fmt;
use std::ops::RangeInclusive;

use crate::tac::{SeqId, TempId};

/// A `(position, temp)` pair, ordered by temp and then position.
///
/// Field order matters: the derived ordering groups all points of one temp
/// together, so the next definition of a temp is its successor in a sorted
/// definition set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefPoint {
    pub temp: TempId,
    pub pos: SeqId,
}

impl RefPoint {
    pub fn new(pos: SeqId, temp: TempId) -> Self {
        Self { temp, pos }
    }

    /// Points of `temp` with position in `(after, upto]`.
    pub fn span(temp: TempId, after: SeqId, upto: SeqId) -> RangeInclusive<RefPoint> {
        RefPoint::new(after.succ(), temp)..=RefPoint::new(upto, temp)
    }

    /// Every point of `temp`.
    pub fn all_of(temp: TempId) -> RangeInclusive<RefPoint> {
        RefPoint::new(SeqId(0), temp)..=RefPoint::new(SeqId::MAX, temp)
    }
}

impl fmt::Display for RefPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.pos, self.temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_ordered_by_temp_then_position() {
        let a = RefPoint::new(SeqId(9), TempId(0));
        let b = RefPoint::new(SeqId(1), TempId(1));
        let c = RefPoint::new(SeqId(3), TempId(1));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_span_is_half_open_on_the_left() {
        let t = TempId(2);
        let set: BTreeSet<_> = [1, 2, 5, 7]
            .into_iter()
            .map(|p| RefPoint::new(SeqId(p), t))
            .chain([RefPoint::new(SeqId(3), TempId(1))])
            .collect();
        let hits: Vec<u32> = set
            .range(RefPoint::span(t, SeqId(2), SeqId(7)))
            .map(|p| p.pos.0)
            .collect();
        assert_eq!(hits, vec![5, 7]);
        assert_eq!(set.range(RefPoint::all_of(t)).count(), 4);
    }
}
