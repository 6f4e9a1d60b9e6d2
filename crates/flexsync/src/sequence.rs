//! Sequence-gap detection.
//!
//! Every stream carries a counter: the 4-bit VITA packet count for audio
//! and IQ, or a 32-bit frame index for panadapter and waterfall data. The
//! [`SequenceTracker`] classifies each received value against the next
//! expected one and applies the same policy everywhere: in-order values
//! advance, gaps are counted and jumped over, stale values are dropped.

/// How counter values wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulus {
    /// The 4-bit VITA packet count, 0..=15.
    Mod16,
    /// A frame index that only grows.
    Unbounded,
}

/// Classification of one received counter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// No value seen yet; the received value is adopted as expected.
    First,
    /// Exactly the expected value.
    InOrder,
    /// `lost` values were skipped.
    Gap { lost: u32 },
    /// Older than expected (duplicate or reordered).
    Stale,
}

/// Tracks the next expected counter value of one stream.
///
/// [`check`](Self::check) only classifies. Callers decide when to
/// [`advance`](Self::advance), since frame-index streams advance once per
/// completed frame rather than once per packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceTracker {
    modulus: Modulus,
    expected: Option<u32>,
}

impl SequenceTracker {
    pub fn new(modulus: Modulus) -> Self {
        SequenceTracker {
            modulus,
            expected: None,
        }
    }

    /// The next expected value, if any has been seen.
    pub fn expected(&self) -> Option<u32> {
        self.expected
    }

    /// Classify `received` and, for `First` and `Gap`, move expected to it.
    ///
    /// Stale values leave the tracker untouched.
    pub fn check(&mut self, received: u32) -> SequenceCheck {
        let received = self.wrap(received);
        let Some(expected) = self.expected else {
            self.expected = Some(received);
            return SequenceCheck::First;
        };

        match self.modulus {
            Modulus::Mod16 => {
                let distance = received.wrapping_sub(expected) & 0x0F;
                match distance {
                    0 => SequenceCheck::InOrder,
                    1..=7 => {
                        self.expected = Some(received);
                        SequenceCheck::Gap { lost: distance }
                    }
                    _ => SequenceCheck::Stale,
                }
            }
            Modulus::Unbounded => {
                if received == expected {
                    SequenceCheck::InOrder
                } else if received > expected {
                    self.expected = Some(received);
                    SequenceCheck::Gap {
                        lost: received - expected,
                    }
                } else {
                    SequenceCheck::Stale
                }
            }
        }
    }

    /// Move expected one past `current`.
    pub fn advance(&mut self, current: u32) {
        let next = match self.modulus {
            Modulus::Mod16 => (current + 1) & 0x0F,
            Modulus::Unbounded => current.wrapping_add(1),
        };
        self.expected = Some(next);
    }

    /// Forget all history; the next value is treated as the first.
    pub fn reset(&mut self) {
        self.expected = None;
    }

    fn wrap(&self, value: u32) -> u32 {
        match self.modulus {
            Modulus::Mod16 => value & 0x0F,
            Modulus::Unbounded => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed(tracker: &mut SequenceTracker, value: u32) -> SequenceCheck {
        let check = tracker.check(value);
        if check != SequenceCheck::Stale {
            tracker.advance(value);
        }
        check
    }

    #[test]
    fn in_order_mod16_wraps() {
        let mut t = SequenceTracker::new(Modulus::Mod16);
        assert_eq!(feed(&mut t, 14), SequenceCheck::First);
        assert_eq!(feed(&mut t, 15), SequenceCheck::InOrder);
        assert_eq!(feed(&mut t, 0), SequenceCheck::InOrder);
        assert_eq!(feed(&mut t, 1), SequenceCheck::InOrder);
        assert_eq!(t.expected(), Some(2));
    }

    #[test]
    fn gap_across_wrap() {
        let mut t = SequenceTracker::new(Modulus::Mod16);
        feed(&mut t, 14);
        assert_eq!(feed(&mut t, 2), SequenceCheck::Gap { lost: 3 });
        assert_eq!(t.expected(), Some(3));
    }

    #[test]
    fn stale_mod16_leaves_state() {
        let mut t = SequenceTracker::new(Modulus::Mod16);
        feed(&mut t, 5);
        feed(&mut t, 6);
        let before = t.clone();
        assert_eq!(t.check(5), SequenceCheck::Stale);
        assert_eq!(t, before);
    }

    #[test]
    fn unbounded_policy() {
        let mut t = SequenceTracker::new(Modulus::Unbounded);
        assert_eq!(feed(&mut t, 100), SequenceCheck::First);
        assert_eq!(feed(&mut t, 101), SequenceCheck::InOrder);
        assert_eq!(feed(&mut t, 105), SequenceCheck::Gap { lost: 3 });
        assert_eq!(t.check(50), SequenceCheck::Stale);
        assert_eq!(t.expected(), Some(106));
    }

    #[test]
    fn check_without_advance_repeats_in_order() {
        let mut t = SequenceTracker::new(Modulus::Unbounded);
        t.check(0);
        assert_eq!(t.check(0), SequenceCheck::InOrder);
        assert_eq!(t.check(0), SequenceCheck::InOrder);
    }

    #[test]
    fn reset_forgets_history() {
        let mut t = SequenceTracker::new(Modulus::Mod16);
        feed(&mut t, 3);
        t.reset();
        assert_eq!(t.check(9), SequenceCheck::First);
    }

    proptest! {
        #[test]
        fn mod16_distance_classification(expected in 0u32..16, received in 0u32..16) {
            let mut t = SequenceTracker::new(Modulus::Mod16);
            t.check(expected);
            let distance = (received + 16 - expected) % 16;
            let check = t.check(received);
            match distance {
                0 => prop_assert_eq!(check, SequenceCheck::InOrder),
                1..=7 => prop_assert_eq!(check, SequenceCheck::Gap { lost: distance }),
                _ => prop_assert_eq!(check, SequenceCheck::Stale),
            }
        }

        #[test]
        fn mod16_in_order_run_never_loses(start in 0u32..16, len in 1usize..64) {
            let mut t = SequenceTracker::new(Modulus::Mod16);
            for i in 0..len {
                let check = feed(&mut t, (start + i as u32) % 16);
                prop_assert!(matches!(check, SequenceCheck::First | SequenceCheck::InOrder));
            }
        }

        #[test]
        fn mod16_counts_single_drops(start in 0u32..16, drop_at in 1usize..20) {
            let mut t = SequenceTracker::new(Modulus::Mod16);
            let mut lost = 0;
            for i in 0..24usize {
                if i == drop_at {
                    continue;
                }
                if let SequenceCheck::Gap { lost: n } = feed(&mut t, (start + i as u32) % 16) {
                    lost += n;
                }
            }
            prop_assert_eq!(lost, 1);
        }
    }
}
