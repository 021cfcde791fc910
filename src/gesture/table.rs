//! Finger pattern to servo angle lookup
//!
//! The calibration is a literal enumeration of hand-picked angle vectors, one
//! per finger pattern seen during calibration. Patterns that are not listed
//! drive every servo to neutral.

use std::collections::HashMap;

use super::{FingerState, ServoAngles};

/// Built-in calibration in definition order, `(fingers, angles)`.
///
/// `10010` and `01101` are each defined twice; the later row wins.
pub const CALIBRATION: [([u8; 5], [u8; 5]); 31] = [
    ([0, 0, 0, 0, 0], [0, 0, 0, 0, 0]),
    ([0, 1, 0, 0, 0], [90, 0, 0, 0, 0]),
    ([0, 0, 1, 0, 0], [0, 90, 0, 0, 0]),
    ([0, 0, 0, 1, 0], [0, 0, 90, 0, 0]),
    ([0, 0, 0, 0, 1], [0, 0, 0, 90, 0]),
    ([1, 0, 0, 0, 0], [0, 0, 0, 0, 90]),
    ([0, 1, 1, 0, 0], [90, 90, 0, 0, 0]),
    ([0, 1, 0, 1, 0], [90, 0, 90, 0, 0]),
    ([0, 1, 0, 0, 1], [90, 0, 0, 90, 0]),
    ([1, 0, 0, 1, 0], [0, 0, 90, 0, 90]),
    ([0, 0, 1, 1, 0], [0, 90, 90, 0, 90]),
    ([0, 0, 1, 0, 1], [0, 90, 0, 90, 0]),
    ([1, 0, 1, 0, 0], [0, 90, 0, 0, 90]),
    ([0, 0, 0, 1, 1], [0, 0, 90, 90, 0]),
    ([1, 0, 0, 1, 0], [0, 0, 90, 0, 90]),
    ([1, 0, 0, 0, 1], [0, 0, 0, 90, 90]),
    ([0, 1, 1, 1, 0], [90, 90, 90, 0, 0]),
    ([0, 1, 1, 1, 1], [90, 90, 90, 90, 0]),
    ([0, 0, 1, 1, 1], [0, 90, 90, 90, 0]),
    ([1, 1, 1, 1, 1], [90, 90, 90, 90, 90]),
    ([1, 1, 1, 1, 0], [90, 90, 90, 90, 0]),
    ([1, 1, 1, 0, 1], [90, 90, 90, 0, 90]),
    ([1, 1, 0, 1, 1], [90, 90, 0, 90, 90]),
    ([1, 0, 1, 1, 1], [90, 0, 90, 90, 90]),
    ([0, 1, 1, 0, 1], [90, 90, 90, 0, 90]),
    ([1, 1, 0, 1, 0], [90, 90, 0, 90, 0]),
    ([1, 0, 1, 0, 1], [90, 0, 90, 0, 90]),
    ([0, 1, 0, 1, 1], [90, 90, 0, 90, 90]),
    ([1, 1, 1, 0, 0], [90, 90, 90, 0, 0]),
    ([1, 1, 0, 0, 0], [90, 0, 0, 0, 90]),
    ([0, 1, 1, 0, 1], [90, 90, 0, 90, 0]),
];

/// A key defined more than once while building a table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DuplicateKey {
    pub fingers: FingerState,
    /// Value that was replaced
    pub previous: ServoAngles,
    /// Value that was kept
    pub replacement: ServoAngles,
}

impl DuplicateKey {
    /// True when the two definitions disagree
    pub fn is_conflict(&self) -> bool {
        self.previous != self.replacement
    }
}

/// Read-only finger pattern lookup
#[derive(Clone, Debug)]
pub struct AngleTable {
    entries: HashMap<FingerState, ServoAngles>,
}

impl AngleTable {
    /// Build a table from ordered entries, reporting duplicate keys.
    ///
    /// Later entries overwrite earlier ones with the same key.
    pub fn with_duplicates<I>(entries: I) -> (Self, Vec<DuplicateKey>)
    where
        I: IntoIterator<Item = (FingerState, ServoAngles)>,
    {
        let mut map = HashMap::new();
        let mut duplicates = Vec::new();

        for (fingers, angles) in entries {
            if let Some(previous) = map.insert(fingers, angles) {
                duplicates.push(DuplicateKey {
                    fingers,
                    previous,
                    replacement: angles,
                });
            }
        }

        (Self { entries: map }, duplicates)
    }

    /// Build a table from ordered entries, logging any duplicate keys
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (FingerState, ServoAngles)>,
    {
        let (table, duplicates) = Self::with_duplicates(entries);

        for dup in &duplicates {
            if dup.is_conflict() {
                log::warn!(
                    "Finger pattern {} defined twice: {} replaced by {}",
                    dup.fingers,
                    dup.previous,
                    dup.replacement
                );
            } else {
                log::debug!("Finger pattern {} defined twice with {}", dup.fingers, dup.previous);
            }
        }

        table
    }

    /// The built-in calibration
    pub fn calibrated() -> Self {
        Self::from_entries(CALIBRATION.iter().map(|(fingers, angles)| {
            (FingerState::from_flags(*fingers), ServoAngles::new(*angles))
        }))
    }

    /// Angles for a finger pattern, neutral if the pattern is unknown
    pub fn lookup(&self, fingers: FingerState) -> ServoAngles {
        self.entries
            .get(&fingers)
            .copied()
            .unwrap_or(ServoAngles::NEUTRAL)
    }

    pub fn contains(&self, fingers: FingerState) -> bool {
        self.entries.contains_key(&fingers)
    }

    /// Number of distinct finger patterns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AngleTable {
    fn default() -> Self {
        Self::calibrated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::MAX_ANGLE;

    fn state(flags: [u8; 5]) -> FingerState {
        FingerState::from_flags(flags)
    }

    #[test]
    fn test_reference_patterns() {
        let table = AngleTable::calibrated();
        assert_eq!(table.lookup(state([0, 0, 0, 0, 0])), ServoAngles::new([0, 0, 0, 0, 0]));
        assert_eq!(table.lookup(state([1, 1, 1, 1, 1])), ServoAngles::new([90, 90, 90, 90, 90]));
        assert_eq!(table.lookup(state([0, 1, 0, 0, 0])), ServoAngles::new([90, 0, 0, 0, 0]));
        assert_eq!(table.lookup(state([1, 0, 0, 0, 0])), ServoAngles::new([0, 0, 0, 0, 90]));
    }

    #[test]
    fn test_every_key_resolves_to_last_definition() {
        let table = AngleTable::calibrated();
        let mut expected: HashMap<[u8; 5], [u8; 5]> = HashMap::new();
        for (fingers, angles) in CALIBRATION {
            expected.insert(fingers, angles);
        }

        assert_eq!(table.len(), expected.len());
        assert_eq!(table.len(), 29);
        for (fingers, angles) in expected {
            assert_eq!(
                table.lookup(state(fingers)),
                ServoAngles::new(angles),
                "{:?}",
                fingers
            );
        }
    }

    #[test]
    fn test_unknown_pattern_is_neutral() {
        let table = AngleTable::calibrated();
        let all = (0u8..32).map(|bits| {
            state([bits >> 4 & 1, bits >> 3 & 1, bits >> 2 & 1, bits >> 1 & 1, bits & 1])
        });

        let missing: Vec<FingerState> = all.filter(|s| !table.contains(*s)).collect();
        assert_eq!(missing.len(), 3);
        for fingers in missing {
            assert_eq!(table.lookup(fingers), ServoAngles::NEUTRAL);
        }
    }

    #[test]
    fn test_lookup_is_repeatable() {
        let table = AngleTable::calibrated();
        let fingers = state([1, 0, 1, 0, 1]);
        let first = table.lookup(fingers);
        assert_eq!(table.lookup(fingers), first);
        assert_eq!(first, ServoAngles::new([90, 0, 90, 0, 90]));
    }

    #[test]
    fn test_duplicate_keys() {
        let entries = CALIBRATION
            .iter()
            .map(|(f, a)| (FingerState::from_flags(*f), ServoAngles::new(*a)));
        let (table, duplicates) = AngleTable::with_duplicates(entries);

        assert_eq!(duplicates.len(), 2);
        let conflicts: Vec<&DuplicateKey> = duplicates.iter().filter(|d| d.is_conflict()).collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].fingers, state([0, 1, 1, 0, 1]));
        assert_eq!(conflicts[0].previous, ServoAngles::new([90, 90, 90, 0, 90]));

        assert_eq!(table.lookup(state([0, 1, 1, 0, 1])), ServoAngles::new([90, 90, 0, 90, 0]));
        assert_eq!(table.lookup(state([1, 0, 0, 1, 0])), ServoAngles::new([0, 0, 90, 0, 90]));
    }

    #[test]
    fn test_calibration_within_range() {
        for (_, angles) in CALIBRATION {
            assert!(angles.iter().all(|&a| a <= MAX_ANGLE));
        }
    }
}
