use std::fmt;

use crate::TagRecord;

/// What happens to a file once its destination is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationOutcome {
    /// Nothing occupies the destination yet.
    Move,
    /// The candidate beats the current occupant and takes its place.
    Replace,
    /// The occupant stays; the candidate is left where it is.
    Skip,
    /// The filesystem refused; the source is untouched.
    Error(String),
}

impl fmt::Display for ArbitrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbitrationOutcome::Move => write!(f, "move"),
            ArbitrationOutcome::Replace => write!(f, "replace"),
            ArbitrationOutcome::Skip => write!(f, "skip"),
            ArbitrationOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// The rule that settled a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Nothing to compare against.
    Vacant,
    Bitrate,
    FileSize,
    FirstSeen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: ArbitrationOutcome,
    pub criterion: Criterion,
    pub explanation: String,
}

/// Picks which of two files bound for the same destination survives.
///
/// Higher bitrate wins; on equal bitrate the larger file wins; on a full tie
/// the occupant stays. This is a quality heuristic only: nothing here looks
/// at the audio itself. Because the occupant of a destination is always the
/// winner of every earlier comparison for it, pairwise decisions are enough
/// as files stream in.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateArbiter;

impl DuplicateArbiter {
    pub fn new() -> Self {
        Self
    }

    pub fn arbitrate(&self, candidate: &TagRecord, occupant: &TagRecord) -> ArbitrationOutcome {
        self.compare(candidate, occupant).outcome
    }

    /// `Move` when there is no occupant, otherwise the pairwise verdict.
    pub fn decide(&self, candidate: &TagRecord, occupant: Option<&TagRecord>) -> Decision {
        match occupant {
            None => Decision {
                outcome: ArbitrationOutcome::Move,
                criterion: Criterion::Vacant,
                explanation: String::new(),
            },
            Some(occupant) => self.compare(candidate, occupant),
        }
    }

    pub fn compare(&self, candidate: &TagRecord, occupant: &TagRecord) -> Decision {
        let verdict = |candidate_wins: bool| {
            if candidate_wins {
                ArbitrationOutcome::Replace
            } else {
                ArbitrationOutcome::Skip
            }
        };

        if candidate.bitrate != occupant.bitrate {
            return Decision {
                outcome: verdict(candidate.bitrate > occupant.bitrate),
                criterion: Criterion::Bitrate,
                explanation: format!(
                    "Bitrate difference: {} vs {} kbps",
                    candidate.bitrate, occupant.bitrate
                ),
            };
        }

        if candidate.file_size != occupant.file_size {
            let size1_mb = candidate.file_size as f64 / 1_048_576.0;
            let size2_mb = occupant.file_size as f64 / 1_048_576.0;
            return Decision {
                outcome: verdict(candidate.file_size > occupant.file_size),
                criterion: Criterion::FileSize,
                explanation: format!("Size difference: {:.2} MB vs {:.2} MB", size1_mb, size2_mb),
            };
        }

        Decision {
            outcome: ArbitrationOutcome::Skip,
            criterion: Criterion::FirstSeen,
            explanation: "Files are identical in size and bitrate, keeping the first one".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn record(name: &str, bitrate: u32, file_size: u64) -> TagRecord {
        TagRecord {
            title: Some("Song".into()),
            artist: Some("Art".into()),
            album_artist: None,
            album: Some("Alb".into()),
            bitrate,
            file_size,
            extension: ".mp3".into(),
            source_path: PathBuf::from(name),
            backend: "test",
        }
    }

    #[test]
    fn higher_bitrate_wins_regardless_of_size() {
        let arbiter = DuplicateArbiter::new();
        for (small, large) in [(1, 10_000_000), (10_000_000, 1), (5, 5)] {
            let better = record("better.mp3", 320, small);
            let worse = record("worse.mp3", 128, large);
            assert_eq!(arbiter.arbitrate(&better, &worse), ArbitrationOutcome::Replace);
            assert_eq!(arbiter.arbitrate(&worse, &better), ArbitrationOutcome::Skip);
        }
    }

    #[test]
    fn equal_bitrate_falls_through_to_size() {
        let arbiter = DuplicateArbiter::new();
        let big = record("big.mp3", 256, 9_000);
        let small = record("small.mp3", 256, 8_000);

        let decision = arbiter.compare(&big, &small);
        assert_eq!(decision.outcome, ArbitrationOutcome::Replace);
        assert_eq!(decision.criterion, Criterion::FileSize);
        assert_eq!(arbiter.arbitrate(&small, &big), ArbitrationOutcome::Skip);
    }

    #[test]
    fn full_tie_keeps_the_occupant_in_both_orders() {
        let arbiter = DuplicateArbiter::new();
        let first = record("first.mp3", 0, 4_096);
        let second = record("second.mp3", 0, 4_096);

        let decision = arbiter.compare(&second, &first);
        assert_eq!(decision.outcome, ArbitrationOutcome::Skip);
        assert_eq!(decision.criterion, Criterion::FirstSeen);
        assert_eq!(arbiter.arbitrate(&first, &second), ArbitrationOutcome::Skip);
    }

    #[test]
    fn unknown_bitrate_loses_to_known() {
        let arbiter = DuplicateArbiter::new();
        let unknown = record("unknown.mp3", 0, 50_000_000);
        let known = record("known.mp3", 96, 1_000);
        assert_eq!(arbiter.arbitrate(&known, &unknown), ArbitrationOutcome::Replace);
    }

    #[test]
    fn no_occupant_means_move() {
        let arbiter = DuplicateArbiter::new();
        let candidate = record("a.mp3", 128, 1);
        let vacant = arbiter.decide(&candidate, None);
        assert_eq!(vacant.outcome, ArbitrationOutcome::Move);
        assert_eq!(vacant.criterion, Criterion::Vacant);

        let occupied = arbiter.decide(&candidate, Some(&record("b.mp3", 320, 1)));
        assert_eq!(occupied.outcome, ArbitrationOutcome::Skip);
        assert_eq!(occupied.criterion, Criterion::Bitrate);
    }
}
