//! Scoring rule for answer outcomes. Scores only ever grow, so mastery is
//! monotonic: once a word crosses the threshold it stays learned.

/// Points awarded for a correct answer. Wrong answers award nothing.
pub const CORRECT_ANSWER_POINTS: u32 = 100;

/// Cumulative score at which a word counts as learned.
pub const MASTERY_THRESHOLD: u32 = 500;

pub fn score_delta(correct: bool) -> u32 {
    if correct {
        CORRECT_ANSWER_POINTS
    } else {
        0
    }
}

pub fn is_mastered(score: u32) -> bool {
    score >= MASTERY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_answer_awards_fixed_points() {
        assert_eq!(score_delta(true), CORRECT_ANSWER_POINTS);
    }

    #[test]
    fn wrong_answer_awards_nothing() {
        assert_eq!(score_delta(false), 0);
    }

    #[test]
    fn mastery_starts_exactly_at_threshold() {
        assert!(!is_mastered(MASTERY_THRESHOLD - 1));
        assert!(is_mastered(MASTERY_THRESHOLD));
        assert!(is_mastered(MASTERY_THRESHOLD + 1));
    }
}
