//! Word selection and the per-presentation attempt state machine.
//!
//! A presentation starts with a number of regular attempts. Once those run
//! out it escalates into hint mode, where every miss raises the hint level.
//! When the hint attempts run out too, the presentation fails and the user has
//! to retype the answer before moving on. A word's counters change once per
//! presentation, never per attempt.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::hint::{hint, MAX_HINT_LEVEL};
use crate::session::DrillSession;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// Case-insensitive exact match, ignoring surrounding whitespace in `typed`
pub fn classify(typed: &str, correct: &str) -> Outcome {
    if typed.trim().to_lowercase() == correct.to_lowercase() {
        Outcome::Correct
    } else {
        Outcome::Incorrect
    }
}

/// Attempt budgets and mastery threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrillPolicy {
    pub mastery_threshold: u32,
    pub regular_attempts: u32,
    pub hint_attempts: u32,
    pub max_hint_level: u8,
}

impl DrillPolicy {
    /// Clamps values so a presentation always has at least one attempt
    pub fn new(
        mastery_threshold: u32,
        regular_attempts: u32,
        hint_attempts: u32,
        max_hint_level: u8,
    ) -> Self {
        Self {
            mastery_threshold: mastery_threshold.max(1),
            regular_attempts: regular_attempts.max(1),
            hint_attempts,
            max_hint_level: max_hint_level.clamp(1, MAX_HINT_LEVEL),
        }
    }
}

impl Default for DrillPolicy {
    fn default() -> Self {
        Self::new(2, 3, 3, MAX_HINT_LEVEL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Regular { remaining: u32 },
    Hinted { level: u8, remaining: u32 },
    /// Failed; waiting for the user to retype the answer
    Confirm,
    Finished,
}

/// One word on offer, from selection to final outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    index: usize,
    word: String,
    phase: Phase,
    attempts: u32,
    hint: Option<String>,
    max_level_shown: u8,
}

impl Presentation {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Scored attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Hint currently on display, if any
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn max_level_shown(&self) -> u8 {
        self.max_level_shown
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
}

/// What happened to a submitted answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Correct {
        hinted: bool,
        /// The word became mastered with this answer
        mastered: bool,
        streak: u32,
    },
    /// Regular miss; the word is repeated
    Retry { remaining: u32 },
    /// Hinted attempt; `escalated` is set when regular attempts just ran out
    Hint {
        level: u8,
        hint: String,
        remaining: u32,
        escalated: bool,
    },
    /// Out of attempts; the answer must be retyped
    Failed,
    Confirmed,
    RetypeRequired,
    Ignored,
}

pub struct DrillEngine<R: Rng = StdRng> {
    policy: DrillPolicy,
    rng: R,
}

impl<R: Rng> DrillEngine<R> {
    pub fn with_rng(policy: DrillPolicy, rng: R) -> Self {
        Self { policy, rng }
    }

    /// Pick a random unmastered word, or None when every word is mastered
    pub fn next_word(&mut self, session: &mut DrillSession) -> Option<Presentation> {
        let active = session.active_indices();
        let index = *active.choose(&mut self.rng)?;
        let record = session.record_mut(index)?;
        record.presented = true;
        debug!(word = record.text(), "presenting");

        Some(Presentation {
            index,
            word: record.text().to_string(),
            phase: Phase::Regular {
                remaining: self.policy.regular_attempts,
            },
            attempts: 0,
            hint: None,
            max_level_shown: 0,
        })
    }

    pub fn submit_attempt(
        &mut self,
        session: &mut DrillSession,
        presentation: &mut Presentation,
        typed: &str,
    ) -> Verdict {
        let outcome = classify(typed, &presentation.word);

        match presentation.phase {
            Phase::Finished => Verdict::Ignored,
            Phase::Confirm => match outcome {
                Outcome::Correct => {
                    presentation.phase = Phase::Finished;
                    Verdict::Confirmed
                }
                Outcome::Incorrect => Verdict::RetypeRequired,
            },
            Phase::Regular { remaining } => {
                presentation.attempts += 1;
                match outcome {
                    Outcome::Correct => self.succeed(session, presentation, false),
                    Outcome::Incorrect if remaining > 1 => {
                        let remaining = remaining - 1;
                        presentation.phase = Phase::Regular { remaining };
                        Verdict::Retry { remaining }
                    }
                    Outcome::Incorrect => {
                        if self.policy.hint_attempts == 0 {
                            return self.fail(session, presentation);
                        }
                        let remaining = self.policy.hint_attempts;
                        self.show_hint(presentation, 1, remaining, true)
                    }
                }
            }
            Phase::Hinted { level, remaining } => {
                presentation.attempts += 1;
                match outcome {
                    Outcome::Correct => self.succeed(session, presentation, true),
                    Outcome::Incorrect if remaining > 1 => {
                        let level = (level + 1).min(self.policy.max_hint_level);
                        self.show_hint(presentation, level, remaining - 1, false)
                    }
                    Outcome::Incorrect => self.fail(session, presentation),
                }
            }
        }
    }

    /// Give up on a presentation that could not be spoken: one incorrect
    /// attempt, streak untouched.
    pub fn forfeit(&mut self, session: &mut DrillSession, presentation: &mut Presentation) {
        if presentation.is_finished() {
            return;
        }
        if let Some(record) = session.record_mut(presentation.index) {
            record.incorrect_count += 1;
        }
        presentation.phase = Phase::Finished;
    }

    fn show_hint(
        &mut self,
        presentation: &mut Presentation,
        level: u8,
        remaining: u32,
        escalated: bool,
    ) -> Verdict {
        let masked = hint(&presentation.word, level, &mut self.rng);
        presentation.phase = Phase::Hinted { level, remaining };
        presentation.hint = Some(masked.clone());
        presentation.max_level_shown = presentation.max_level_shown.max(level);
        Verdict::Hint {
            level,
            hint: masked,
            remaining,
            escalated,
        }
    }

    fn succeed(
        &mut self,
        session: &mut DrillSession,
        presentation: &mut Presentation,
        hinted: bool,
    ) -> Verdict {
        presentation.phase = Phase::Finished;
        presentation.hint = None;
        session.streak += 1;
        let streak = session.streak;

        let threshold = self.policy.mastery_threshold;
        let mut mastered = false;
        if let Some(record) = session.record_mut(presentation.index) {
            record.correct_count += 1;
            if !record.mastered && record.correct_count >= threshold {
                record.mastered = true;
                mastered = true;
            }
        }

        Verdict::Correct {
            hinted,
            mastered,
            streak,
        }
    }

    fn fail(&mut self, session: &mut DrillSession, presentation: &mut Presentation) -> Verdict {
        presentation.phase = Phase::Confirm;
        session.streak = 0;
        if let Some(record) = session.record_mut(presentation.index) {
            record.incorrect_count += 1;
        }
        Verdict::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn session(words: &[&str]) -> DrillSession {
        DrillSession::new(words.iter().map(|w| w.to_string()).collect()).unwrap()
    }

    fn engine(policy: DrillPolicy) -> DrillEngine<StdRng> {
        DrillEngine::with_rng(policy, StdRng::seed_from_u64(3))
    }

    /// Draw presentations until `word` comes up
    fn present(
        engine: &mut DrillEngine<StdRng>,
        session: &mut DrillSession,
        word: &str,
    ) -> Presentation {
        for _ in 0..1000 {
            let p = engine.next_word(session).expect("word available");
            if p.word() == word {
                return p;
            }
        }
        panic!("{word} never selected");
    }

    #[test]
    fn classify_ignores_case_and_padding() {
        assert_eq!(classify("CaT", "cat"), Outcome::Correct);
        assert_eq!(classify("  cat \n", "Cat"), Outcome::Correct);
        assert_eq!(classify("cats", "cat"), Outcome::Incorrect);
        assert_eq!(classify("", "cat"), Outcome::Incorrect);
    }

    #[test]
    fn next_word_marks_presented() {
        let mut s = session(&["cat"]);
        let mut e = engine(DrillPolicy::default());
        let p = e.next_word(&mut s).unwrap();
        assert_eq!(p.word(), "cat");
        assert_eq!(p.phase(), Phase::Regular { remaining: 3 });
        assert!(s.records()[0].presented);
    }

    #[test]
    fn next_word_is_none_when_all_mastered() {
        let mut s = session(&["cat"]);
        s.record_mut(0).unwrap().mastered = true;
        let mut e = engine(DrillPolicy::default());
        assert!(e.next_word(&mut s).is_none());
    }

    #[test]
    fn next_word_reaches_every_active_word() {
        let mut s = session(&["a", "b", "c", "d"]);
        let mut e = engine(DrillPolicy::default());
        let seen: HashSet<String> = (0..200)
            .map(|_| e.next_word(&mut s).unwrap().word().to_string())
            .collect();
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn correct_first_try_counts_once() {
        let mut s = session(&["cat"]);
        let mut e = engine(DrillPolicy::default());
        let mut p = e.next_word(&mut s).unwrap();
        let v = e.submit_attempt(&mut s, &mut p, "cat");
        assert_eq!(
            v,
            Verdict::Correct {
                hinted: false,
                mastered: false,
                streak: 1
            }
        );
        assert_eq!(s.records()[0].correct_count, 1);
        assert!(p.is_finished());
        assert_eq!(e.submit_attempt(&mut s, &mut p, "cat"), Verdict::Ignored);
        assert_eq!(s.records()[0].correct_count, 1);
    }

    #[test]
    fn mastery_after_threshold_and_not_before() {
        for threshold in 1..=4 {
            let mut s = session(&["cat"]);
            let mut e = engine(DrillPolicy::new(threshold, 3, 3, 3));
            for n in 1..=threshold {
                let mut p = e.next_word(&mut s).unwrap();
                let v = e.submit_attempt(&mut s, &mut p, "cat");
                let expect_mastered = n == threshold;
                assert_matches!(v, Verdict::Correct { mastered, .. } if mastered == expect_mastered);
                assert_eq!(s.records()[0].mastered, expect_mastered);
            }
            assert!(e.next_word(&mut s).is_none());
        }
    }

    #[test]
    fn mastered_word_never_selected_again() {
        let mut s = session(&["cat", "dog"]);
        let mut e = engine(DrillPolicy::default());
        for _ in 0..2 {
            let mut p = present(&mut e, &mut s, "cat");
            e.submit_attempt(&mut s, &mut p, "cat");
        }
        assert!(s.records()[0].mastered);
        for _ in 0..50 {
            let p = e.next_word(&mut s).unwrap();
            assert_eq!(p.word(), "dog");
        }
        assert!(!s.records()[1].mastered);
    }

    #[test]
    fn regular_misses_then_hint_escalation_then_failure() {
        let mut s = session(&["cat"]);
        s.streak = 5;
        let mut e = engine(DrillPolicy::default());
        let mut p = e.next_word(&mut s).unwrap();

        assert_eq!(
            e.submit_attempt(&mut s, &mut p, "kat"),
            Verdict::Retry { remaining: 2 }
        );
        assert_eq!(
            e.submit_attempt(&mut s, &mut p, "kat"),
            Verdict::Retry { remaining: 1 }
        );
        assert_matches!(
            e.submit_attempt(&mut s, &mut p, "kat"),
            Verdict::Hint { level: 1, remaining: 3, escalated: true, ref hint } if hint == "_ _ _"
        );
        assert_matches!(
            e.submit_attempt(&mut s, &mut p, "kat"),
            Verdict::Hint { level: 2, remaining: 2, escalated: false, ref hint } if hint == "c _ t"
        );
        assert_matches!(
            e.submit_attempt(&mut s, &mut p, "kat"),
            Verdict::Hint { level: 3, remaining: 1, .. }
        );
        assert_eq!(s.records()[0].incorrect_count, 0);
        assert_eq!(e.submit_attempt(&mut s, &mut p, "kat"), Verdict::Failed);

        assert_eq!(s.records()[0].incorrect_count, 1);
        assert_eq!(s.records()[0].correct_count, 0);
        assert_eq!(s.streak, 0);
        assert_eq!(p.phase(), Phase::Confirm);
        assert_eq!(p.attempts(), 6);
        assert_eq!(p.max_level_shown(), 3);
    }

    #[test]
    fn failed_presentation_requires_retyping() {
        let mut s = session(&["cat"]);
        let mut e = engine(DrillPolicy::new(2, 1, 1, 3));
        let mut p = e.next_word(&mut s).unwrap();
        assert_matches!(e.submit_attempt(&mut s, &mut p, "x"), Verdict::Hint { .. });
        assert_eq!(e.submit_attempt(&mut s, &mut p, "x"), Verdict::Failed);
        assert_eq!(e.submit_attempt(&mut s, &mut p, "cot"), Verdict::RetypeRequired);
        assert_eq!(e.submit_attempt(&mut s, &mut p, "CAT"), Verdict::Confirmed);
        assert!(p.is_finished());
        assert_eq!(s.records()[0].incorrect_count, 1);
        assert_eq!(s.records()[0].correct_count, 0);
    }

    #[test]
    fn hinted_success_counts_as_correct() {
        let mut s = session(&["cat"]);
        let mut e = engine(DrillPolicy::new(1, 1, 3, 3));
        let mut p = e.next_word(&mut s).unwrap();
        assert_matches!(e.submit_attempt(&mut s, &mut p, "x"), Verdict::Hint { .. });
        assert_eq!(
            e.submit_attempt(&mut s, &mut p, "cat"),
            Verdict::Correct {
                hinted: true,
                mastered: true,
                streak: 1
            }
        );
        assert_eq!(s.records()[0].correct_count, 1);
        assert_eq!(s.records()[0].incorrect_count, 0);
        assert_eq!(p.hint(), None);
    }

    #[test]
    fn hint_level_is_capped() {
        let mut s = session(&["elephant"]);
        let mut e = engine(DrillPolicy::new(2, 1, 5, 2));
        let mut p = e.next_word(&mut s).unwrap();
        let levels: Vec<u8> = (0..4)
            .map(|_| match e.submit_attempt(&mut s, &mut p, "x") {
                Verdict::Hint { level, .. } => level,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(levels, vec![1, 2, 2, 2]);
    }

    #[test]
    fn zero_hint_attempts_fails_straight_away() {
        let mut s = session(&["cat"]);
        let mut e = engine(DrillPolicy::new(2, 2, 0, 3));
        let mut p = e.next_word(&mut s).unwrap();
        assert_eq!(
            e.submit_attempt(&mut s, &mut p, "x"),
            Verdict::Retry { remaining: 1 }
        );
        assert_eq!(e.submit_attempt(&mut s, &mut p, "x"), Verdict::Failed);
        assert_eq!(s.records()[0].incorrect_count, 1);
    }

    #[test]
    fn streak_grows_and_resets() {
        let mut s = session(&["cat", "dog"]);
        let mut e = engine(DrillPolicy::new(10, 1, 0, 3));
        for expected in 1..=3 {
            let mut p = e.next_word(&mut s).unwrap();
            let word = p.word().to_string();
            assert_matches!(
                e.submit_attempt(&mut s, &mut p, &word),
                Verdict::Correct { streak, .. } if streak == expected
            );
        }
        let mut p = e.next_word(&mut s).unwrap();
        assert_eq!(e.submit_attempt(&mut s, &mut p, "zzz"), Verdict::Failed);
        assert_eq!(s.streak, 0);
    }

    #[test]
    fn forfeit_counts_one_miss_and_keeps_streak() {
        let mut s = session(&["cat"]);
        s.streak = 4;
        let mut e = engine(DrillPolicy::default());
        let mut p = e.next_word(&mut s).unwrap();
        e.forfeit(&mut s, &mut p);
        e.forfeit(&mut s, &mut p);
        assert_eq!(s.records()[0].incorrect_count, 1);
        assert_eq!(s.streak, 4);
        assert!(p.is_finished());
    }

    #[test]
    fn policy_clamps_degenerate_values() {
        let p = DrillPolicy::new(0, 0, 0, 0);
        assert_eq!(p.mastery_threshold, 1);
        assert_eq!(p.regular_attempts, 1);
        assert_eq!(p.max_hint_level, 1);
        assert_eq!(DrillPolicy::new(2, 3, 3, 9).max_hint_level, 3);
    }
}
