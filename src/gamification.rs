use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const XP_PER_CORRECT: u32 = 10;
pub const QUIZ_COMPLETION_BONUS: u32 = 20;
const FIRST_LEVEL_THRESHOLD: u32 = 100;

/// Counters accumulated over the life of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub xp: u32,
    pub quizzes_completed: u32,
    pub correct_answers: u32,
    pub total_answers: u32,
    pub flashcards_reviewed: u32,
    pub achievements: BTreeSet<String>,
    pub streak_days: u32,
    pub last_study_date: Option<NaiveDate>,
    pub last_score_percent: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub xp: u32,
    unlocked: fn(&SessionProgress) -> bool,
}

impl Achievement {
    pub fn is_unlocked(&self, progress: &SessionProgress) -> bool {
        (self.unlocked)(progress)
    }
}

impl Serialize for Achievement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Achievement", 4)?;
        state.serialize_field("key", self.key)?;
        state.serialize_field("name", self.name)?;
        state.serialize_field("description", self.description)?;
        state.serialize_field("xp", &self.xp)?;
        state.end()
    }
}

pub static ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        key: "first_quiz",
        name: "First Steps",
        description: "Complete your first quiz",
        xp: 10,
        unlocked: |p| p.quizzes_completed >= 1,
    },
    Achievement {
        key: "quiz_master_5",
        name: "Getting Serious",
        description: "Complete 5 quizzes",
        xp: 25,
        unlocked: |p| p.quizzes_completed >= 5,
    },
    Achievement {
        key: "quiz_master_10",
        name: "Quiz Master",
        description: "Complete 10 quizzes",
        xp: 50,
        unlocked: |p| p.quizzes_completed >= 10,
    },
    Achievement {
        key: "perfect_score",
        name: "Perfectionist",
        description: "Score 100% on a quiz",
        xp: 30,
        unlocked: |p| p.last_score_percent == Some(100),
    },
    Achievement {
        key: "streak_3",
        name: "On a Roll",
        description: "Study 3 days in a row",
        xp: 25,
        unlocked: |p| p.streak_days >= 3,
    },
    Achievement {
        key: "streak_7",
        name: "Week Warrior",
        description: "Study 7 days in a row",
        xp: 50,
        unlocked: |p| p.streak_days >= 7,
    },
    Achievement {
        key: "correct_50",
        name: "Sharp Mind",
        description: "Answer 50 questions correctly",
        xp: 40,
        unlocked: |p| p.correct_answers >= 50,
    },
    Achievement {
        key: "flashcards_20",
        name: "Card Shark",
        description: "Review 20 flashcards",
        xp: 20,
        unlocked: |p| p.flashcards_reviewed >= 20,
    },
];

pub fn find_achievement(key: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.key == key)
}

/// Awards every newly satisfied achievement exactly once and returns their keys.
pub fn check_achievements(progress: &mut SessionProgress) -> Vec<&'static str> {
    let mut awarded = Vec::new();
    for achievement in ACHIEVEMENTS {
        if progress.achievements.contains(achievement.key) || !achievement.is_unlocked(progress) {
            continue;
        }
        progress.achievements.insert(achievement.key.to_string());
        progress.xp = progress.xp.saturating_add(achievement.xp);
        awarded.push(achievement.key);
    }
    awarded
}

pub fn record_study_day(progress: &mut SessionProgress, today: NaiveDate) {
    progress.streak_days = match progress.last_study_date {
        Some(last) if last == today => progress.streak_days.max(1),
        Some(last) if last.succ_opt() == Some(today) => progress.streak_days + 1,
        _ => 1,
    };
    progress.last_study_date = Some(today);
}

/// Result of folding one graded quiz into the progress counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizOutcome {
    pub xp_gained: u32,
    pub new_achievements: Vec<String>,
    pub level: LevelInfo,
}

pub fn record_quiz(progress: &mut SessionProgress, correct: u32, total: u32, score_percent: u32, today: NaiveDate) -> QuizOutcome {
    let before = progress.xp;

    progress.quizzes_completed += 1;
    progress.correct_answers += correct;
    progress.total_answers += total;
    progress.last_score_percent = Some(score_percent);
    progress.xp = progress
        .xp
        .saturating_add(correct * XP_PER_CORRECT + QUIZ_COMPLETION_BONUS);
    record_study_day(progress, today);

    let new_achievements = check_achievements(progress)
        .into_iter()
        .map(str::to_string)
        .collect();

    QuizOutcome {
        xp_gained: progress.xp - before,
        new_achievements,
        level: level_for_xp(progress.xp),
    }
}

/// XP needed to leave `level` (1-based)
pub fn level_threshold(level: u32) -> u32 {
    let mut threshold = FIRST_LEVEL_THRESHOLD;
    for _ in 1..level.max(1) {
        // round(t * 1.5), halves rounding up
        threshold = (threshold * 3 + 1) / 2;
    }
    threshold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    pub xp_into_level: u32,
    pub xp_for_next: u32,
}

pub fn level_for_xp(xp: u32) -> LevelInfo {
    let mut level = 1;
    let mut remaining = xp;
    let mut threshold = level_threshold(1);
    while remaining >= threshold {
        remaining -= threshold;
        level += 1;
        threshold = level_threshold(level);
    }
    LevelInfo {
        level,
        xp_into_level: remaining,
        xp_for_next: threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_threshold(1), 100);
        assert_eq!(level_threshold(2), 150);
        assert_eq!(level_threshold(3), 225);
        assert_eq!(level_threshold(4), 338);
    }

    #[test]
    fn test_level_for_xp() {
        assert_eq!(level_for_xp(0).level, 1);
        assert_eq!(level_for_xp(99).level, 1);

        let info = level_for_xp(100);
        assert_eq!(info.level, 2);
        assert_eq!(info.xp_into_level, 0);
        assert_eq!(info.xp_for_next, 150);

        assert_eq!(level_for_xp(249).level, 2);
        assert_eq!(level_for_xp(250).level, 3);
        assert_eq!(level_for_xp(475).level, 4);
    }

    #[test]
    fn test_streak_rules() {
        let mut progress = SessionProgress::default();
        record_study_day(&mut progress, day(1));
        assert_eq!(progress.streak_days, 1);

        record_study_day(&mut progress, day(1));
        assert_eq!(progress.streak_days, 1);

        record_study_day(&mut progress, day(2));
        record_study_day(&mut progress, day(3));
        assert_eq!(progress.streak_days, 3);

        record_study_day(&mut progress, day(6));
        assert_eq!(progress.streak_days, 1);
        assert_eq!(progress.last_study_date, Some(day(6)));
    }

    #[test]
    fn test_achievements_are_idempotent() {
        let mut progress = SessionProgress {
            quizzes_completed: 1,
            ..Default::default()
        };

        let first = check_achievements(&mut progress);
        assert_eq!(first, vec!["first_quiz"]);
        let xp_after_first = progress.xp;

        let second = check_achievements(&mut progress);
        assert!(second.is_empty());
        assert_eq!(progress.xp, xp_after_first);
    }

    #[test]
    fn test_record_quiz_awards_xp() {
        let mut progress = SessionProgress::default();
        let outcome = record_quiz(&mut progress, 2, 3, 67, day(1));

        // 2 correct * 10 + 20 bonus + 10 for first_quiz
        assert_eq!(outcome.xp_gained, 50);
        assert_eq!(outcome.new_achievements, vec!["first_quiz".to_string()]);
        assert_eq!(progress.correct_answers, 2);
        assert_eq!(progress.total_answers, 3);
        assert_eq!(progress.streak_days, 1);
    }

    #[test]
    fn test_perfect_score_unlocks_once() {
        let mut progress = SessionProgress::default();
        let outcome = record_quiz(&mut progress, 3, 3, 100, day(1));
        assert!(outcome.new_achievements.contains(&"perfect_score".to_string()));

        let outcome = record_quiz(&mut progress, 3, 3, 100, day(1));
        assert!(outcome.new_achievements.is_empty());
        assert_eq!(outcome.xp_gained, 50);
    }

    #[test]
    fn test_registry_keys_are_unique() {
        let keys: BTreeSet<_> = ACHIEVEMENTS.iter().map(|a| a.key).collect();
        assert_eq!(keys.len(), ACHIEVEMENTS.len());
        assert!(find_achievement("streak_7").is_some());
        assert!(find_achievement("unknown").is_none());
    }
}
