use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::SessionError;
use crate::gamification::{self, LevelInfo, QuizOutcome, SessionProgress};
use crate::models::{Answer, Flashcard, QuizQuestion, StudyGuide};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub timed_mode: bool,
    /// Whole-quiz limit when timed mode is on
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizResult {
    pub correct: usize,
    pub total: usize,
    pub score_percent: u32,
    /// Per question: whether the selected answer was right (`false` when unanswered)
    pub per_question: Vec<bool>,
    pub submitted_at: DateTime<Utc>,
    pub auto_submitted: bool,
    pub outcome: QuizOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizState {
    pub questions: Vec<QuizQuestion>,
    pub answers: BTreeMap<usize, Answer>,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub time_limit: Option<Duration>,
    pub result: Option<QuizResult>,
}

impl QuizState {
    fn new(questions: Vec<QuizQuestion>, time_limit: Option<Duration>, now: DateTime<Utc>) -> Self {
        Self {
            questions,
            answers: BTreeMap::new(),
            started_at: now,
            time_limit,
            result: None,
        }
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.time_limit
            .map(|limit| (self.started_at + limit - now).max(Duration::zero()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlashcardDeck {
    pub cards: Vec<Flashcard>,
    pub flipped: BTreeSet<usize>,
    pub reviewed: BTreeSet<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimerStatus {
    pub timed: bool,
    pub remaining_seconds: Option<i64>,
    pub expired: bool,
    pub submitted: bool,
}

/// All state one user accumulates between Generate actions
#[derive(Debug, Clone, Serialize)]
pub struct StudySession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub topic: Option<String>,
    pub quiz: Option<QuizState>,
    pub flashcards: Option<FlashcardDeck>,
    pub study_guide: Option<StudyGuide>,
    pub generation_errors: BTreeMap<String, String>,
    pub settings: SessionSettings,
    pub progress: SessionProgress,
}

impl StudySession {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_active: now,
            topic: None,
            quiz: None,
            flashcards: None,
            study_guide: None,
            generation_errors: BTreeMap::new(),
            settings: SessionSettings::default(),
            progress: SessionProgress::default(),
        }
    }

    pub fn level(&self) -> LevelInfo {
        gamification::level_for_xp(self.progress.xp)
    }

    /// Drops every artifact from the previous Generate action
    pub fn begin_generation(&mut self, topic: &str) {
        self.topic = Some(topic.trim().to_string());
        self.quiz = None;
        self.flashcards = None;
        self.study_guide = None;
        self.generation_errors.clear();
    }

    pub fn set_quiz(&mut self, questions: Vec<QuizQuestion>, now: DateTime<Utc>) {
        let time_limit = if self.settings.timed_mode {
            self.settings
                .time_limit_minutes
                .map(|m| Duration::minutes(i64::from(m)))
        } else {
            None
        };
        self.quiz = Some(QuizState::new(questions, time_limit, now));
    }

    pub fn set_flashcards(&mut self, cards: Vec<Flashcard>) {
        self.flashcards = Some(FlashcardDeck {
            cards,
            flipped: BTreeSet::new(),
            reviewed: BTreeSet::new(),
        });
    }

    pub fn set_study_guide(&mut self, guide: StudyGuide) {
        self.study_guide = Some(guide);
    }

    pub fn record_generation_error(&mut self, slot: &str, message: String) {
        self.generation_errors.insert(slot.to_string(), message);
    }

    pub fn select_answer(&mut self, index: usize, answer: Answer) -> Result<(), SessionError> {
        let quiz = self.quiz.as_mut().ok_or(SessionError::NoQuiz)?;
        if quiz.result.is_some() {
            return Err(SessionError::AlreadySubmitted);
        }
        let len = quiz.questions.len();
        let question = quiz
            .questions
            .get(index)
            .ok_or(SessionError::QuestionOutOfRange { index, len })?;
        if !question.accepts_kind(&answer) {
            return Err(SessionError::AnswerKindMismatch(index));
        }
        quiz.answers.insert(index, answer);
        Ok(())
    }

    /// Grades the quiz on first call; later calls return the stored result unchanged.
    pub fn submit_quiz(&mut self, now: DateTime<Utc>) -> Result<QuizResult, SessionError> {
        self.submit(now, false)
    }

    fn submit(&mut self, now: DateTime<Utc>, auto_submitted: bool) -> Result<QuizResult, SessionError> {
        let quiz = self.quiz.as_mut().ok_or(SessionError::NoQuiz)?;
        if let Some(result) = &quiz.result {
            return Ok(result.clone());
        }

        let per_question: Vec<bool> = quiz
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| quiz.answers.get(&i).is_some_and(|a| q.is_correct(a)))
            .collect();
        let total = per_question.len();
        let correct = per_question.iter().filter(|c| **c).count();
        let score_percent = score_percent(correct, total);

        let outcome = gamification::record_quiz(
            &mut self.progress,
            correct as u32,
            total as u32,
            score_percent,
            now.date_naive(),
        );

        let result = QuizResult {
            correct,
            total,
            score_percent,
            per_question,
            submitted_at: now,
            auto_submitted,
            outcome,
        };
        quiz.result = Some(result.clone());
        Ok(result)
    }

    /// Polled by the client; auto-submits once the time limit has passed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TimerStatus, SessionError> {
        let quiz = self.quiz.as_ref().ok_or(SessionError::NoQuiz)?;
        let remaining = quiz.remaining(now);
        let expired = remaining.is_some_and(|r| r <= Duration::zero());

        if expired && quiz.result.is_none() {
            debug!(session_id = %self.id, "Quiz time limit reached, auto-submitting");
            self.submit(now, true)?;
        }

        let submitted = self.quiz.as_ref().is_some_and(|q| q.result.is_some());
        Ok(TimerStatus {
            timed: remaining.is_some(),
            remaining_seconds: remaining.map(|r| r.num_seconds()),
            expired,
            submitted,
        })
    }

    pub fn set_flipped(&mut self, index: usize, flipped: bool, today: NaiveDate) -> Result<bool, SessionError> {
        let deck = self.flashcards.as_mut().ok_or(SessionError::NoFlashcards)?;
        let len = deck.cards.len();
        if index >= len {
            return Err(SessionError::CardOutOfRange { index, len });
        }

        if flipped {
            deck.flipped.insert(index);
            if deck.reviewed.insert(index) {
                self.progress.flashcards_reviewed += 1;
                gamification::record_study_day(&mut self.progress, today);
                gamification::check_achievements(&mut self.progress);
            }
        } else {
            deck.flipped.remove(&index);
        }
        Ok(flipped)
    }

    pub fn reset_progress(&mut self) {
        self.progress = SessionProgress::default();
    }
}

/// Integer percentage, halves rounded up (2 of 3 gives 67)
pub fn score_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct * 200 + total) / (total * 2)) as u32
}

/// In-memory session store with idle expiry
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, StudySession>>>,
    ttl_minutes: i64,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl_minutes,
        }
    }

    fn is_expired(&self, session: &StudySession, now: DateTime<Utc>) -> bool {
        now - session.last_active > Duration::minutes(self.ttl_minutes)
    }

    pub async fn create(&self) -> StudySession {
        let session = StudySession::new(Utc::now());
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session.clone());
        debug!("Created session {}, store size: {}", session.id, sessions.len());
        session
    }

    /// Snapshot of a live session; touching it extends its lifetime
    pub async fn get(&self, id: Uuid) -> Option<StudySession> {
        self.with_session_mut(id, |session| session.clone()).await
    }

    /// Runs `f` under the write lock. Keep network calls out of `f`.
    pub async fn with_session_mut<R>(&self, id: Uuid, f: impl FnOnce(&mut StudySession) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();

        let expired = match sessions.get(&id) {
            Some(session) => self.is_expired(session, now),
            None => return None,
        };
        if expired {
            debug!("Session {} expired, removing", id);
            sessions.remove(&id);
            return None;
        }

        let session = sessions.get_mut(&id)?;
        session.last_active = now;
        Some(f(session))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Purges idle sessions and returns how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }

    #[cfg(test)]
    async fn backdate(&self, id: Uuid, minutes: i64) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.last_active -= Duration::minutes(minutes);
        }
    }
}
