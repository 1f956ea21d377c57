use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::retry_queue::RetryQueue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordExample {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Content entity. Read-only to the engine apart from the global counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: i64,
    pub word: String,
    pub pronunciation: String,
    pub meaning: String,
    pub group_number: i64,
    pub story_mnemonic: String,
    pub etymology: String,
    pub category: String,
    pub difficulty_level: String,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub examples: Vec<WordExample>,
    pub tags: Vec<String>,
    pub total_attempts: i64,
    pub total_correct: i64,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Word {
    pub fn is_correct_answer(&self, answer: &str) -> bool {
        answer.trim() == self.meaning.trim()
    }

    pub fn explanation(&self) -> Option<&str> {
        self.examples.first().map(|example| example.text.as_str())
    }
}

/// Per (user, word) learning state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordProgress {
    pub user_id: String,
    pub word_id: i64,
    pub mastery: i64,
    pub times_asked: i64,
    pub times_correct: i64,
    pub consecutive_correct: i64,
    pub first_seen: DateTime<Utc>,
    pub last_practiced: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub interval_days: i64,
    pub is_learning: bool,
    pub marked_for_review: bool,
}

impl WordProgress {
    pub fn new(user_id: impl Into<String>, word_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            word_id,
            mastery: 0,
            times_asked: 0,
            times_correct: 0,
            consecutive_correct: 0,
            first_seen: now,
            last_practiced: now,
            due_date: None,
            interval_days: 1,
            is_learning: true,
            marked_for_review: false,
        }
    }

    /// Fraction of correct answers, `None` until the word has been asked.
    pub fn accuracy(&self) -> Option<f64> {
        if self.times_asked == 0 {
            return None;
        }
        Some(self.times_correct as f64 / self.times_asked as f64)
    }

    pub fn is_due_for_review(&self, now: DateTime<Utc>) -> bool {
        self.marked_for_review && self.due_date.is_some_and(|due| due <= now)
    }
}

/// Per (user, group) rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupProgress {
    pub user_id: String,
    pub group_number: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub mastery_threshold: i64,
    pub words_total: i64,
    pub words_started: i64,
    pub words_mastered: i64,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl GroupProgress {
    pub fn completion_percentage(&self) -> f64 {
        if self.words_total <= 0 {
            return 0.0;
        }
        let pct = self.words_mastered as f64 / self.words_total as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizType {
    #[default]
    AdaptiveGroup,
    SpacedReview,
    LowMastery,
    CycleMode,
    DueReview,
}

impl QuizType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdaptiveGroup => "adaptive_group",
            Self::SpacedReview => "spaced_review",
            Self::LowMastery => "low_mastery",
            Self::CycleMode => "cycle_mode",
            Self::DueReview => "due_review",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "adaptive_group" => Some(Self::AdaptiveGroup),
            "spaced_review" => Some(Self::SpacedReview),
            "low_mastery" => Some(Self::LowMastery),
            "cycle_mode" => Some(Self::CycleMode),
            "due_review" => Some(Self::DueReview),
            _ => None,
        }
    }
}

/// Which words a session draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum QuizScope {
    Words { word_ids: Vec<i64> },
    Group { group_number: i64 },
    All,
}

impl QuizScope {
    pub fn group_number(&self) -> Option<i64> {
        match self {
            Self::Group { group_number } => Some(*group_number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub id: String,
    pub user_id: String,
    pub quiz_type: QuizType,
    pub scope: QuizScope,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub words_mastered_this_session: i64,
    pub group_completed: bool,
    pub retry: RetryQueue,
}

impl QuizSession {
    pub fn new(
        id: String,
        user_id: impl Into<String>,
        quiz_type: QuizType,
        scope: QuizScope,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            quiz_type,
            scope,
            started_at: now,
            completed_at: None,
            is_active: true,
            total_questions: 0,
            correct_answers: 0,
            words_mastered_this_session: 0,
            group_completed: false,
            retry: RetryQueue::default(),
        }
    }

    /// Percentage of correct answers in this session.
    pub fn accuracy_rate(&self) -> f64 {
        percentage(self.correct_answers, self.total_questions)
    }
}

/// Immutable ledger entry for one question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub session_id: String,
    pub word_id: i64,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub is_retry_attempt: bool,
    pub mastery_before: i64,
    pub mastery_after: i64,
    pub consecutive_correct_before: i64,
    pub consecutive_correct_after: i64,
    pub time_taken_ms: i64,
    pub question_order: i64,
    pub options_presented: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Attempt fields known before the ledger assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuizAttempt {
    pub session_id: String,
    pub word_id: i64,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub is_retry_attempt: bool,
    pub mastery_before: i64,
    pub mastery_after: i64,
    pub consecutive_correct_before: i64,
    pub consecutive_correct_after: i64,
    pub time_taken_ms: i64,
    pub question_order: i64,
    pub options_presented: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
