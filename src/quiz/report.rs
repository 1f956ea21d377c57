use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{percentage, QuizAttempt, QuizSession, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    DueReview,
    LowMasteryDrill,
    ContinueGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub action: RecommendedAction,
    pub title: String,
    pub priority: ActionPriority,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub word_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_number: Option<i64>,
}

/// Existence checks feeding [`recommend`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationSignals {
    pub due_count: i64,
    pub due_word_ids: Vec<i64>,
    pub low_mastery_count: i64,
    pub low_mastery_word_ids: Vec<i64>,
    pub next_group: Option<i64>,
}

/// Fixed order: due reviews, then low-mastery drill, then next group.
pub fn recommend(signals: &RecommendationSignals) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if signals.due_count > 0 {
        out.push(Recommendation {
            action: RecommendedAction::DueReview,
            title: format!("{} words due for review", signals.due_count),
            priority: ActionPriority::High,
            word_ids: signals.due_word_ids.clone(),
            group_number: None,
        });
    }

    if signals.low_mastery_count > 0 {
        out.push(Recommendation {
            action: RecommendedAction::LowMasteryDrill,
            title: format!("{} struggling words need practice", signals.low_mastery_count),
            priority: ActionPriority::High,
            word_ids: signals.low_mastery_word_ids.clone(),
            group_number: None,
        });
    }

    if let Some(group_number) = signals.next_group {
        out.push(Recommendation {
            action: RecommendedAction::ContinueGroup,
            title: format!("Continue with Group {group_number}"),
            priority: ActionPriority::Medium,
            word_ids: Vec::new(),
            group_number: Some(group_number),
        });
    }

    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryChange {
    pub word_id: i64,
    pub word: Option<String>,
    pub before: i64,
    pub after: i64,
    pub delta: i64,
    pub is_correct: bool,
    pub is_retry_attempt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPerformance {
    pub total_questions: i64,
    pub correct_answers: i64,
    pub accuracy_rate: f64,
    pub words_mastered: i64,
    pub time_spent_seconds: i64,
    pub retry_queue_cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    pub completed_at: DateTime<Utc>,
    pub performance: SessionPerformance,
    pub mastery_changes: Vec<MasteryChange>,
    pub group_completed: bool,
    pub retry_queue_remaining: usize,
    pub next_recommendations: Vec<Recommendation>,
}

pub fn mastery_changes(attempts: &[QuizAttempt], words: &[Word]) -> Vec<MasteryChange> {
    attempts
        .iter()
        .map(|attempt| MasteryChange {
            word_id: attempt.word_id,
            word: words
                .iter()
                .find(|w| w.id == attempt.word_id)
                .map(|w| w.word.clone()),
            before: attempt.mastery_before,
            after: attempt.mastery_after,
            delta: attempt.mastery_after - attempt.mastery_before,
            is_correct: attempt.is_correct,
            is_retry_attempt: attempt.is_retry_attempt,
        })
        .collect()
}

/// Assembles the report for a session that has already been closed.
pub fn build_report(
    session: &QuizSession,
    completed_at: DateTime<Utc>,
    attempts: &[QuizAttempt],
    words: &[Word],
    signals: &RecommendationSignals,
) -> SessionReport {
    let elapsed = (completed_at - session.started_at).num_seconds().max(0);

    SessionReport {
        session_id: session.id.clone(),
        completed_at,
        performance: SessionPerformance {
            total_questions: session.total_questions,
            correct_answers: session.correct_answers,
            accuracy_rate: percentage(session.correct_answers, session.total_questions),
            words_mastered: session.words_mastered_this_session,
            time_spent_seconds: elapsed,
            retry_queue_cleared: session.retry.is_empty(),
        },
        mastery_changes: mastery_changes(attempts, words),
        group_completed: session.group_completed,
        retry_queue_remaining: session.retry.len(),
        next_recommendations: recommend(signals),
    }
}
