//! Session orchestration: dispatches questions, applies answers and closes
//! sessions. Every mutating call runs inside one `Database::begin` unit of
//! work so a failure leaves no partial state behind.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use super::group_progress::evaluate_group;
use super::QuizError;
use crate::db::operations::{
    attempted_word_ids, count_words_in_group, get_all_words, get_or_create_progress, get_progress,
    get_progress_for_words, get_session_for_user, get_streak, get_word, get_words_by_group,
    get_words_by_ids, increment_word_counters, insert_attempt, insert_session,
    list_session_attempts, sample_distractor_meanings, save_progress, save_session, save_streak,
};
use crate::db::Database;
use crate::quiz::mastery::crossed_mastered_threshold;
use crate::quiz::options::{multiple_choice, DEFAULT_OPTION_COUNT, MAX_OPTION_COUNT};
use crate::quiz::report::{build_report, SessionReport};
use crate::quiz::retry_queue::DEFAULT_REQUIRED_CONSECUTIVE;
use crate::quiz::{
    apply_answer, build_queue, NewQuizAttempt, QuizAttempt, QuizScope, QuizSession, QuizType, Word,
};

/// Scope as a caller describes it. Explicit ids win over a group number; with
/// neither the whole pool is used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRequest {
    pub word_ids: Option<Vec<i64>>,
    pub group_number: Option<i64>,
}

impl ScopeRequest {
    pub fn into_scope(self) -> QuizScope {
        match (self.word_ids, self.group_number) {
            (Some(word_ids), _) => QuizScope::Words { word_ids },
            (None, Some(group_number)) => QuizScope::Group { group_number },
            (None, None) => QuizScope::All,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatsView {
    pub total_questions: i64,
    pub correct_answers: i64,
    pub retry_queue_size: usize,
    pub accuracy_rate: f64,
}

impl SessionStatsView {
    fn of(session: &QuizSession) -> Self {
        Self {
            total_questions: session.total_questions,
            correct_answers: session.correct_answers,
            retry_queue_size: session.retry.len(),
            accuracy_rate: session.accuracy_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub word_id: i64,
    pub word: String,
    pub pronunciation: String,
    pub options: Vec<String>,
    pub is_retry: bool,
    pub current_mastery: i64,
    pub consecutive_correct: i64,
    pub question_number: i64,
    pub session_stats: SessionStatsView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnd {
    pub session_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_number: Option<i64>,
    pub group_completed: bool,
    pub retry_queue_remaining: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextQuestion {
    Question(Question),
    SessionComplete(SessionEnd),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub word_id: i64,
    pub answer: String,
    #[serde(default)]
    pub time_taken_ms: i64,
    #[serde(default)]
    pub options_presented: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryStatus {
    pub added_to_retry: bool,
    pub removed_from_retry: bool,
    pub in_retry_queue: bool,
    pub retry_queue_size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgressView {
    pub total_questions: i64,
    pub correct_answers: i64,
    pub accuracy_rate: f64,
    pub words_mastered: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub attempt_id: i64,
    pub is_correct: bool,
    pub correct_answer: String,
    pub mastery_before: i64,
    pub mastery_after: i64,
    pub consecutive_correct: i64,
    pub explanation: Option<String>,
    pub retry_status: RetryStatus,
    pub session_progress: SessionProgressView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: QuizSession,
    pub accuracy_rate: f64,
    pub attempts: Vec<QuizAttempt>,
}

#[derive(Clone)]
pub struct QuizEngine {
    db: Database,
    option_count: usize,
}

impl QuizEngine {
    pub fn new(db: Database, option_count: usize) -> Self {
        Self {
            db,
            option_count: option_count.clamp(2, MAX_OPTION_COUNT),
        }
    }

    pub fn with_defaults(db: Database) -> Self {
        Self::new(db, DEFAULT_OPTION_COUNT)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn start_session(
        &self,
        user_id: &str,
        quiz_type: QuizType,
        scope: QuizScope,
    ) -> Result<QuizSession, QuizError> {
        let mut tx = self.db.begin().await?;
        let scope = validate_scope(&mut tx, scope).await?;

        let session = QuizSession::new(
            uuid::Uuid::new_v4().to_string(),
            user_id,
            quiz_type,
            scope,
            Utc::now(),
        );
        insert_session(&mut tx, &session).await?;
        tx.commit().await?;

        tracing::info!(
            session_id = %session.id,
            user_id,
            quiz_type = session.quiz_type.as_str(),
            "quiz session started"
        );
        Ok(session)
    }

    pub async fn next_question(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<NextQuestion, QuizError> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut session = load_session(&mut tx, session_id, user_id).await?;

        if !session.is_active {
            return Ok(NextQuestion::SessionComplete(SessionEnd {
                session_id: session.id.clone(),
                message: "Session already completed.".to_string(),
                group_number: session.scope.group_number(),
                group_completed: session.group_completed,
                retry_queue_remaining: session.retry.len(),
            }));
        }

        let mut healed = false;
        let mut retry_word = None;
        while let Some(head) = session.retry.head() {
            match get_word(&mut tx, head).await? {
                Some(word) => {
                    retry_word = Some(word);
                    break;
                }
                None => {
                    tracing::warn!(
                        session_id,
                        word_id = head,
                        "dropping retry entry for missing word"
                    );
                    session.retry.remove(head);
                    healed = true;
                }
            }
        }
        if healed {
            save_session(&mut tx, &session).await?;
        }

        if let Some(word) = retry_word {
            let question = self.build_question(&mut tx, &session, &word, true).await?;
            tx.commit().await?;
            return Ok(NextQuestion::Question(question));
        }

        let pool = scope_words(&mut tx, &session.scope).await?;
        let attempted = attempted_word_ids(&mut tx, &session.id).await?;
        let candidates: Vec<Word> = pool
            .into_iter()
            .filter(|w| !attempted.contains(&w.id))
            .collect();
        let candidate_ids: Vec<i64> = candidates.iter().map(|w| w.id).collect();
        let progress = get_progress_for_words(&mut tx, user_id, &candidate_ids).await?;

        let next_word = build_queue(&candidates, &progress, now)
            .first()
            .map(|queued| queued.word.clone());

        if let Some(word) = next_word {
            let question = self.build_question(&mut tx, &session, &word, false).await?;
            tx.commit().await?;
            return Ok(NextQuestion::Question(question));
        }

        let group_number = session.scope.group_number();
        let end = match group_number {
            Some(group_number) if session.retry.is_empty() => {
                let evaluation = evaluate_group(&mut tx, user_id, group_number, now).await?;
                let completed = evaluation.transition.is_completed();
                SessionEnd {
                    session_id: session.id.clone(),
                    message: if completed {
                        "Group completed!".to_string()
                    } else {
                        "No more questions for now.".to_string()
                    },
                    group_number: Some(group_number),
                    group_completed: completed,
                    retry_queue_remaining: 0,
                }
            }
            _ => SessionEnd {
                session_id: session.id.clone(),
                message: "Quiz completed!".to_string(),
                group_number,
                group_completed: false,
                retry_queue_remaining: session.retry.len(),
            },
        };
        tx.commit().await?;
        Ok(NextQuestion::SessionComplete(end))
    }

    pub async fn submit_answer(
        &self,
        user_id: &str,
        session_id: &str,
        submission: AnswerSubmission,
    ) -> Result<AnswerResult, QuizError> {
        if submission.word_id <= 0 {
            return Err(QuizError::Validation("wordId must be a positive integer".to_string()));
        }
        if submission.time_taken_ms < 0 {
            return Err(QuizError::Validation("timeTakenMs must not be negative".to_string()));
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut session = load_session(&mut tx, session_id, user_id).await?;
        if !session.is_active {
            return Err(QuizError::SessionClosed(session.id));
        }

        let word = get_word(&mut tx, submission.word_id)
            .await?
            .ok_or_else(|| QuizError::not_found("word", submission.word_id))?;
        let answer = submission.answer.trim().to_string();
        let is_correct = word.is_correct_answer(&answer);

        let upserted = get_or_create_progress(&mut tx, user_id, word.id, now).await?;
        let first_exposure = upserted.was_created();
        let before = upserted.into_inner();
        let after = apply_answer(&before, is_correct, now);
        save_progress(&mut tx, &after).await?;

        let is_retry_attempt = session.retry.contains(word.id);
        let mut added_to_retry = false;
        let mut removed_from_retry = false;
        if is_correct {
            if is_retry_attempt {
                removed_from_retry = session
                    .retry
                    .check_completion(word.id, after.consecutive_correct);
            }
        } else if !is_retry_attempt {
            session.retry.enqueue(word.id, DEFAULT_REQUIRED_CONSECUTIVE);
            added_to_retry = true;
        }

        let attempt = insert_attempt(
            &mut tx,
            &NewQuizAttempt {
                session_id: session.id.clone(),
                word_id: word.id,
                user_answer: answer,
                correct_answer: word.meaning.clone(),
                is_correct,
                is_retry_attempt,
                mastery_before: before.mastery,
                mastery_after: after.mastery,
                consecutive_correct_before: before.consecutive_correct,
                consecutive_correct_after: after.consecutive_correct,
                time_taken_ms: submission.time_taken_ms,
                question_order: session.total_questions + 1,
                options_presented: submission.options_presented,
                timestamp: now,
            },
        )
        .await?;

        session.total_questions += 1;
        if is_correct {
            session.correct_answers += 1;
        }
        if crossed_mastered_threshold(before.mastery, after.mastery) {
            session.words_mastered_this_session += 1;
        }
        save_session(&mut tx, &session).await?;

        increment_word_counters(&mut tx, word.id, is_correct).await?;

        let mut streak = get_streak(&mut tx, user_id).await?;
        streak.record_activity(now.date_naive());
        save_streak(&mut tx, user_id, &streak).await?;

        if first_exposure {
            evaluate_group(&mut tx, user_id, word.group_number, now).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            session_id,
            word_id = word.id,
            is_correct,
            mastery_before = before.mastery,
            mastery_after = after.mastery,
            "answer recorded"
        );

        Ok(AnswerResult {
            attempt_id: attempt.id,
            is_correct,
            correct_answer: word.meaning.clone(),
            mastery_before: before.mastery,
            mastery_after: after.mastery,
            consecutive_correct: after.consecutive_correct,
            explanation: word.explanation().map(str::to_string),
            retry_status: RetryStatus {
                added_to_retry,
                removed_from_retry,
                in_retry_queue: session.retry.contains(word.id),
                retry_queue_size: session.retry.len(),
            },
            session_progress: SessionProgressView {
                total_questions: session.total_questions,
                correct_answers: session.correct_answers,
                accuracy_rate: session.accuracy_rate(),
                words_mastered: session.words_mastered_this_session,
            },
        })
    }

    /// Closes the session and builds its report. Completing an already
    /// completed session returns the report again without re-stamping it.
    pub async fn complete_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionReport, QuizError> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut session = load_session(&mut tx, session_id, user_id).await?;

        let completed_at = match session.completed_at {
            Some(at) if !session.is_active => at,
            _ => {
                session.is_active = false;
                session.completed_at = Some(now);
                if let Some(group_number) = session.scope.group_number() {
                    let evaluation = evaluate_group(&mut tx, user_id, group_number, now).await?;
                    session.group_completed = evaluation.transition.is_completed();
                }
                save_session(&mut tx, &session).await?;
                tracing::info!(
                    session_id,
                    user_id,
                    total_questions = session.total_questions,
                    correct_answers = session.correct_answers,
                    "quiz session completed"
                );
                now
            }
        };

        let attempts = list_session_attempts(&mut tx, &session.id).await?;
        let word_ids: Vec<i64> = attempts
            .iter()
            .map(|a| a.word_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let words = get_words_by_ids(&mut tx, &word_ids).await?;
        let signals = super::dashboard::recommendation_signals(&mut tx, user_id, now).await?;

        tx.commit().await?;
        Ok(build_report(&session, completed_at, &attempts, &words, &signals))
    }

    pub async fn session_detail(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionDetail, QuizError> {
        let mut conn = self.db.acquire().await?;
        let session = load_session(&mut conn, session_id, user_id).await?;
        let attempts = list_session_attempts(&mut conn, &session.id).await?;
        Ok(SessionDetail {
            accuracy_rate: session.accuracy_rate(),
            session,
            attempts,
        })
    }

    async fn build_question(
        &self,
        conn: &mut SqliteConnection,
        session: &QuizSession,
        word: &Word,
        is_retry: bool,
    ) -> Result<Question, QuizError> {
        let pool_size = i64::try_from(self.option_count.saturating_mul(3)).unwrap_or(i64::MAX);
        let distractors = sample_distractor_meanings(conn, word.id, pool_size).await?;
        let options = multiple_choice(&word.meaning, &distractors, self.option_count);

        let progress = get_progress(conn, &session.user_id, word.id).await?;
        let (current_mastery, consecutive_correct) = progress
            .map(|p| (p.mastery, p.consecutive_correct))
            .unwrap_or((0, 0));

        tracing::debug!(
            session_id = %session.id,
            word_id = word.id,
            is_retry,
            "dispatching question"
        );

        Ok(Question {
            word_id: word.id,
            word: word.word.clone(),
            pronunciation: word.pronunciation.clone(),
            options,
            is_retry,
            current_mastery,
            consecutive_correct,
            question_number: session.total_questions + 1,
            session_stats: SessionStatsView::of(session),
        })
    }
}

async fn load_session(
    conn: &mut SqliteConnection,
    session_id: &str,
    user_id: &str,
) -> Result<QuizSession, QuizError> {
    get_session_for_user(conn, session_id, user_id)
        .await?
        .ok_or_else(|| QuizError::not_found("session", session_id))
}

/// Rejects scopes that could never produce a question.
async fn validate_scope(
    conn: &mut SqliteConnection,
    scope: QuizScope,
) -> Result<QuizScope, QuizError> {
    match scope {
        QuizScope::Words { word_ids } => {
            if word_ids.is_empty() {
                return Err(QuizError::InvalidScope("wordIds must not be empty".to_string()));
            }
            let mut unique = Vec::with_capacity(word_ids.len());
            for id in word_ids {
                if !unique.contains(&id) {
                    unique.push(id);
                }
            }
            let found: HashSet<i64> = get_words_by_ids(conn, &unique)
                .await?
                .iter()
                .map(|w| w.id)
                .collect();
            if let Some(missing) = unique.iter().find(|id| !found.contains(id)) {
                return Err(QuizError::InvalidScope(format!("unknown word id {missing}")));
            }
            Ok(QuizScope::Words { word_ids: unique })
        }
        QuizScope::Group { group_number } => {
            if group_number <= 0 {
                return Err(QuizError::InvalidScope(
                    "groupNumber must be a positive integer".to_string(),
                ));
            }
            if count_words_in_group(conn, group_number).await? == 0 {
                return Err(QuizError::InvalidScope(format!(
                    "group {group_number} has no words"
                )));
            }
            Ok(QuizScope::Group { group_number })
        }
        QuizScope::All => Ok(QuizScope::All),
    }
}

async fn scope_words(conn: &mut SqliteConnection, scope: &QuizScope) -> Result<Vec<Word>, sqlx::Error> {
    match scope {
        QuizScope::Words { word_ids } => get_words_by_ids(conn, word_ids).await,
        QuizScope::Group { group_number } => get_words_by_group(conn, *group_number).await,
        QuizScope::All => get_all_words(conn).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_precedence() {
        let both = ScopeRequest {
            word_ids: Some(vec![3, 4]),
            group_number: Some(2),
        };
        assert_eq!(both.into_scope(), QuizScope::Words { word_ids: vec![3, 4] });

        let group = ScopeRequest {
            word_ids: None,
            group_number: Some(2),
        };
        assert_eq!(group.into_scope(), QuizScope::Group { group_number: 2 });

        assert_eq!(ScopeRequest::default().into_scope(), QuizScope::All);
    }

    #[test]
    fn test_next_question_serializes_with_status_tag() {
        let end = NextQuestion::SessionComplete(SessionEnd {
            session_id: "s1".to_string(),
            message: "Quiz completed!".to_string(),
            group_number: None,
            group_completed: false,
            retry_queue_remaining: 0,
        });
        let json = serde_json::to_value(&end).unwrap();
        assert_eq!(json["status"], "session_complete");
        assert_eq!(json["sessionId"], "s1");
        assert!(json.get("groupNumber").is_none());
    }
}
