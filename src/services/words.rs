use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::group_progress::evaluate_group;
use super::QuizError;
use crate::db::operations::{
    count_words, delete_word, get_all_words, get_or_create_progress, get_progress_for_words,
    get_word, get_words_by_group, get_words_by_ids, insert_word, list_groups, word_text_exists,
    NewWord,
};
use crate::db::Database;
use crate::quiz::{Word, WordProgress};

pub const DEFAULT_GROUP_SIZE: i64 = 30;
pub const DEFAULT_LIST_LIMIT: i64 = 30;
pub const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedWord {
    pub id: i64,
    pub word: String,
    pub group_number: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedWord {
    pub word: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkIngestReport {
    pub added: Vec<AddedWord>,
    pub failed: Vec<FailedWord>,
}

/// Ingests one word object or an array of them. Entries are judged one at a
/// time; a bad entry is reported and skipped, the rest still land.
pub async fn add_words_bulk(
    db: &Database,
    payload: Value,
    group_size: i64,
) -> Result<BulkIngestReport, QuizError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(_) => vec![payload],
        _ => {
            return Err(QuizError::Validation(
                "expected a word object or an array of word objects".to_string(),
            ))
        }
    };
    let group_size = group_size.max(1);

    let now = Utc::now();
    let mut tx = db.begin().await?;
    let existing = count_words(&mut tx).await?;
    let mut report = BulkIngestReport::default();

    for item in items {
        let Value::Object(mut fields) = item else {
            report.failed.push(FailedWord {
                word: "(missing)".to_string(),
                reason: "Entry is not an object".to_string(),
                details: None,
            });
            continue;
        };

        let text = fields
            .get("word")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if text.is_empty() {
            report.failed.push(FailedWord {
                word: "(missing)".to_string(),
                reason: "Missing 'word' field".to_string(),
                details: None,
            });
            continue;
        }

        if word_text_exists(&mut tx, &text).await? {
            report.failed.push(FailedWord {
                word: text,
                reason: "Word already exists".to_string(),
                details: None,
            });
            continue;
        }

        let group_given = fields
            .get("groupNumber")
            .and_then(Value::as_i64)
            .filter(|group| *group > 0);
        if group_given.is_none() {
            let seen = existing + report.added.len() as i64;
            fields.insert("groupNumber".to_string(), Value::from(seen / group_size + 1));
        }

        let new_word: NewWord = match serde_json::from_value(Value::Object(fields)) {
            Ok(word) => word,
            Err(err) => {
                report.failed.push(FailedWord {
                    word: text,
                    reason: "Invalid field(s)".to_string(),
                    details: Some(err.to_string()),
                });
                continue;
            }
        };
        if let Err(reason) = validate_new_word(&new_word) {
            report.failed.push(FailedWord {
                word: text,
                reason: "Invalid field(s)".to_string(),
                details: Some(reason),
            });
            continue;
        }

        let id = insert_word(&mut tx, &new_word, now).await?;
        report.added.push(AddedWord {
            id,
            word: text,
            group_number: new_word.group_number,
        });
    }

    tx.commit().await?;
    tracing::info!(
        added = report.added.len(),
        failed = report.failed.len(),
        "bulk word ingest"
    );
    Ok(report)
}

fn validate_new_word(word: &NewWord) -> Result<(), String> {
    if word.meaning.trim().is_empty() {
        return Err("meaning must not be empty".to_string());
    }
    if let Some(index) = word.examples.iter().position(|e| e.text.trim().is_empty()) {
        return Err(format!("example {index} is missing its text"));
    }
    Ok(())
}

pub async fn get_word_by_id(db: &Database, word_id: i64) -> Result<Word, QuizError> {
    let mut conn = db.acquire().await?;
    get_word(&mut conn, word_id)
        .await?
        .ok_or_else(|| QuizError::not_found("word", word_id))
}

/// Removes a word with its progress records and attempts.
pub async fn remove_word(db: &Database, word_id: i64) -> Result<(), QuizError> {
    let mut conn = db.acquire().await?;
    if !delete_word(&mut conn, word_id).await? {
        return Err(QuizError::not_found("word", word_id));
    }
    tracing::info!(word_id, "word deleted");
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCriteria {
    pub group: Option<i64>,
    /// Comma separated ids; non-numeric entries are ignored.
    pub word_ids: Option<String>,
    pub mastery_min: Option<i64>,
    pub mastery_max: Option<i64>,
    pub due_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl WordCriteria {
    fn parsed_ids(&self) -> Option<Vec<i64>> {
        let raw = self.word_ids.as_deref()?;
        Some(
            raw.split(',')
                .filter_map(|part| part.trim().parse::<i64>().ok())
                .collect(),
        )
    }

    fn filters_on_progress(&self) -> bool {
        self.mastery_min.is_some() || self.mastery_max.is_some() || self.due_only == Some(true)
    }

    fn matches(&self, progress: &WordProgress, now: DateTime<Utc>) -> bool {
        self.mastery_min.map_or(true, |min| progress.mastery >= min)
            && self.mastery_max.map_or(true, |max| progress.mastery <= max)
            && (self.due_only != Some(true) || progress.is_due_for_review(now))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordWithProgress {
    #[serde(flatten)]
    pub word: Word,
    pub mastery: i64,
    pub is_due: bool,
    pub times_asked: i64,
    pub times_correct: i64,
    pub accuracy_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPage {
    pub limit: i64,
    pub offset: i64,
    pub returned: usize,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordListing {
    pub words: Vec<WordWithProgress>,
    pub pagination: WordPage,
}

/// Words matching `criteria`, merged with the user's progress. Mastery and
/// due filters only keep words the user has already seen.
pub async fn list_words(
    db: &Database,
    user_id: &str,
    criteria: &WordCriteria,
) -> Result<WordListing, QuizError> {
    let limit = criteria
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let offset = criteria.offset.unwrap_or(0).max(0);
    let now = Utc::now();

    let mut conn = db.acquire().await?;
    let words = match (criteria.parsed_ids(), criteria.group) {
        (Some(ids), _) => get_words_by_ids(&mut conn, &ids).await?,
        (None, Some(group)) => get_words_by_group(&mut conn, group).await?,
        (None, None) => get_all_words(&mut conn).await?,
    };
    let ids: Vec<i64> = words.iter().map(|w| w.id).collect();
    let mut progress = get_progress_for_words(&mut conn, user_id, &ids).await?;

    let filtered: Vec<Word> = if criteria.filters_on_progress() {
        words
            .into_iter()
            .filter(|w| progress.get(&w.id).is_some_and(|p| criteria.matches(p, now)))
            .collect()
    } else {
        words
    };

    let total = filtered.len();
    let page: Vec<WordWithProgress> = filtered
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .map(|word| {
            let record = progress.remove(&word.id);
            WordWithProgress {
                mastery: record.as_ref().map_or(0, |p| p.mastery),
                is_due: record.as_ref().is_some_and(|p| p.is_due_for_review(now)),
                times_asked: record.as_ref().map_or(0, |p| p.times_asked),
                times_correct: record.as_ref().map_or(0, |p| p.times_correct),
                accuracy_rate: record
                    .as_ref()
                    .and_then(WordProgress::accuracy)
                    .map_or(0.0, |a| a * 100.0),
                word,
            }
        })
        .collect();

    Ok(WordListing {
        pagination: WordPage {
            limit,
            offset,
            returned: page.len(),
            total,
            has_more: (offset as usize).saturating_add(limit as usize) < total,
        },
        words: page,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResult {
    pub word_id: i64,
    pub word: String,
    pub mastery: i64,
    pub first_seen: bool,
}

/// Seeds a progress record for the word. First exposure refreshes the
/// word's group rollup.
pub async fn mark_word_read(
    db: &Database,
    user_id: &str,
    word_id: i64,
) -> Result<MarkReadResult, QuizError> {
    let now = Utc::now();
    let mut tx = db.begin().await?;
    let word = get_word(&mut tx, word_id)
        .await?
        .ok_or_else(|| QuizError::not_found("word", word_id))?;

    let upserted = get_or_create_progress(&mut tx, user_id, word.id, now).await?;
    let first_seen = upserted.was_created();
    if first_seen {
        evaluate_group(&mut tx, user_id, word.group_number, now).await?;
    }
    tx.commit().await?;

    Ok(MarkReadResult {
        word_id: word.id,
        word: word.word,
        mastery: upserted.value().mastery,
        first_seen,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_number: i64,
    pub total_words: i64,
    pub words_started: i64,
    pub words_mastered: i64,
    pub is_completed: bool,
    pub completion_percentage: f64,
    pub mastery_threshold: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Every group in the pool with its re-evaluated rollup for `user_id`.
pub async fn groups_with_progress(
    db: &Database,
    user_id: &str,
) -> Result<Vec<GroupSummary>, QuizError> {
    let now = Utc::now();
    let mut tx = db.begin().await?;
    let groups = list_groups(&mut tx).await?;

    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let progress = evaluate_group(&mut tx, user_id, group.group_number, now)
            .await?
            .progress;
        out.push(GroupSummary {
            group_number: progress.group_number,
            total_words: progress.words_total,
            words_started: progress.words_started,
            words_mastered: progress.words_mastered,
            is_completed: progress.is_completed,
            completion_percentage: progress.completion_percentage(),
            mastery_threshold: progress.mastery_threshold,
            started_at: progress.started_at,
            completed_at: progress.completed_at,
        });
    }
    tx.commit().await?;
    Ok(out)
}
