use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_REQUIRED_CONSECUTIVE: i64 = 2;

/// Session-scoped queue of missed words. Strict head-of-line: while it is
/// non-empty its head is the next question. A word id appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryQueue {
    queue: Vec<i64>,
    requirements: BTreeMap<i64, i64>,
}

impl RetryQueue {
    pub fn from_parts(queue: Vec<i64>, requirements: BTreeMap<i64, i64>) -> Self {
        let mut out = Self::default();
        for word_id in queue {
            if !out.queue.contains(&word_id) {
                out.queue.push(word_id);
            }
        }
        out.requirements = requirements
            .into_iter()
            .filter(|(word_id, _)| out.queue.contains(word_id))
            .collect();
        out
    }

    pub fn word_ids(&self) -> &[i64] {
        &self.queue
    }

    pub fn requirements(&self) -> &BTreeMap<i64, i64> {
        &self.requirements
    }

    pub fn head(&self) -> Option<i64> {
        self.queue.first().copied()
    }

    pub fn contains(&self, word_id: i64) -> bool {
        self.queue.contains(&word_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn requirement(&self, word_id: i64) -> i64 {
        self.requirements
            .get(&word_id)
            .copied()
            .unwrap_or(DEFAULT_REQUIRED_CONSECUTIVE)
    }

    /// Adds `word_id` if absent and (re)sets its requirement.
    pub fn enqueue(&mut self, word_id: i64, required_consecutive: i64) {
        if !self.queue.contains(&word_id) {
            self.queue.push(word_id);
        }
        self.requirements.insert(word_id, required_consecutive);
    }

    /// Removes `word_id` once `consecutive_correct` meets its requirement.
    /// Returns false, leaving the queue untouched, otherwise or when absent.
    pub fn check_completion(&mut self, word_id: i64, consecutive_correct: i64) -> bool {
        if !self.contains(word_id) {
            return false;
        }
        if consecutive_correct < self.requirement(word_id) {
            return false;
        }
        self.remove(word_id);
        true
    }

    /// Drops a word unconditionally, e.g. when it no longer resolves.
    pub fn remove(&mut self, word_id: i64) -> bool {
        let before = self.queue.len();
        self.queue.retain(|id| *id != word_id);
        self.requirements.remove(&word_id);
        self.queue.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut retry = RetryQueue::default();
        retry.enqueue(7, 2);
        retry.enqueue(12, 2);
        retry.enqueue(7, 3);

        assert_eq!(retry.word_ids(), &[7, 12]);
        assert_eq!(retry.requirement(7), 3);
        assert_eq!(retry.head(), Some(7));
    }

    #[test]
    fn test_two_consecutive_correct_drains_head() {
        let mut retry = RetryQueue::default();
        retry.enqueue(7, DEFAULT_REQUIRED_CONSECUTIVE);
        retry.enqueue(12, DEFAULT_REQUIRED_CONSECUTIVE);

        assert!(!retry.check_completion(7, 1));
        assert_eq!(retry.word_ids(), &[7, 12]);

        assert!(retry.check_completion(7, 2));
        assert_eq!(retry.word_ids(), &[12]);
        assert!(!retry.requirements().contains_key(&7));
    }

    #[test]
    fn test_check_completion_after_removal_is_noop() {
        let mut retry = RetryQueue::default();
        retry.enqueue(4, 2);
        assert!(retry.check_completion(4, 5));
        assert!(!retry.check_completion(4, 5));
        assert!(retry.is_empty());
    }

    #[test]
    fn test_unknown_word_uses_default_requirement() {
        let retry = RetryQueue::default();
        assert_eq!(retry.requirement(99), DEFAULT_REQUIRED_CONSECUTIVE);
    }

    #[test]
    fn test_from_parts_drops_duplicates_and_orphans() {
        let mut requirements = BTreeMap::new();
        requirements.insert(1, 2);
        requirements.insert(5, 4);
        let retry = RetryQueue::from_parts(vec![1, 2, 1], requirements);

        assert_eq!(retry.word_ids(), &[1, 2]);
        assert_eq!(retry.requirement(1), 2);
        assert!(!retry.requirements().contains_key(&5));
    }

    #[test]
    fn test_serde_shape() {
        let mut retry = RetryQueue::default();
        retry.enqueue(3, 2);
        let json = serde_json::to_value(&retry).unwrap();
        assert_eq!(json["queue"], serde_json::json!([3]));
        assert_eq!(json["requirements"]["3"], serde_json::json!(2));

        let back: RetryQueue = serde_json::from_value(json).unwrap();
        assert_eq!(back, retry);
    }
}
