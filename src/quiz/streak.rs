use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStreak {
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_quiz_date: Option<NaiveDate>,
    pub total_quizzes: i64,
}

impl UserStreak {
    /// Counts quiz activity on `today`. Repeat activity on the same day is a no-op.
    pub fn record_activity(&mut self, today: NaiveDate) {
        if self.last_quiz_date == Some(today) {
            return;
        }

        let yesterday = today.checked_sub_days(Days::new(1));
        if self.last_quiz_date.is_some() && self.last_quiz_date == yesterday {
            self.current_streak += 1;
        } else {
            self.current_streak = 1;
        }

        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_quiz_date = Some(today);
        self.total_quizzes += 1;
    }
}
