use std::collections::HashMap;

use crate::services::session::controller::SessionQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnswerPolicy {
    /// The first submission locks the question; later submissions are no-ops.
    LockOnSubmit,
    /// Overwrites are allowed until the session is finally submitted.
    EditableUntilFinish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordOutcome {
    Recorded,
    Locked,
    UnknownQuestion,
    InvalidChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScoreSummary {
    pub(crate) correct_count: u32,
    pub(crate) total_questions: u32,
    pub(crate) percent: u32,
}

#[derive(Debug, Clone)]
struct Entry {
    choice_count: usize,
    selected: Option<usize>,
}

/// Zero-based selections keyed by question id. Rejections never mutate the
/// sheet; the chosen policy decides whether re-submissions overwrite.
#[derive(Debug, Clone)]
pub(crate) struct AnswerSheet {
    policy: AnswerPolicy,
    entries: HashMap<String, Entry>,
}

impl AnswerSheet {
    pub(crate) fn new(policy: AnswerPolicy, questions: &[SessionQuestion]) -> Self {
        let entries = questions
            .iter()
            .map(|question| {
                (
                    question.id.clone(),
                    Entry { choice_count: question.choice_count, selected: None },
                )
            })
            .collect();
        Self { policy, entries }
    }

    pub(crate) fn submit(&mut self, question_id: &str, choice: usize) -> RecordOutcome {
        let Some(entry) = self.entries.get_mut(question_id) else {
            return RecordOutcome::UnknownQuestion;
        };

        if choice >= entry.choice_count {
            return RecordOutcome::InvalidChoice;
        }

        if entry.selected.is_some() && self.policy == AnswerPolicy::LockOnSubmit {
            return RecordOutcome::Locked;
        }

        entry.selected = Some(choice);
        RecordOutcome::Recorded
    }

    pub(crate) fn selected(&self, question_id: &str) -> Option<usize> {
        self.entries.get(question_id).and_then(|entry| entry.selected)
    }

    pub(crate) fn answered_count(&self) -> u32 {
        self.entries.values().filter(|entry| entry.selected.is_some()).count() as u32
    }

    /// Unanswered questions count as incorrect.
    pub(crate) fn score(&self, questions: &[SessionQuestion]) -> ScoreSummary {
        let total_questions = questions.len() as u32;
        let correct_count = questions
            .iter()
            .filter(|question| self.selected(&question.id) == Some(question.correct_index))
            .count() as u32;

        let percent = if total_questions == 0 {
            0
        } else {
            (100.0 * f64::from(correct_count) / f64::from(total_questions)).round() as u32
        };

        ScoreSummary { correct_count, total_questions, percent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<SessionQuestion> {
        vec![
            SessionQuestion { id: "q1".into(), choice_count: 4, correct_index: 1 },
            SessionQuestion { id: "q2".into(), choice_count: 4, correct_index: 0 },
            SessionQuestion { id: "q3".into(), choice_count: 5, correct_index: 4 },
        ]
    }

    #[test]
    fn lock_on_submit_ignores_resubmission() {
        let questions = questions();
        let mut sheet = AnswerSheet::new(AnswerPolicy::LockOnSubmit, &questions);
        assert_eq!(sheet.submit("q1", 2), RecordOutcome::Recorded);
        assert_eq!(sheet.submit("q1", 1), RecordOutcome::Locked);
        assert_eq!(sheet.selected("q1"), Some(2));
    }

    #[test]
    fn editable_policy_overwrites() {
        let questions = questions();
        let mut sheet = AnswerSheet::new(AnswerPolicy::EditableUntilFinish, &questions);
        assert_eq!(sheet.submit("q1", 2), RecordOutcome::Recorded);
        assert_eq!(sheet.submit("q1", 1), RecordOutcome::Recorded);
        assert_eq!(sheet.selected("q1"), Some(1));
    }

    #[test]
    fn unknown_question_and_out_of_range_choice_are_rejected() {
        let questions = questions();
        let mut sheet = AnswerSheet::new(AnswerPolicy::EditableUntilFinish, &questions);
        assert_eq!(sheet.submit("nope", 0), RecordOutcome::UnknownQuestion);
        assert_eq!(sheet.submit("q1", 4), RecordOutcome::InvalidChoice);
        assert_eq!(sheet.answered_count(), 0);
    }

    #[test]
    fn invalid_choice_does_not_clobber_existing_answer() {
        let questions = questions();
        let mut sheet = AnswerSheet::new(AnswerPolicy::EditableUntilFinish, &questions);
        sheet.submit("q3", 4);
        assert_eq!(sheet.submit("q3", 5), RecordOutcome::InvalidChoice);
        assert_eq!(sheet.selected("q3"), Some(4));
    }

    #[test]
    fn score_counts_unanswered_as_incorrect() {
        let questions = questions();
        let mut sheet = AnswerSheet::new(AnswerPolicy::EditableUntilFinish, &questions);
        sheet.submit("q1", 1);
        sheet.submit("q2", 3);

        let score = sheet.score(&questions);
        assert_eq!(score.correct_count, 1);
        assert_eq!(score.total_questions, 3);
        assert_eq!(score.percent, 33);
    }

    #[test]
    fn score_rounds_to_nearest_percent() {
        let questions: Vec<SessionQuestion> = (0..3)
            .map(|i| SessionQuestion {
                id: format!("q{i}"),
                choice_count: 4,
                correct_index: 0,
            })
            .collect();
        let mut sheet = AnswerSheet::new(AnswerPolicy::EditableUntilFinish, &questions);
        sheet.submit("q0", 0);
        sheet.submit("q1", 0);

        // 2/3 = 66.67 rounds up
        assert_eq!(sheet.score(&questions).percent, 67);
    }

    #[test]
    fn empty_exam_scores_zero() {
        let sheet = AnswerSheet::new(AnswerPolicy::EditableUntilFinish, &[]);
        let score = sheet.score(&[]);
        assert_eq!(score.percent, 0);
        assert_eq!(score.total_questions, 0);
    }
}
