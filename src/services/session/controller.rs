use time::PrimitiveDateTime;

use crate::services::session::answers::{AnswerPolicy, AnswerSheet, RecordOutcome, ScoreSummary};
use crate::services::session::navigation::NavigationController;
use crate::services::session::store::{AnswerRecord, NewAttempt};

#[derive(Debug, Clone)]
pub(crate) struct SessionQuestion {
    pub(crate) id: String,
    pub(crate) choice_count: usize,
    pub(crate) correct_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    NotStarted,
    InProgress,
    Submitting,
    Finished,
}

impl SessionState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SessionState::NotStarted => "not_started",
            SessionState::InProgress => "in_progress",
            SessionState::Submitting => "submitting",
            SessionState::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitTrigger {
    User,
    Timer,
}

impl SubmitTrigger {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SubmitTrigger::User => "user",
            SubmitTrigger::Timer => "timer",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionConfig {
    pub(crate) answer_policy: AnswerPolicy,
    /// 1 for question-at-a-time exams, 4 for passage-grouped exams.
    pub(crate) group_size: usize,
    pub(crate) time_limit_seconds: u32,
}

/// Everything the registry needs to persist a finished session. Built while
/// entering Submitting; the store I/O happens outside the session lock.
#[derive(Debug)]
pub(crate) struct SubmitPlan {
    pub(crate) attempt: NewAttempt,
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) score: ScoreSummary,
    pub(crate) ended_at: PrimitiveDateTime,
}

#[derive(Debug)]
pub(crate) enum BeginSubmit {
    Plan(SubmitPlan),
    NeedsConfirmation { answered: u32, total: u32 },
    AlreadySubmitting,
    AlreadyFinished { attempt_id: String, score: ScoreSummary },
    NotStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventRejected {
    NotStarted,
    Submitting,
    Finished,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSnapshot {
    pub(crate) exam_id: String,
    pub(crate) state: SessionState,
    pub(crate) current_position: usize,
    pub(crate) position_count: usize,
    pub(crate) answered_count: u32,
    pub(crate) total_questions: u32,
    pub(crate) remaining_seconds: u32,
    pub(crate) attempt_id: Option<String>,
    pub(crate) score: Option<ScoreSummary>,
}

/// One exam-taking run as a synchronous state machine:
/// NotStarted -> InProgress -> Submitting -> Finished.
///
/// Events run to completion under the caller's lock. Submitting is split in
/// two so persistence happens unlocked: `begin_submit` hands out a plan, and
/// `complete_submit` / `fail_submit` settle it afterwards.
pub(crate) struct ExamSession {
    exam_id: String,
    questions: Vec<SessionQuestion>,
    config: SessionConfig,
    state: SessionState,
    sheet: AnswerSheet,
    navigation: NavigationController,
    remaining_seconds: u32,
    started_at: Option<PrimitiveDateTime>,
    attempt_id: Option<String>,
    score: Option<ScoreSummary>,
}

impl ExamSession {
    pub(crate) fn new(
        exam_id: String,
        questions: Vec<SessionQuestion>,
        config: SessionConfig,
    ) -> Self {
        let sheet = AnswerSheet::new(config.answer_policy, &questions);
        let positions = questions.len().div_ceil(config.group_size.max(1));
        Self {
            exam_id,
            questions,
            config,
            state: SessionState::NotStarted,
            sheet,
            navigation: NavigationController::new(positions),
            remaining_seconds: config.time_limit_seconds,
            started_at: None,
            attempt_id: None,
            score: None,
        }
    }

    pub(crate) fn begin(&mut self, now: PrimitiveDateTime) {
        if self.state != SessionState::NotStarted {
            return;
        }
        self.state = SessionState::InProgress;
        self.started_at = Some(now);
        self.remaining_seconds = self.config.time_limit_seconds;
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn record_answer(
        &mut self,
        question_id: &str,
        choice: usize,
    ) -> Result<RecordOutcome, EventRejected> {
        self.in_progress()?;
        Ok(self.sheet.submit(question_id, choice))
    }

    pub(crate) fn next(&mut self) -> Result<(), EventRejected> {
        self.in_progress()?;
        self.navigation.next();
        Ok(())
    }

    pub(crate) fn previous(&mut self) -> Result<(), EventRejected> {
        self.in_progress()?;
        self.navigation.previous();
        Ok(())
    }

    pub(crate) fn jump_to(&mut self, index: usize) -> Result<(), EventRejected> {
        self.in_progress()?;
        self.navigation.jump_to(index);
        Ok(())
    }

    pub(crate) fn on_tick(&mut self, remaining: u32) {
        if self.state == SessionState::InProgress {
            self.remaining_seconds = remaining;
        }
    }

    pub(crate) fn begin_submit(
        &mut self,
        trigger: SubmitTrigger,
        confirmed: bool,
        now: PrimitiveDateTime,
    ) -> BeginSubmit {
        match self.state {
            SessionState::NotStarted => return BeginSubmit::NotStarted,
            SessionState::Submitting => return BeginSubmit::AlreadySubmitting,
            SessionState::Finished => {
                return BeginSubmit::AlreadyFinished {
                    attempt_id: self.attempt_id.clone().unwrap_or_default(),
                    score: self.score.unwrap_or(ScoreSummary {
                        correct_count: 0,
                        total_questions: self.questions.len() as u32,
                        percent: 0,
                    }),
                };
            }
            SessionState::InProgress => {}
        }

        let answered = self.sheet.answered_count();
        let total = self.questions.len() as u32;
        if trigger == SubmitTrigger::User && answered < total && !confirmed {
            return BeginSubmit::NeedsConfirmation { answered, total };
        }

        self.state = SessionState::Submitting;
        let score = self.sheet.score(&self.questions);
        self.score = Some(score);

        let answers = self
            .questions
            .iter()
            .filter_map(|question| {
                self.sheet.selected(&question.id).map(|choice| AnswerRecord {
                    question_id: question.id.clone(),
                    submitted_choice: choice,
                    is_correct: choice == question.correct_index,
                })
            })
            .collect();

        BeginSubmit::Plan(SubmitPlan {
            attempt: NewAttempt {
                exam_id: self.exam_id.clone(),
                total_questions: total,
                started_at: self.started_at.unwrap_or(now),
            },
            answers,
            score,
            ended_at: now,
        })
    }

    pub(crate) fn complete_submit(&mut self, attempt_id: String) {
        if self.state != SessionState::Submitting {
            return;
        }
        self.state = SessionState::Finished;
        self.attempt_id = Some(attempt_id);
        self.remaining_seconds = 0;
    }

    /// Persistence failed: back to InProgress with the sheet intact so the
    /// client can retry the same submit.
    pub(crate) fn fail_submit(&mut self) {
        if self.state != SessionState::Submitting {
            return;
        }
        self.state = SessionState::InProgress;
        self.score = None;
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            exam_id: self.exam_id.clone(),
            state: self.state,
            current_position: self.navigation.current(),
            position_count: self.navigation.len(),
            answered_count: self.sheet.answered_count(),
            total_questions: self.questions.len() as u32,
            remaining_seconds: self.remaining_seconds,
            attempt_id: self.attempt_id.clone(),
            score: self.score,
        }
    }

    fn in_progress(&self) -> Result<(), EventRejected> {
        match self.state {
            SessionState::InProgress => Ok(()),
            SessionState::NotStarted => Err(EventRejected::NotStarted),
            SessionState::Submitting => Err(EventRejected::Submitting),
            SessionState::Finished => Err(EventRejected::Finished),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn questions(n: usize) -> Vec<SessionQuestion> {
        (0..n)
            .map(|i| SessionQuestion {
                id: format!("q{i}"),
                choice_count: 4,
                correct_index: i % 4,
            })
            .collect()
    }

    fn session(n: usize) -> ExamSession {
        let config = SessionConfig {
            answer_policy: AnswerPolicy::EditableUntilFinish,
            group_size: 1,
            time_limit_seconds: 600,
        };
        let mut session = ExamSession::new("exam-1".into(), questions(n), config);
        session.begin(primitive_now_utc());
        session
    }

    #[test]
    fn events_before_start_are_rejected() {
        let config = SessionConfig {
            answer_policy: AnswerPolicy::EditableUntilFinish,
            group_size: 1,
            time_limit_seconds: 600,
        };
        let mut session = ExamSession::new("exam-1".into(), questions(2), config);
        assert_eq!(session.record_answer("q0", 0), Err(EventRejected::NotStarted));
        assert_eq!(session.next(), Err(EventRejected::NotStarted));
        assert!(matches!(
            session.begin_submit(SubmitTrigger::User, true, primitive_now_utc()),
            BeginSubmit::NotStarted
        ));
    }

    #[test]
    fn answers_and_navigation_keep_session_in_progress() {
        let mut session = session(3);
        session.record_answer("q0", 0).unwrap();
        session.next().unwrap();
        session.jump_to(2).unwrap();
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.snapshot().current_position, 2);
        assert_eq!(session.snapshot().answered_count, 1);
    }

    #[test]
    fn incomplete_user_submit_needs_confirmation_and_stays_in_progress() {
        let mut session = session(3);
        session.record_answer("q0", 0).unwrap();

        match session.begin_submit(SubmitTrigger::User, false, primitive_now_utc()) {
            BeginSubmit::NeedsConfirmation { answered, total } => {
                assert_eq!(answered, 1);
                assert_eq!(total, 3);
            }
            other => panic!("expected confirmation prompt, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::InProgress);

        // cancelling the dialog means simply not re-submitting; answering
        // is still possible afterwards
        assert_eq!(
            session.record_answer("q1", 1),
            Ok(crate::services::session::answers::RecordOutcome::Recorded)
        );
    }

    #[test]
    fn confirmed_incomplete_submit_proceeds() {
        let mut session = session(3);
        session.record_answer("q0", 0).unwrap();

        match session.begin_submit(SubmitTrigger::User, true, primitive_now_utc()) {
            BeginSubmit::Plan(plan) => {
                assert_eq!(plan.score.total_questions, 3);
                assert_eq!(plan.answers.len(), 1);
            }
            other => panic!("expected plan, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Submitting);
    }

    #[test]
    fn complete_sheet_submits_without_confirmation() {
        let mut session = session(2);
        session.record_answer("q0", 0).unwrap();
        session.record_answer("q1", 1).unwrap();

        assert!(matches!(
            session.begin_submit(SubmitTrigger::User, false, primitive_now_utc()),
            BeginSubmit::Plan(_)
        ));
    }

    #[test]
    fn timer_expiry_submits_unconditionally() {
        let mut session = session(3);
        match session.begin_submit(SubmitTrigger::Timer, false, primitive_now_utc()) {
            BeginSubmit::Plan(plan) => {
                assert_eq!(plan.answers.len(), 0);
                assert_eq!(plan.score.correct_count, 0);
            }
            other => panic!("expected plan, got {other:?}"),
        }
    }

    #[test]
    fn second_submit_while_submitting_is_rejected() {
        let mut session = session(1);
        session.record_answer("q0", 0).unwrap();
        assert!(matches!(
            session.begin_submit(SubmitTrigger::User, false, primitive_now_utc()),
            BeginSubmit::Plan(_)
        ));
        assert!(matches!(
            session.begin_submit(SubmitTrigger::User, false, primitive_now_utc()),
            BeginSubmit::AlreadySubmitting
        ));
    }

    #[test]
    fn mutations_are_rejected_while_submitting_and_after_finish() {
        let mut session = session(1);
        session.record_answer("q0", 0).unwrap();
        session.begin_submit(SubmitTrigger::User, false, primitive_now_utc());

        assert_eq!(session.record_answer("q0", 1), Err(EventRejected::Submitting));
        assert_eq!(session.next(), Err(EventRejected::Submitting));

        session.complete_submit("attempt-1".into());
        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.record_answer("q0", 1), Err(EventRejected::Finished));
        assert_eq!(session.jump_to(0), Err(EventRejected::Finished));
    }

    #[test]
    fn finished_session_reports_attempt_on_resubmit() {
        let mut session = session(1);
        session.record_answer("q0", 0).unwrap();
        session.begin_submit(SubmitTrigger::User, false, primitive_now_utc());
        session.complete_submit("attempt-1".into());

        match session.begin_submit(SubmitTrigger::User, true, primitive_now_utc()) {
            BeginSubmit::AlreadyFinished { attempt_id, score } => {
                assert_eq!(attempt_id, "attempt-1");
                assert_eq!(score.percent, 100);
            }
            other => panic!("expected finished outcome, got {other:?}"),
        }
    }

    #[test]
    fn failed_persistence_reverts_to_in_progress_with_answers_intact() {
        let mut session = session(2);
        session.record_answer("q0", 0).unwrap();
        session.begin_submit(SubmitTrigger::User, true, primitive_now_utc());
        assert_eq!(session.state(), SessionState::Submitting);

        session.fail_submit();
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.snapshot().answered_count, 1);

        // retrying the same call succeeds
        assert!(matches!(
            session.begin_submit(SubmitTrigger::User, true, primitive_now_utc()),
            BeginSubmit::Plan(_)
        ));
    }

    #[test]
    fn passage_grouping_quarters_the_position_count() {
        let config = SessionConfig {
            answer_policy: AnswerPolicy::LockOnSubmit,
            group_size: 4,
            time_limit_seconds: 600,
        };
        let session = ExamSession::new("exam-1".into(), questions(10), config);
        assert_eq!(session.snapshot().position_count, 3);
    }

    #[test]
    fn ticks_only_count_down_while_in_progress() {
        let mut session = session(1);
        session.on_tick(599);
        assert_eq!(session.snapshot().remaining_seconds, 599);

        session.record_answer("q0", 0).unwrap();
        session.begin_submit(SubmitTrigger::User, false, primitive_now_utc());
        session.on_tick(598);
        assert_eq!(session.snapshot().remaining_seconds, 599);
    }
}
