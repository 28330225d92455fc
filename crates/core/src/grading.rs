//! Quiz grading. Pure functions: no I/O, no clock, never fails.

use std::collections::BTreeSet;

use crate::model::{OptionId, QuestionId, QuestionKind, Quiz, QuizQuestion, UserAnswerSet};
use crate::progress::percent;

/// Aggregate outcome of grading an answer set against a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade {
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Size of the answer set, which may differ from `total_questions`.
    pub answered_questions: u32,
    pub score: u8,
}

/// Per-question breakdown shown on the results screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub question_id: QuestionId,
    pub correct: bool,
    pub chosen: Vec<OptionId>,
    pub correct_options: Vec<OptionId>,
    pub explanation: Option<String>,
}

/// Whether `chosen` answers `question` correctly.
///
/// - single choice / true-false: the first chosen option must be flagged correct
/// - multiple choice: the chosen set must equal the correct set exactly
/// - no answer is always wrong
#[must_use]
pub fn is_answer_correct(question: &QuizQuestion, chosen: Option<&[OptionId]>) -> bool {
    let Some(chosen) = chosen.filter(|c| !c.is_empty()) else {
        return false;
    };
    let correct = question.correct_option_ids();

    match question.kind {
        QuestionKind::SingleChoice | QuestionKind::TrueFalse => {
            chosen.first().is_some_and(|first| correct.contains(first))
        }
        QuestionKind::MultipleChoice => {
            let chosen: BTreeSet<&OptionId> = chosen.iter().collect();
            chosen == correct
        }
    }
}

/// Grade all questions of `quiz` against `answers`.
///
/// `score = round(correct * 100 / total)`, 0 for a quiz without questions.
#[must_use]
pub fn grade(quiz: &Quiz, answers: &UserAnswerSet) -> Grade {
    let questions = quiz.questions();
    let correct = questions
        .iter()
        .filter(|q| is_answer_correct(q, answers.get(&q.id)))
        .count();

    let total_questions = saturating_u32(questions.len());
    let correct_answers = saturating_u32(correct);

    Grade {
        total_questions,
        correct_answers,
        answered_questions: saturating_u32(answers.len()),
        score: percent(u64::from(correct_answers), u64::from(total_questions)),
    }
}

/// Question-by-question review of an answer set, in quiz order.
#[must_use]
pub fn review(quiz: &Quiz, answers: &UserAnswerSet) -> Vec<QuestionReview> {
    quiz.questions()
        .iter()
        .map(|q| {
            let chosen = answers.get(&q.id);
            QuestionReview {
                question_id: q.id.clone(),
                correct: is_answer_correct(q, chosen),
                chosen: chosen.map(<[OptionId]>::to_vec).unwrap_or_default(),
                correct_options: q.correct_option_ids().into_iter().cloned().collect(),
                explanation: q.explanation.clone(),
            }
        })
        .collect()
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuizId, QuizOption};

    fn o(id: &str) -> OptionId {
        OptionId::new(id).unwrap()
    }

    fn q(id: &str) -> QuestionId {
        QuestionId::new(id).unwrap()
    }

    fn question(id: &str, kind: QuestionKind, correct: &[&str], all: &[&str]) -> QuizQuestion {
        QuizQuestion {
            id: q(id),
            text: format!("Question {id}"),
            kind,
            options: all
                .iter()
                .map(|opt| QuizOption {
                    id: o(opt),
                    text: opt.to_string(),
                    is_correct: correct.contains(opt),
                })
                .collect(),
            explanation: None,
        }
    }

    fn quiz(questions: Vec<QuizQuestion>) -> Quiz {
        Quiz::new(QuizId::new("quiz1").unwrap(), "Quiz", Difficulty::Medium, 10, questions)
            .unwrap()
    }

    #[test]
    fn single_choice_grading() {
        let question = question("q1", QuestionKind::SingleChoice, &["c"], &["a", "b", "c"]);
        assert!(is_answer_correct(&question, Some(&[o("c")])));
        assert!(!is_answer_correct(&question, Some(&[o("a")])));
        assert!(!is_answer_correct(&question, None));
        assert!(!is_answer_correct(&question, Some(&[])));
    }

    #[test]
    fn single_choice_only_reads_first_option() {
        let question = question("q1", QuestionKind::SingleChoice, &["c"], &["a", "b", "c"]);
        assert!(is_answer_correct(&question, Some(&[o("c"), o("a")])));
        assert!(!is_answer_correct(&question, Some(&[o("a"), o("c")])));
    }

    #[test]
    fn true_false_grading() {
        let question = question("q1", QuestionKind::TrueFalse, &["true"], &["true", "false"]);
        assert!(is_answer_correct(&question, Some(&[o("true")])));
        assert!(!is_answer_correct(&question, Some(&[o("false")])));
    }

    #[test]
    fn multiple_choice_requires_exact_set() {
        let question = question("q1", QuestionKind::MultipleChoice, &["a", "b"], &["a", "b", "c"]);
        assert!(is_answer_correct(&question, Some(&[o("a"), o("b")])));
        assert!(is_answer_correct(&question, Some(&[o("b"), o("a")])));
        assert!(!is_answer_correct(&question, Some(&[o("a")])));
        assert!(!is_answer_correct(&question, Some(&[o("a"), o("b"), o("c")])));
    }

    #[test]
    fn unknown_option_is_just_wrong() {
        let question = question("q1", QuestionKind::SingleChoice, &["a"], &["a", "b"]);
        assert!(!is_answer_correct(&question, Some(&[o("zzz")])));
    }

    #[test]
    fn seven_of_ten_scores_seventy() {
        let questions: Vec<_> = (1..=10)
            .map(|i| question(&format!("q{i}"), QuestionKind::SingleChoice, &["a"], &["a", "b"]))
            .collect();
        let quiz = quiz(questions);

        let mut answers = UserAnswerSet::new();
        for i in 1..=10 {
            let choice = if i <= 7 { "a" } else { "b" };
            answers.set(q(&format!("q{i}")), vec![o(choice)]);
        }

        let grade = grade(&quiz, &answers);
        assert_eq!(grade.correct_answers, 7);
        assert_eq!(grade.total_questions, 10);
        assert_eq!(grade.score, 70);
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let grade = grade(&quiz(Vec::new()), &UserAnswerSet::new());
        assert_eq!(grade.score, 0);
        assert_eq!(grade.total_questions, 0);
    }

    #[test]
    fn answered_counts_answer_set_not_questions() {
        let quiz = quiz(vec![
            question("q1", QuestionKind::SingleChoice, &["a"], &["a", "b"]),
            question("q2", QuestionKind::SingleChoice, &["a"], &["a", "b"]),
            question("q3", QuestionKind::SingleChoice, &["a"], &["a", "b"]),
        ]);
        let answers = UserAnswerSet::new().with(q("q1"), vec![o("a")]);

        let grade = grade(&quiz, &answers);
        assert_eq!(grade.answered_questions, 1);
        assert_eq!(grade.correct_answers, 1);
        assert_eq!(grade.score, 33);
    }

    #[test]
    fn review_lists_each_question() {
        let quiz = quiz(vec![
            question("q1", QuestionKind::MultipleChoice, &["a", "c"], &["a", "b", "c"]),
            question("q2", QuestionKind::TrueFalse, &["false"], &["true", "false"]),
        ]);
        let answers = UserAnswerSet::new().with(q("q1"), vec![o("c"), o("a")]);

        let reviews = review(&quiz, &answers);
        assert_eq!(reviews.len(), 2);
        assert!(reviews[0].correct);
        assert_eq!(reviews[0].correct_options, vec![o("a"), o("c")]);
        assert!(!reviews[1].correct);
        assert!(reviews[1].chosen.is_empty());
    }
}
