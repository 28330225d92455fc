//! Plain-text rendering for terminal output.

use std::fmt::Write;

use textbook_core::model::{ContentBlock, QuizResult, SectionContent};

pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) / 5;
    format!("[{}{}] {percent:>3}%", "#".repeat(filled), "-".repeat(20 - filled))
}

pub fn section_body(content: &SectionContent) -> String {
    let mut out = String::new();
    for block in &content.blocks {
        match block {
            ContentBlock::Text { text } => {
                let _ = writeln!(out, "{text}");
            }
            ContentBlock::Code { language, code } => {
                let _ = writeln!(out, "```{language}\n{code}\n```");
            }
            ContentBlock::Formula { latex } => {
                let _ = writeln!(out, "  $$ {latex} $$");
            }
            ContentBlock::Table { headers, rows } => {
                let _ = writeln!(out, "| {} |", headers.join(" | "));
                for row in rows {
                    let _ = writeln!(out, "| {} |", row.join(" | "));
                }
            }
            ContentBlock::Image { source, caption } | ContentBlock::Diagram { source, caption } => {
                let label = caption.as_deref().unwrap_or(block.kind());
                let _ = writeln!(out, "[{label}: {source}]");
            }
            ContentBlock::Video { source, title } => {
                let label = title.as_deref().unwrap_or("video");
                let _ = writeln!(out, "[{label}: {source}]");
            }
        }
        out.push('\n');
    }
    out
}

pub fn result_line(result: &QuizResult) -> String {
    format!(
        "{} score {}%  correct {}/{}  answered {}  unanswered {}  {}s  at {}",
        result.quiz_id,
        result.score,
        result.correct_answers,
        result.total_questions,
        result.answered_questions,
        result.unanswered(),
        result.time_taken_seconds,
        result.completed_at.format("%Y-%m-%d %H:%M:%S"),
    )
}
