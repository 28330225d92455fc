use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use services::{AppServices, Catalog, Clock, FinishTrigger, TimerEvent};
use textbook_core::model::{
    BookmarkTarget, ChapterId, OptionId, QuestionId, QuizId, SectionId,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod db;
mod render;

#[derive(Parser)]
#[command(name = "textbook")]
#[command(author, version, about = "Parallel computing architecture textbook companion", long_about = None)]
struct Cli {
    /// SQLite database url or path
    #[arg(long = "db", env = "TEXTBOOK_DB_URL", default_value = db::DEFAULT_DB_URL, global = true)]
    db_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the built-in demo book, quizzes and glossary
    Seed,
    /// Show chapters and sections with progress
    Toc,
    /// Print a section and remember it as the reading position
    Read {
        section: String,
        /// Reading progress to record for the section (0-100)
        #[arg(long)]
        progress: Option<i64>,
    },
    /// Mark a section as read
    MarkRead { section: String },
    /// Show or save the reading position for a chapter
    Position {
        chapter: String,
        section: Option<String>,
        #[arg(requires = "section")]
        scroll: Option<i64>,
    },
    /// Overall and per-chapter progress
    Progress,
    /// List quizzes with completion state
    Quizzes,
    /// Take a quiz non-interactively
    Quiz {
        id: String,
        /// Answer as `question=option[,option...]`; repeat per question
        #[arg(long = "answer", value_parser = parse_answer)]
        answers: Vec<(QuestionId, Vec<OptionId>)>,
        /// Let the countdown run up to this many seconds before submitting
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Result history and a review of the stored answers
    Results { id: String },
    /// Toggle a bookmark on a section
    Bookmark { section: String },
    /// List bookmarks, newest first
    Bookmarks,
    /// List or search glossary terms
    Glossary { query: Option<String> },
}

fn parse_answer(raw: &str) -> Result<(QuestionId, Vec<OptionId>), String> {
    let (question, options) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected question=option[,option...], got `{raw}`"))?;
    let question = QuestionId::new(question.trim()).map_err(|e| e.to_string())?;
    let options = options
        .split(',')
        .filter(|o| !o.trim().is_empty())
        .map(|o| OptionId::new(o.trim()).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((question, options))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "textbook=info,services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let db_url = db::normalize_sqlite_url(&cli.db_url);
    db::prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::default_clock())
        .await
        .with_context(|| format!("opening {db_url}"))?;
    info!(db = %db_url, "storage ready");

    run(&services, cli.command).await
}

async fn run(services: &AppServices, command: Commands) -> Result<()> {
    match command {
        Commands::Seed => seed(services).await,
        Commands::Toc => toc(services).await,
        Commands::Read { section, progress } => read(services, &section, progress).await,
        Commands::MarkRead { section } => mark_read(services, &section).await,
        Commands::Position {
            chapter,
            section,
            scroll,
        } => position(services, &chapter, section.as_deref(), scroll).await,
        Commands::Progress => progress(services).await,
        Commands::Quizzes => quizzes(services).await,
        Commands::Quiz {
            id,
            answers,
            timeout_secs,
        } => quiz(services, &id, answers, timeout_secs).await,
        Commands::Results { id } => results(services, &id).await,
        Commands::Bookmark { section } => bookmark(services, &section).await,
        Commands::Bookmarks => bookmarks(services).await,
        Commands::Glossary { query } => glossary(services, query.as_deref()).await,
    }
}

async fn seed(services: &AppServices) -> Result<()> {
    let summary = services.content().import_catalog(Catalog::demo()?).await?;
    let overall = services.ledger().recompute_all().await.unwrap_or(0);
    println!(
        "imported {} chapters, {} sections, {} quizzes, {} glossary terms",
        summary.chapters, summary.sections, summary.quizzes, summary.terms
    );
    println!("overall progress {}", render::progress_bar(overall));
    Ok(())
}

async fn toc(services: &AppServices) -> Result<()> {
    let outline = services.content().table_of_contents().await?;
    if outline.is_empty() {
        println!("no chapters yet; run `textbook seed`");
        return Ok(());
    }
    for entry in outline {
        let chapter = &entry.chapter;
        let done = if chapter.is_complete() { " complete" } else { "" };
        println!(
            "{:>2}. {} ({}) {}{done}",
            chapter.order(),
            chapter.title(),
            chapter.id(),
            render::progress_bar(chapter.progress())
        );
        for section in &entry.sections {
            let mark = if section.is_read() { 'x' } else { ' ' };
            println!(
                "    [{mark}] {}.{} {} ({})",
                chapter.order(),
                section.order(),
                section.title(),
                section.id()
            );
        }
    }
    Ok(())
}

async fn read(services: &AppServices, section: &str, progress: Option<i64>) -> Result<()> {
    let section_id = SectionId::new(section)?;
    let content = services.content();
    let section = content.section(&section_id).await?;
    let body = content.section_content(&section_id).await?;

    println!("# {}\n", section.title());
    print!("{}", render::section_body(&body));

    let ledger = services.ledger();
    ledger
        .save_reading_position(section.chapter_id(), &section_id, 0)
        .await;
    if let Some(progress) = progress {
        if let Some(update) = ledger.update_section_progress(&section_id, progress).await {
            let state = if update.section_read { "read" } else { "in progress" };
            println!("section {state}; overall {}", render::progress_bar(update.overall_progress));
        }
    }
    Ok(())
}

async fn mark_read(services: &AppServices, section: &str) -> Result<()> {
    let section_id = SectionId::new(section)?;
    let section = services.content().section(&section_id).await?;
    let update = services
        .ledger()
        .try_mark_section_as_read(&section_id, section.chapter_id())
        .await?;
    if let Some(chapter) = update.chapter_progress {
        println!("chapter {} {}", section.chapter_id(), render::progress_bar(chapter));
    }
    println!("overall {}", render::progress_bar(update.overall_progress));
    Ok(())
}

async fn position(
    services: &AppServices,
    chapter: &str,
    section: Option<&str>,
    scroll: Option<i64>,
) -> Result<()> {
    let chapter_id = ChapterId::new(chapter)?;
    let ledger = services.ledger();

    if let Some(section) = section {
        let section_id = SectionId::new(section)?;
        ledger
            .try_save_reading_position(&chapter_id, &section_id, scroll.unwrap_or(0))
            .await?;
    }

    match ledger.try_last_read_position(&chapter_id).await? {
        Some(position) => println!(
            "{}: section {} at {} (saved {})",
            position.chapter_id,
            position.section_id,
            position.scroll_position,
            position.saved_at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("{chapter_id}: no reading position yet"),
    }
    Ok(())
}

async fn progress(services: &AppServices) -> Result<()> {
    let ledger = services.ledger();
    println!("overall  {}", render::progress_bar(ledger.overall_progress().await));
    for entry in services.content().table_of_contents().await? {
        let id = entry.chapter.id();
        let read = entry.sections.iter().filter(|s| s.is_read()).count();
        println!(
            "{id:<8} {}  {read}/{} sections",
            render::progress_bar(ledger.chapter_progress(id).await),
            entry.sections.len()
        );
    }
    Ok(())
}

async fn quizzes(services: &AppServices) -> Result<()> {
    for quiz in services.quiz_results().list_quizzes().await? {
        let status = match quiz.last_score() {
            Some(score) if quiz.is_completed() => format!("done, last score {score}%"),
            _ => "not taken".to_owned(),
        };
        println!(
            "{:<8} {} [{}, {} questions, {} min] {status}",
            quiz.id(),
            quiz.title(),
            quiz.difficulty().as_str(),
            quiz.questions().len(),
            quiz.time_limit_minutes()
        );
    }
    Ok(())
}

async fn quiz(
    services: &AppServices,
    id: &str,
    answers: Vec<(QuestionId, Vec<OptionId>)>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let quiz_id = QuizId::new(id)?;
    let mut runner = services.quiz_runner();
    runner.start(&quiz_id).await?;
    for (question, chosen) in answers {
        runner.answer(&question, chosen).await?;
    }

    if let Some(session) = runner.session() {
        let left = session.remaining(Clock::default_clock().now());
        println!(
            "{} of {} questions answered, {}s left",
            session.answers().len(),
            session.quiz().questions().len(),
            left.as_secs()
        );
    }

    // Only the wait is bounded; grading runs outside the timeout.
    let mut trigger = FinishTrigger::User;
    if let Some(secs) = timeout_secs {
        let waited = tokio::time::timeout(Duration::from_secs(secs), async {
            loop {
                match runner.wait_event().await? {
                    TimerEvent::Tick { remaining } => {
                        info!(remaining_secs = remaining.as_secs(), "quiz running");
                    }
                    TimerEvent::Expired => return anyhow::Ok(()),
                }
            }
        })
        .await;
        if let Ok(expired) = waited {
            expired?;
            println!("time is up");
            trigger = FinishTrigger::TimerExpired;
        }
    }

    let result = runner.finish_by(trigger).await?;
    println!("{}", render::result_line(&result));
    Ok(())
}

async fn results(services: &AppServices, id: &str) -> Result<()> {
    let quiz_id = QuizId::new(id)?;
    let results = services.quiz_results();
    let history = results.history(&quiz_id).await?;
    if history.is_empty() {
        println!("{quiz_id}: no attempts yet");
        return Ok(());
    }
    for result in &history {
        println!("{}", render::result_line(result));
    }

    let review = results.review(&quiz_id).await?;
    println!();
    for question in &review.questions {
        let verdict = if question.correct { "correct" } else { "wrong" };
        let chosen: Vec<_> = question.chosen.iter().map(OptionId::as_str).collect();
        let expected: Vec<_> = question.correct_options.iter().map(OptionId::as_str).collect();
        println!(
            "{:<4} {verdict:<7} chose [{}] expected [{}]",
            question.question_id,
            chosen.join(","),
            expected.join(",")
        );
        if let Some(explanation) = &question.explanation {
            println!("     {explanation}");
        }
    }
    Ok(())
}

async fn bookmark(services: &AppServices, section: &str) -> Result<()> {
    let section_id = SectionId::new(section)?;
    let section = services.content().section(&section_id).await?;
    let added = services
        .bookmarks()
        .toggle(BookmarkTarget::Section(section_id), section.title())
        .await?;
    let verb = if added { "added" } else { "removed" };
    println!("bookmark {verb}: {}", section.title());
    Ok(())
}

async fn bookmarks(services: &AppServices) -> Result<()> {
    for bookmark in services.bookmarks().list().await? {
        let target = bookmark.target();
        println!(
            "{} {}:{} {}",
            bookmark.created_at().format("%Y-%m-%d %H:%M"),
            target.kind(),
            target.id(),
            bookmark.label()
        );
    }
    Ok(())
}

async fn glossary(services: &AppServices, query: Option<&str>) -> Result<()> {
    let glossary = services.glossary();
    let terms = match query {
        Some(query) => glossary.search(query).await?,
        None => glossary.list_terms().await?,
    };
    if terms.is_empty() {
        bail!("no glossary terms match");
    }
    for term in terms {
        println!("{}: {}", term.term(), term.definition());
    }
    Ok(())
}
