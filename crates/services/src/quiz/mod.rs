mod results;
mod service;
mod session;
mod timer;

pub use results::{QuizResultsService, QuizReview};
pub use service::{QuizRunner, QuizSessionService, RunnerEvent};
pub use session::{FinishTrigger, QuizSession, QuizState};
pub use timer::{DEFAULT_TICK, QuizTimer, TimerEvent};
