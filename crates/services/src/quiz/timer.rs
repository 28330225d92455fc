use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

/// Interval between countdown ticks.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Events emitted by a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining: Duration },
    Expired,
}

/// Countdown task for one quiz attempt.
///
/// Ticks are best-effort and dropped when the receiver lags; `Expired` is
/// always delivered unless the receiver is gone. Dropping the timer cancels it.
#[derive(Debug)]
pub struct QuizTimer {
    handle: JoinHandle<()>,
}

impl QuizTimer {
    /// Spawn a countdown of `limit`, ticking every `tick`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(limit: Duration, tick: Duration, events: mpsc::Sender<TimerEvent>) -> Self {
        let tick = tick.max(Duration::from_millis(1));
        let deadline = Instant::now() + limit;

        let handle = tokio::spawn(async move {
            loop {
                if events.is_closed() {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    let _ = events.send(TimerEvent::Expired).await;
                    return;
                }
                let remaining = deadline - now;
                let _ = events.try_send(TimerEvent::Tick { remaining });
                sleep(tick.min(remaining)).await;
            }
        });

        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
