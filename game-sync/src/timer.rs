use std::time::Duration;

use game_types::PlayerId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { player_id: PlayerId, remaining: u32 },
    Expired { player_id: PlayerId },
}

impl TimerEvent {
    pub fn player_id(&self) -> PlayerId {
        match self {
            TimerEvent::Tick { player_id, .. } | TimerEvent::Expired { player_id } => *player_id,
        }
    }
}

/// Countdown for one talking turn, armed for a specific player.
///
/// Emits a tick per interval, then `Expired` after the grace delay. Dropping
/// or cancelling the timer aborts the task, so a turn that ended early can
/// never time out the next player.
pub struct TurnTimer {
    handle: JoinHandle<()>,
}

impl TurnTimer {
    pub fn start(
        player_id: PlayerId,
        seconds: u32,
        tick_interval: Duration,
        grace: Duration,
        events: mpsc::Sender<TimerEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            for remaining in (0..seconds).rev() {
                tokio::time::sleep(tick_interval).await;
                if events
                    .send(TimerEvent::Tick {
                        player_id,
                        remaining,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }

            tokio::time::sleep(grace).await;
            debug!(%player_id, "Turn timer expired");
            let _ = events.send(TimerEvent::Expired { player_id }).await;
        });

        Self { handle }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
