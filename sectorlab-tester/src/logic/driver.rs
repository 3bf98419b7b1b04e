use anyhow::{Result, bail};
use sectorlab_game::{GameSession, TickOutcome};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval};

/// Ticks allowed per scenario before a run is declared stalled.
const MAX_TICKS_PER_SCENARIO: usize = 10_000;

/// Source of the millisecond timestamps fed to `GameSession::tick`.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Jumps forward one tick interval per tick; finishes instantly.
    Virtual { now_ms: u64 },
    /// Wall-clock time since `origin`, ticked by a tokio interval.
    Realtime { origin: Instant },
}

impl Clock {
    #[must_use]
    pub const fn virtual_clock() -> Self {
        Self::Virtual { now_ms: 0 }
    }

    #[must_use]
    pub fn realtime() -> Self {
        Self::Realtime {
            origin: Instant::now(),
        }
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        match self {
            Self::Virtual { now_ms } => *now_ms,
            Self::Realtime { origin } => {
                u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX)
            }
        }
    }

    /// Feed ticks until the current scenario completes. Returns the tick count.
    ///
    /// # Errors
    ///
    /// Fails if the session is paused or never completes.
    pub async fn run_until_complete(&mut self, session: &mut GameSession) -> Result<usize> {
        let tick_ms = session.config().tick_interval_ms;
        let mut timer = match self {
            Self::Virtual { .. } => None,
            Self::Realtime { .. } => {
                let mut timer = interval(Duration::from_millis(tick_ms));
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(timer)
            }
        };

        for ticks in 1..=MAX_TICKS_PER_SCENARIO {
            if let Some(timer) = timer.as_mut() {
                timer.tick().await;
            } else if let Self::Virtual { now_ms } = self {
                *now_ms = now_ms.saturating_add(tick_ms);
            }
            match session.tick(self.now_ms()) {
                TickOutcome::ScenarioComplete => return Ok(ticks),
                TickOutcome::Paused => bail!("session paused before scenario completion"),
                TickOutcome::AwaitingPopup => bail!("completion popup left open"),
                TickOutcome::Waiting | TickOutcome::Advanced { .. } => {}
            }
        }
        bail!(
            "scenario {} did not complete within {MAX_TICKS_PER_SCENARIO} ticks",
            session.state().scenario_id
        )
    }
}
