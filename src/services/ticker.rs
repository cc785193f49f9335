//! Background tasks driving the countdown and the controller-lock sweep.

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::info;

use crate::{services::match_service, state::SharedState};

/// Tick the countdown every configured period.
pub fn spawn_ticker(state: SharedState) -> JoinHandle<()> {
    let period = state.config().tick_interval();
    tokio::spawn(async move {
        info!(period_ms = period.as_millis() as u64, "countdown ticker started");
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            match_service::tick(&state).await;
        }
    })
}

/// Reclaim a stale controller lock every configured period.
pub fn spawn_lock_sweeper(state: SharedState) -> JoinHandle<()> {
    let period = state.config().lock_sweep_interval();
    tokio::spawn(async move {
        info!(period_ms = period.as_millis() as u64, "controller lock sweeper started");
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            match_service::sweep_lock(&state).await;
        }
    })
}
