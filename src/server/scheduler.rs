use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::switch::CircadianSwitch;

/// Bring the switch online: one unscheduled poll cycle, then restore of
/// the last saved state.
///
/// The state is still unset during the first cycle, so it never touches a
/// bridge.
pub async fn setup(switch: &CircadianSwitch) {
    switch.update_info(false).await;
    switch.added_to_host().await;
    switch.schedule_update_state();
}

/// Start a poll cycle every `period`, forever.
///
/// Each cycle runs as its own task, so a slow cycle never delays the
/// ticks. Overlapping cycles are dropped by the switch itself.
pub async fn run(switch: Arc<CircadianSwitch>, period: Duration) {
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log::info!("Polling bridges every {}s", period.as_secs());

    loop {
        tick.tick().await;
        let switch = switch.clone();
        tokio::spawn(async move {
            let res = switch.update_info(true).await;
            log::trace!("Poll cycle finished: {res:?}");
        });
    }
}
