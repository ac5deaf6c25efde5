use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::shutdown::ShutdownSender;

use super::profile::LoadProfile;

/// Publishes the profile's target every `tick`. When the last stage ends the
/// controller sends 0, broadcasts shutdown and drops the sender, so a closed
/// watch channel means the profile is over. An external shutdown does the
/// same immediately.
#[must_use]
pub fn spawn_load_controller(
    profile: LoadProfile,
    tick: Duration,
    run_start: Instant,
    shutdown_tx: &ShutdownSender,
) -> (watch::Receiver<u64>, JoinHandle<()>) {
    let initial = profile.target_at(Duration::ZERO).unwrap_or(0);
    let (target_tx, target_rx) = watch::channel(initial);
    let shutdown_tx = shutdown_tx.clone();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut current_stage = None;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::debug!("Load controller stopping on shutdown");
                    break;
                }
                _ = ticker.tick() => {
                    let elapsed = run_start.elapsed();
                    let stage = profile.stage_index_at(elapsed);
                    if stage != current_stage {
                        if let Some(index) = stage
                            && let Some(details) = profile.stages().get(index)
                        {
                            tracing::info!(
                                "Stage {}/{}: ramping to {} VUs over {:?}",
                                index.saturating_add(1),
                                profile.stages().len(),
                                details.target,
                                details.duration
                            );
                        }
                        current_stage = stage;
                    }

                    let Some(target) = profile.target_at(elapsed) else {
                        tracing::info!("All stages finished");
                        drop(shutdown_tx.send(()));
                        break;
                    };
                    target_tx.send_if_modified(|current| {
                        if *current == target {
                            return false;
                        }
                        *current = target;
                        true
                    });
                }
            }
        }

        target_tx.send_if_modified(|current| {
            let changed = *current != 0;
            *current = 0;
            changed
        });
    });

    (target_rx, handle)
}
