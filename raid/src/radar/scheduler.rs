use std::{
    sync::Arc,
    thread::{
        self,
        JoinHandle,
    },
    time::Duration,
};

use anyhow::Context;

use super::Radar;
use crate::CancellationToken;

/// Drives the discovery and validation passes on background threads.
/// The realtime pass stays with the caller.
pub struct RefreshScheduler {
    cancellation: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

fn spawn_timer(
    name: &str,
    interval: Duration,
    cancellation: CancellationToken,
    mut tick: impl FnMut() + Send + 'static,
) -> anyhow::Result<JoinHandle<()>> {
    let worker_name = name.to_string();
    thread::Builder::new()
        .name(worker_name.clone())
        .spawn(move || {
            log::debug!("{} started with an interval of {:?}", worker_name, interval);
            while !cancellation.is_cancelled() {
                tick();

                if cancellation.wait_timeout(interval) {
                    break;
                }
            }
            log::debug!("{} stopped", worker_name);
        })
        .with_context(|| format!("failed to spawn {}", name))
}

impl RefreshScheduler {
    pub fn start(radar: Arc<Radar>) -> anyhow::Result<Self> {
        /* dropping the scheduler on error stops the already spawned workers */
        let mut scheduler = Self {
            cancellation: CancellationToken::new(),
            workers: Vec::with_capacity(2),
        };

        let worker = spawn_timer(
            "radar-discovery",
            radar.settings().discovery_interval(),
            scheduler.cancellation.clone(),
            {
                let radar = radar.clone();
                move || {
                    if let Err(err) = radar.discovery_pass() {
                        log::debug!("Discovery pass failed: {}", err);
                    }
                }
            },
        )?;
        scheduler.workers.push(worker);

        let worker = spawn_timer(
            "radar-validation",
            radar.settings().validation_interval(),
            scheduler.cancellation.clone(),
            {
                let radar = radar.clone();
                move || {
                    radar.validation_pass();
                }
            },
        )?;
        scheduler.workers.push(worker);

        Ok(scheduler)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Signal all workers to stop and wait until they did.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancellation.cancel();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::warn!("Radar worker panicked");
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
