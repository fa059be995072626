//! Keeps one poll view in sync with the Authoritative Store.
//!
//! A refresh runs on a fixed cadence and whenever a local change to the
//! watched poll is published. Writes caused by the refresh itself are tagged
//! [`ChangeOrigin::Remote`] and do not retrigger it. A confirmed vote moves the
//! view to `Viewing` straight from the local copy, without a refresh.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use domains::PollId;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use super::{ChangeOrigin, LocalMirror, MirrorEvent, PollView};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(1500);

pub struct Reconciler {
    mirror: Arc<LocalMirror>,
    poll_id: PollId,
    interval: Option<Duration>,
}

impl Reconciler {
    pub fn new(mirror: Arc<LocalMirror>, poll_id: impl Into<PollId>) -> Self {
        Self {
            mirror,
            poll_id: poll_id.into(),
            interval: Some(DEFAULT_REFRESH_INTERVAL),
        }
    }

    /// `None` disables the timer; only published changes trigger a refresh.
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval;
        self
    }

    pub fn spawn(self) -> ReconcilerHandle {
        let (tx, rx) = watch::channel(PollView::loading(self.poll_id.clone()));
        let task = tokio::spawn(self.run(tx));
        ReconcilerHandle { view: rx, task }
    }

    async fn run(self, tx: watch::Sender<PollView>) {
        let mut events = self.mirror.subscribe();

        let first = self.mirror.open_poll(&self.poll_id).await;
        tx.send_modify(|view| view.observe(first));

        let mut ticker = self.interval.map(|period| {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {}
                event = events.recv() => match event {
                    Ok(event) if event.poll_id != self.poll_id => continue,
                    Ok(MirrorEvent { origin: ChangeOrigin::Local, .. }) => {}
                    Ok(MirrorEvent { origin: ChangeOrigin::Confirmed { option_id }, .. }) => {
                        let local = self.mirror.participation(&self.poll_id).await;
                        tx.send_modify(|view| {
                            view.vote_confirmed(option_id);
                            view.observe(local);
                        });
                        continue;
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "mirror events lagged"),
                    Err(RecvError::Closed) => break,
                },
            }

            let refreshed = self.mirror.reconcile(&self.poll_id).await;
            tx.send_modify(|view| view.observe(refreshed));
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

/// Owns the background refresh task; dropping it stops the task.
pub struct ReconcilerHandle {
    view: watch::Receiver<PollView>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    pub fn view(&self) -> watch::Receiver<PollView> {
        self.view.clone()
    }

    pub fn current(&self) -> PollView {
        self.view.borrow().clone()
    }

    /// Stops the refresh task. Dropping the handle does the same.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
