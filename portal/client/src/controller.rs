use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::probe::{ProbeError, SessionProbe, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// How long without activity before the session is abandoned locally.
    pub inactivity_limit: Duration,
    /// Minimum spacing between validation requests. Activity inside the
    /// window still resets the inactivity deadline, it just does not hit the
    /// server.
    pub renew_interval: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            inactivity_limit: Duration::from_secs(15 * 60),
            renew_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// Nothing happened for the whole inactivity window.
    Inactivity,
    /// The server said the session is gone.
    Rejected,
    /// The server could not be reached or could not answer.
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Drop local state and send the user to the login screen.
    ForceLogin(LogoutReason),
}

/// Cloneable handle UI surfaces use to report user activity.
#[derive(Clone)]
pub struct ActivityHandle {
    tx: mpsc::Sender<()>,
}

impl ActivityHandle {
    /// Cheap and lossy. A burst of calls collapses into one pending edge.
    pub fn touch(&self) {
        self.tx.try_send(()).ok();
    }
}

/// Owns the keepalive loop for one logged-in session. State is entirely
/// per-instance, two controllers never share timers or throttles.
pub struct SessionController {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    activity: ActivityHandle,
}

impl SessionController {
    /// Spawns the keepalive loop. The returned receiver yields at most one
    /// [`SessionEvent::ForceLogin`], after which the loop is done.
    pub fn spawn(
        probe: Arc<dyn SessionProbe>,
        config: KeepaliveConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(1);
        let (activity_tx, activity_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_loop(probe, config, activity_rx, events_tx, shutdown_rx));

        (
            Self {
                shutdown: Some(shutdown_tx),
                task,
                activity: ActivityHandle { tx: activity_tx },
            },
            events_rx,
        )
    }

    pub fn activity(&self) -> ActivityHandle {
        self.activity.clone()
    }

    /// Stops the loop without emitting any event and waits for it to finish.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }

        (&mut self.task).await.ok();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }

        self.task.abort();
    }
}

type ProbeFuture = Pin<Box<dyn Future<Output = Result<Verdict, ProbeError>> + Send>>;

async fn run_loop(
    probe: Arc<dyn SessionProbe>,
    config: KeepaliveConfig,
    mut activity: mpsc::Receiver<()>,
    events: mpsc::Sender<SessionEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut deadline = Instant::now() + config.inactivity_limit;
    let mut last_renew: Option<Instant> = None;
    let mut in_flight: Option<ProbeFuture> = None;

    let reason = loop {
        select! {
            biased;

            _ = &mut shutdown => {
                return;
            }

            verdict = async { in_flight.as_mut().expect("in_flight checked").await }, if in_flight.is_some() => {
                in_flight = None;

                match verdict {
                    Ok(Verdict { valid: true, .. }) => {}
                    Ok(Verdict { valid: false, .. }) => {
                        // The server is the authority here, no retry.
                        break LogoutReason::Rejected;
                    }
                    Err(err) => {
                        tracing::debug!("session validation failed: {}", err);
                        break LogoutReason::Unreachable;
                    }
                }
            }

            Some(()) = activity.recv() => {
                deadline = Instant::now() + config.inactivity_limit;

                let due = last_renew.map_or(true, |at| at.elapsed() >= config.renew_interval);

                // At most one validation in flight. Activity during a probe
                // resets the deadline above but never stacks requests.
                if due && in_flight.is_none() {
                    last_renew = Some(Instant::now());
                    let probe = probe.clone();
                    in_flight = Some(Box::pin(async move { probe.validate().await }));
                }
            }

            _ = tokio::time::sleep_until(deadline) => {
                break LogoutReason::Inactivity;
            }
        }
    };

    events.send(SessionEvent::ForceLogin(reason)).await.ok();
}
