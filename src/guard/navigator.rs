//! Navigator: the guard as a long-lived state machine for one UI shell.
//!
//! DESIGN
//! ======
//! A shell (one websocket connection) reports path changes with
//! [`Navigator::navigate`]. Each change bumps a generation counter, enters
//! `Loading`, and spawns a check task tagged with `(generation, path)`. When a
//! check finishes it applies its verdict only if its tag is still current:
//! - `Render` → `Authorized`
//! - `Redirect(target)` → `Unauthorized`, emit a [`RedirectEvent`], then
//!   navigate to `target`, which starts the next check
//!
//! A newer navigation aborts the previous task; a result that slips past the
//! abort is still dropped by the tag check, so a decision computed for a path
//! the user already left can never move them.
//!
//! Locking: `Control` sits behind a std mutex held only for bookkeeping,
//! never across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::decision::{Outcome, Verdict, evaluate};
use super::route::normalize;
use crate::backend::{ProfileLookup, Role, SessionContext, SessionProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// A check for the current path is in flight; render nothing.
    Loading,
    /// The check ended in a redirect; render nothing.
    Unauthorized,
    /// The current path may render.
    Authorized,
}

/// Observable state of a navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardSnapshot {
    pub generation: u64,
    /// Current path; `None` until the first navigation.
    pub path: Option<String>,
    pub state: GuardState,
    pub role: Option<Role>,
}

/// Navigation effect produced by a redirect verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectEvent {
    pub from: String,
    pub to: String,
}

struct Control {
    generation: u64,
    path: Option<String>,
    session: SessionContext,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    sessions: Arc<dyn SessionProvider>,
    profiles: Arc<dyn ProfileLookup>,
    control: Mutex<Control>,
    snapshots: watch::Sender<GuardSnapshot>,
    redirects: mpsc::UnboundedSender<RedirectEvent>,
}

/// Cheap to clone; clones share one state machine.
#[derive(Clone)]
pub struct Navigator {
    inner: Arc<Inner>,
}

impl Navigator {
    /// Create a navigator for one shell. Redirect effects are delivered on
    /// the returned receiver.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        profiles: Arc<dyn ProfileLookup>,
        session: SessionContext,
    ) -> (Self, mpsc::UnboundedReceiver<RedirectEvent>) {
        let (redirects, redirect_rx) = mpsc::unbounded_channel();
        let (snapshots, _) =
            watch::channel(GuardSnapshot { generation: 0, path: None, state: GuardState::Loading, role: None });
        let control = Control { generation: 0, path: None, session, task: None };
        let inner = Inner { sessions, profiles, control: Mutex::new(control), snapshots, redirects };
        (Self { inner: Arc::new(inner) }, redirect_rx)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GuardSnapshot> {
        self.inner.snapshots.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> GuardSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Report the shell's current path. The first call is the initial mount;
    /// later calls only start a check when the path actually changed.
    pub fn navigate(&self, path: &str) {
        let path = normalize(path).to_string();
        let mut control = self.lock();
        if control.path.as_deref() == Some(path.as_str()) {
            return;
        }
        self.begin_check(&mut control, path);
    }

    /// Swap the session (sign-in or sign-out in the shell) and re-check the
    /// current path with it.
    pub fn set_session(&self, session: SessionContext) {
        let mut control = self.lock();
        control.session = session;
        if let Some(path) = control.path.clone() {
            self.begin_check(&mut control, path);
        }
    }

    /// Abort any in-flight check.
    pub fn shutdown(&self) {
        let mut control = self.lock();
        if let Some(task) = control.task.take() {
            task.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Control> {
        self.inner
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_check(&self, control: &mut Control, path: String) {
        if let Some(previous) = control.task.take() {
            previous.abort();
        }
        control.generation += 1;
        control.path = Some(path.clone());
        let generation = control.generation;

        self.inner.snapshots.send_replace(GuardSnapshot {
            generation,
            path: Some(path.clone()),
            state: GuardState::Loading,
            role: None,
        });

        let navigator = self.clone();
        let session = control.session.clone();
        control.task = Some(tokio::spawn(async move {
            let verdict = evaluate(
                navigator.inner.sessions.as_ref(),
                navigator.inner.profiles.as_ref(),
                &session,
                &path,
            )
            .await;
            navigator.apply(generation, verdict);
        }));
    }

    fn apply(&self, generation: u64, verdict: Verdict) {
        let mut control = self.lock();
        if control.generation != generation || control.path.as_deref() != Some(verdict.path.as_str()) {
            debug!(path = %verdict.path, generation, current = control.generation, "navigator: discarding superseded check");
            return;
        }
        control.task = None;

        match verdict.outcome {
            Outcome::Render => {
                self.inner.snapshots.send_replace(GuardSnapshot {
                    generation,
                    path: Some(verdict.path),
                    state: GuardState::Authorized,
                    role: verdict.viewer.map(|v| v.role),
                });
            }
            Outcome::Redirect(target) => {
                self.inner.snapshots.send_replace(GuardSnapshot {
                    generation,
                    path: Some(verdict.path.clone()),
                    state: GuardState::Unauthorized,
                    role: None,
                });
                let event = RedirectEvent { from: verdict.path.clone(), to: target.to_string() };
                if self.inner.redirects.send(event).is_err() {
                    debug!(path = %verdict.path, %target, "navigator: shell gone, not following redirect");
                    return;
                }
                // Redirecting to the path already shown is not a path change.
                if target != verdict.path {
                    self.begin_check(&mut control, target.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "navigator_test.rs"]
mod tests;
