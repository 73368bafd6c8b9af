//! Optimistic update / rollback envelope shared by the controllers.
//!
//! Each mutation captures a pre-image, applies its tentative post-image to the
//! published state, and hands back a [`Compensation`] that restores the
//! pre-image if the remote call fails. Every step is a single `watch`
//! modification, so subscribers never observe a half-applied change.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Published state that can carry the message of the last failure.
pub trait ErrorSlot {
    fn set_error(&mut self, error: Option<String>);
}

/// Undo closure for one optimistic change.
pub struct Compensation<S>(Box<dyn FnOnce(&mut S) + Send>);

impl<S> Compensation<S> {
    pub fn new(undo: impl FnOnce(&mut S) + Send + 'static) -> Self {
        Self(Box::new(undo))
    }

    fn apply(self, state: &mut S) {
        (self.0)(state)
    }
}

pub enum Prepared<S> {
    /// Nothing to do; no remote call is made.
    Unchanged,
    Applied(Compensation<S>),
}

/// Explicit container for one published state.
pub struct StateStore<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for StateStore<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S> StateStore<S>
where
    S: ErrorSlot + Clone + Send + Sync + 'static,
{
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> S {
        self.tx.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.tx.send_modify(f);
    }

    pub fn record_failure(&self, error: &Error) {
        let message = error.to_string();
        self.tx.send_modify(|state| state.set_error(Some(message)));
    }

    pub fn clear_error(&self) {
        self.tx.send_modify(|state| state.set_error(None));
    }

    /// Runs one optimistic mutation.
    ///
    /// `prepare` validates and applies the tentative change. If it fails the
    /// state is untouched and subscribers are not notified. `request` is only
    /// invoked when `prepare` applied something. On success `commit` folds
    /// the authoritative result into the state; on failure the compensation
    /// runs and the error is published and returned.
    ///
    /// There is no cancellation: once `request` is started its outcome is
    /// always applied, even if a later mutation on the same entity resolved
    /// first.
    pub async fn run_optimistic<T, P, R, Fut, C>(
        &self,
        prepare: P,
        request: R,
        commit: C,
    ) -> Result<Option<T>>
    where
        P: FnOnce(&mut S) -> Result<Prepared<S>>,
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: FnOnce(&mut S, &T),
    {
        let mut prepared: Result<Prepared<S>> = Ok(Prepared::Unchanged);
        self.tx.send_if_modified(|state| {
            prepared = prepare(state);
            matches!(prepared, Ok(Prepared::Applied(_)))
        });

        let compensation = match prepared? {
            Prepared::Unchanged => {
                debug!("optimistic mutation is a no-op");
                return Ok(None);
            }
            Prepared::Applied(compensation) => compensation,
        };

        match request().await {
            Ok(value) => {
                self.tx.send_modify(|state| commit(state, &value));
                Ok(Some(value))
            }
            Err(err) => {
                warn!(error = %err, "remote mutation failed, rolling back");
                let message = err.to_string();
                self.tx.send_modify(|state| {
                    compensation.apply(state);
                    state.set_error(Some(message));
                });
                Err(err)
            }
        }
    }
}
