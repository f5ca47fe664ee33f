//! Request lifecycle shared by the search and detail controllers.
//!
//! A lifecycle owns at most one in-flight request. Starting a new request or
//! resetting aborts the previous task and advances the generation. The
//! generation check and the state publish happen under one lock, so a
//! continuation that slipped past the abort still cannot touch state once
//! it has been superseded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::errors::CatalogError;
use crate::types::{FetchState, RequestGeneration};

struct Shared<T> {
    current: Mutex<RequestGeneration>,
    state: watch::Sender<FetchState<T>>,
}

impl<T> Shared<T> {
    /// Invalidates the current generation and publishes `next`.
    fn advance(&self, next: Option<FetchState<T>>) -> RequestGeneration {
        let mut current = self.current.lock();
        *current = current.next();
        if let Some(next) = next {
            self.state.send_replace(next);
        }
        *current
    }

    /// Publishes the outcome of `generation` if it is still current.
    fn settle(
        &self,
        label: &'static str,
        generation: RequestGeneration,
        outcome: Result<T, CatalogError>,
    ) -> bool {
        let current = self.current.lock();
        if *current != generation {
            trace!(label, %generation, current = %*current, "Discarding superseded response");
            return false;
        }

        let next = match outcome {
            Ok(value) => {
                debug!(label, %generation, "Request succeeded");
                FetchState::Ready(value)
            }
            Err(e) => {
                debug!(label, %generation, error = %e, "Request failed");
                FetchState::Failed {
                    message: e.to_string(),
                }
            }
        };
        self.state.send_replace(next);
        true
    }
}

/// One cancellable request slot publishing [`FetchState`].
pub struct FetchLifecycle<T> {
    label: &'static str,
    shared: Arc<Shared<T>>,
    in_flight: Option<JoinHandle<()>>,
}

impl<T> std::fmt::Debug for FetchLifecycle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchLifecycle")
            .field("label", &self.label)
            .field("generation", &*self.shared.current.lock())
            .field("in_flight", &self.in_flight.is_some())
            .finish()
    }
}

impl<T> FetchLifecycle<T>
where
    T: Send + Sync + 'static,
{
    /// Creates an idle lifecycle. `label` tags log lines.
    pub fn new(label: &'static str) -> Self {
        let (state, _) = watch::channel(FetchState::Idle);
        Self {
            label,
            shared: Arc::new(Shared {
                current: Mutex::new(RequestGeneration::default()),
                state,
            }),
            in_flight: None,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> FetchState<T>
    where
        T: Clone,
    {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every published transition.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.shared.state.subscribe()
    }

    pub fn generation(&self) -> RequestGeneration {
        *self.shared.current.lock()
    }

    /// Whether a request task is still running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels any request and publishes `Idle`.
    pub fn reset(&mut self) {
        self.abort_in_flight();
        let generation = self.shared.advance(Some(FetchState::Idle));
        debug!(label = self.label, %generation, "Idle");
    }

    /// Cancels any request and starts `fetch` as the new current request.
    ///
    /// `Loading` is published before this returns. With a non-zero `delay`
    /// the fetch waits that long first; a newer request cancels it during the
    /// wait just like during the fetch.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<F>(&mut self, delay: Duration, fetch: F) -> RequestGeneration
    where
        F: Future<Output = Result<T, CatalogError>> + Send + 'static,
    {
        self.abort_in_flight();
        let generation = self.shared.advance(Some(FetchState::Loading));
        debug!(label = self.label, %generation, "Loading");

        let shared = Arc::clone(&self.shared);
        let label = self.label;
        self.in_flight = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let outcome = fetch.await;
            shared.settle(label, generation, outcome);
        }));

        generation
    }

    /// Cancels any request without publishing a transition.
    ///
    /// Used on teardown: subscribers keep seeing the last published state.
    pub fn cancel(&mut self) {
        let had_request = self.in_flight.is_some();
        self.abort_in_flight();
        let generation = self.shared.advance(None);
        if had_request {
            debug!(label = self.label, %generation, "Cancelled");
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                trace!(label = self.label, "Aborting in-flight request");
            }
            handle.abort();
        }
    }
}

impl<T> Drop for FetchLifecycle<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        let mut current = self.shared.current.lock();
        *current = current.next();
    }
}
