// src/refresh.rs
//! Drives the feed into the store: one load at a time (a new one supersedes
//! and cancels the previous) plus an optional fixed-interval auto-refresh.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::feed::types::{cancel_pair, fetch_cancellable, CancelHandle, FeedSource, Timeframe};
use crate::store::{LoadTicket, Store};

struct InFlight {
    ticket: LoadTicket,
    cancel: CancelHandle,
}

/// Cheap to clone; clones share the same in-flight request and ticker.
#[derive(Clone)]
pub struct RefreshController {
    store: Arc<Store>,
    source: Arc<dyn FeedSource>,
    timeframe: Timeframe,
    interval: Duration,
    inflight: Arc<Mutex<Option<InFlight>>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RefreshController {
    pub fn new(
        store: Arc<Store>,
        source: Arc<dyn FeedSource>,
        timeframe: Timeframe,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            source,
            timeframe,
            interval,
            inflight: Arc::new(Mutex::new(None)),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Start a load, cancelling any one still in flight. The returned handle
    /// completes once the outcome has been applied (or dropped as stale).
    pub fn refresh(&self) -> JoinHandle<()> {
        let (cancel, signal) = cancel_pair();
        let ticket = {
            let mut slot = self.inflight.lock();
            if let Some(prev) = slot.take() {
                tracing::debug!(target: "refresh", ticket = prev.ticket.id(), "superseding in-flight load");
                prev.cancel.cancel();
            }
            let ticket = self.store.begin_load();
            *slot = Some(InFlight { ticket, cancel });
            ticket
        };

        let store = Arc::clone(&self.store);
        let source = Arc::clone(&self.source);
        let inflight = Arc::clone(&self.inflight);
        let timeframe = self.timeframe;

        tokio::spawn(async move {
            tracing::debug!(target: "refresh", ticket = ticket.id(), source = source.name(), %timeframe, "load started");
            let res = fetch_cancellable(source.as_ref(), timeframe, signal).await;
            {
                let mut slot = inflight.lock();
                if slot.as_ref().is_some_and(|f| f.ticket == ticket) {
                    *slot = None;
                }
            }
            match res {
                Ok(records) => {
                    store.load_succeeded(ticket, records);
                }
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(target: "refresh", ticket = ticket.id(), "load cancelled");
                }
                Err(e) => {
                    store.load_failed(ticket, e.to_string());
                }
            }
        })
    }

    /// Cancel the in-flight load, if any. The store returns to idle without
    /// an error unless a newer load has started meanwhile.
    pub fn cancel(&self) {
        if let Some(prev) = self.inflight.lock().take() {
            // retire the ticket first so a result landing meanwhile is stale
            self.store.abandon_load(prev.ticket);
            prev.cancel.cancel();
            tracing::debug!(target: "refresh", ticket = prev.ticket.id(), source = self.source.name(), "load cancelled by caller");
        }
    }

    /// Start periodic refresh. The first tick fires immediately. Calling this
    /// again replaces the running ticker instead of adding a second one.
    pub fn start_auto_refresh(&self) {
        let mut slot = self.ticker.lock();
        if let Some(old) = slot.take() {
            old.abort();
        }

        let this = self.clone();
        let period = self.interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::info!(target: "refresh", timeframe = %this.timeframe, "auto-refresh tick");
                this.refresh();
            }
        }));
        tracing::info!(target: "refresh", interval_secs = period.as_secs(), "auto-refresh started");
    }

    pub fn stop_auto_refresh(&self) {
        if let Some(h) = self.ticker.lock().take() {
            h.abort();
            tracing::info!(target: "refresh", "auto-refresh stopped");
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.ticker.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the ticker and cancel whatever is in flight.
    pub fn shutdown(&self) {
        self.stop_auto_refresh();
        self.cancel();
    }
}
