//! # Application State Store
//! Single owner of the dashboard state. Every mutation goes through one of
//! the named transitions below; readers get clones, never a handle into the
//! live state. Subscribers are notified after each transition via a
//! broadcast channel.
//!
//! Loading follows `Idle -> Loading -> Idle(ok | error)`. Each
//! [`Store::begin_load`] hands out a [`LoadTicket`]; result transitions
//! carrying an older ticket are dropped, so a superseded fetch can never
//! overwrite a newer outcome.

use metrics::{counter, gauge};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::aggregate::{self, HourBucket, MagnitudeBucket, Statistics};
use crate::filter::{apply_filters, sort_records, FilterPatch, FilterState, SortKey, SortOrder};
use crate::model::{self, EarthquakeRecord, MapMarker};

const EVENT_CAPACITY: usize = 64;

/// Snapshot of everything the views read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplicationState {
    /// Feed order, replaced wholesale on each successful load.
    pub records: Vec<EarthquakeRecord>,
    /// Always `apply_filters(records, filters)`.
    pub filtered_records: Vec<EarthquakeRecord>,
    pub filters: FilterState,
    /// Id of the selected record; independent of filtering.
    pub selected_id: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ApplicationState {
    pub fn selected_record(&self) -> Option<&EarthquakeRecord> {
        let id = self.selected_id.as_deref()?;
        self.records.iter().find(|r| r.id == id)
    }

    fn refilter(&mut self) {
        self.filtered_records = apply_filters(&self.records, &self.filters);
        gauge!("store_filtered_records").set(self.filtered_records.len() as f64);
    }
}

/// Identity of one load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// What changed; sent to subscribers after the transition is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    LoadStarted { ticket: LoadTicket },
    LoadSucceeded { total: usize, filtered: usize },
    LoadFailed { message: String },
    LoadAbandoned,
    FiltersChanged { filtered: usize },
    SelectionChanged { id: Option<String> },
    ErrorCleared,
}

struct Inner {
    state: ApplicationState,
    /// Only a ticket equal to this may apply a result. Bumped by
    /// `begin_load` and by `abandon_load`.
    generation: u64,
}

pub struct Store {
    inner: RwLock<Inner>,
    tx: broadcast::Sender<StoreEvent>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(Inner {
                state: ApplicationState::default(),
                generation: 0,
            }),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    fn notify(&self, ev: StoreEvent) {
        // no subscribers is fine
        let _ = self.tx.send(ev);
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Start a load: `loading = true`, prior error cleared.
    pub fn begin_load(&self) -> LoadTicket {
        let ticket = {
            let mut g = self.inner.write();
            g.generation += 1;
            g.state.loading = true;
            g.state.error = None;
            LoadTicket(g.generation)
        };
        tracing::debug!(target: "store", ticket = ticket.id(), "load started");
        self.notify(StoreEvent::LoadStarted { ticket });
        ticket
    }

    /// Replace records wholesale. Returns `false` (and changes nothing) if
    /// `ticket` has been superseded.
    pub fn load_succeeded(&self, ticket: LoadTicket, records: Vec<EarthquakeRecord>) -> bool {
        let (total, filtered, selection_gone) = {
            let mut g = self.inner.write();
            if ticket.0 != g.generation {
                drop(g);
                self.reject_stale(ticket, "success");
                return false;
            }
            let st = &mut g.state;
            st.records = records;
            st.refilter();
            st.loading = false;
            st.error = None;
            let selection_gone = st
                .selected_id
                .as_deref()
                .is_some_and(|id| !st.records.iter().any(|r| r.id == id));
            if selection_gone {
                tracing::debug!(target: "store", id = ?st.selected_id, "selected record gone after reload");
                st.selected_id = None;
            }
            (st.records.len(), st.filtered_records.len(), selection_gone)
        };
        gauge!("store_records").set(total as f64);
        tracing::info!(target: "store", ticket = ticket.id(), total, filtered, "records loaded");
        self.notify(StoreEvent::LoadSucceeded { total, filtered });
        if selection_gone {
            self.notify(StoreEvent::SelectionChanged { id: None });
        }
        true
    }

    /// Record a failed load. Existing records stay visible.
    pub fn load_failed(&self, ticket: LoadTicket, message: impl Into<String>) -> bool {
        let message = message.into();
        {
            let mut g = self.inner.write();
            if ticket.0 != g.generation {
                drop(g);
                self.reject_stale(ticket, "failure");
                return false;
            }
            g.state.error = Some(message.clone());
            g.state.loading = false;
        }
        tracing::warn!(target: "store", ticket = ticket.id(), error = %message, "load failed");
        self.notify(StoreEvent::LoadFailed { message });
        true
    }

    /// Return to idle without an error, for an explicitly cancelled load that
    /// nothing newer replaced. The ticket is retired, so a result that races
    /// the cancellation is dropped as stale.
    pub fn abandon_load(&self, ticket: LoadTicket) -> bool {
        {
            let mut g = self.inner.write();
            if ticket.0 != g.generation || !g.state.loading {
                return false;
            }
            g.generation += 1;
            g.state.loading = false;
        }
        tracing::debug!(target: "store", ticket = ticket.id(), "load abandoned");
        self.notify(StoreEvent::LoadAbandoned);
        true
    }

    fn reject_stale(&self, ticket: LoadTicket, outcome: &'static str) {
        counter!("store_stale_responses_total").increment(1);
        tracing::debug!(target: "store", ticket = ticket.id(), outcome, "dropping superseded load result");
    }

    /// Merge a partial filter update and recompute the filtered set.
    pub fn set_filters(&self, patch: FilterPatch) {
        let filtered = {
            let mut g = self.inner.write();
            g.state.filters.merge(patch);
            g.state.refilter();
            g.state.filtered_records.len()
        };
        self.notify(StoreEvent::FiltersChanged { filtered });
    }

    pub fn reset_filters(&self) {
        let filtered = {
            let mut g = self.inner.write();
            g.state.filters = FilterState::default();
            g.state.refilter();
            g.state.filtered_records.len()
        };
        self.notify(StoreEvent::FiltersChanged { filtered });
    }

    /// Select a record by id, or clear with `None`. Ids not present in the
    /// current records are rejected.
    pub fn select(&self, id: Option<&str>) -> bool {
        {
            let mut g = self.inner.write();
            match id {
                Some(id) if !g.state.records.iter().any(|r| r.id == id) => {
                    drop(g);
                    tracing::warn!(target: "store", id, "select: unknown record id");
                    return false;
                }
                _ => g.state.selected_id = id.map(str::to_string),
            }
        }
        self.notify(StoreEvent::SelectionChanged {
            id: id.map(str::to_string),
        });
        true
    }

    /// Map collaborator callback for an activated marker.
    pub fn marker_activated(&self, id: &str) -> bool {
        self.select(Some(id))
    }

    pub fn clear_error(&self) {
        self.inner.write().state.error = None;
        self.notify(StoreEvent::ErrorCleared);
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> ApplicationState {
        self.inner.read().state.clone()
    }

    pub fn records(&self) -> Vec<EarthquakeRecord> {
        self.inner.read().state.records.clone()
    }

    pub fn filtered_records(&self) -> Vec<EarthquakeRecord> {
        self.inner.read().state.filtered_records.clone()
    }

    pub fn filters(&self) -> FilterState {
        self.inner.read().state.filters.clone()
    }

    pub fn selected_record(&self) -> Option<EarthquakeRecord> {
        self.inner.read().state.selected_record().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().state.loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().state.error.clone()
    }

    /// `(filtered, total)` for the "N of M earthquakes" caption.
    pub fn counts(&self) -> (usize, usize) {
        let g = self.inner.read();
        (g.state.filtered_records.len(), g.state.records.len())
    }

    /// Filtered records, newest first.
    pub fn list_view(&self) -> Vec<EarthquakeRecord> {
        let mut v = self.filtered_records();
        sort_records(&mut v, SortKey::Time, SortOrder::Descending);
        v
    }

    /// Markers for the filtered records that have coordinates.
    pub fn map_markers(&self) -> Vec<MapMarker> {
        model::map_markers(&self.inner.read().state.filtered_records)
    }

    pub fn statistics(&self) -> Statistics {
        aggregate::aggregate(&self.inner.read().state.records)
    }

    pub fn filtered_statistics(&self) -> Statistics {
        aggregate::aggregate(&self.inner.read().state.filtered_records)
    }

    pub fn magnitude_histogram(&self) -> Vec<MagnitudeBucket> {
        aggregate::magnitude_histogram(&self.inner.read().state.records)
    }

    pub fn hourly_activity(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<HourBucket> {
        aggregate::hourly_activity(&self.inner.read().state.records, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, mag: f64, place: &str) -> EarthquakeRecord {
        let mut r = EarthquakeRecord::new(id);
        r.magnitude = Some(mag);
        r.place = Some(place.to_string());
        r
    }

    #[test]
    fn starts_empty_and_idle() {
        let s = Store::new();
        assert_eq!(s.snapshot(), ApplicationState::default());
        assert!(!s.is_loading());
    }

    #[test]
    fn begin_load_clears_error_optimistically() {
        let s = Store::new();
        let t = s.begin_load();
        assert!(s.load_failed(t, "boom"));
        assert_eq!(s.error().as_deref(), Some("boom"));
        let _t2 = s.begin_load();
        assert!(s.is_loading());
        assert_eq!(s.error(), None);
    }

    #[test]
    fn clear_error_leaves_records_alone() {
        let s = Store::new();
        let t = s.begin_load();
        s.load_succeeded(t, vec![rec("a", 1.0, "x")]);
        let t = s.begin_load();
        s.load_failed(t, "nope");
        s.clear_error();
        assert_eq!(s.error(), None);
        assert_eq!(s.records().len(), 1);
        assert!(!s.is_loading());
    }

    #[test]
    fn abandon_only_applies_to_newest_pending_load() {
        let s = Store::new();
        let t1 = s.begin_load();
        let t2 = s.begin_load();
        assert!(!s.abandon_load(t1));
        assert!(s.is_loading());
        assert!(s.abandon_load(t2));
        assert!(!s.is_loading());
        assert_eq!(s.error(), None);
    }

    #[test]
    fn abandoned_ticket_cannot_apply_a_result() {
        let s = Store::new();
        let t = s.begin_load();
        s.load_succeeded(t, vec![rec("keep", 2.0, "x")]);

        let t = s.begin_load();
        assert!(s.abandon_load(t));
        assert!(!s.load_succeeded(t, vec![rec("late", 5.0, "y")]));
        assert!(!s.load_failed(t, "late failure"));
        assert!(!s.abandon_load(t));

        assert_eq!(s.records()[0].id, "keep");
        assert_eq!(s.error(), None);
        assert!(!s.is_loading());

        // the next load gets a fresh ticket and applies normally
        let t = s.begin_load();
        assert!(s.load_succeeded(t, vec![rec("next", 1.0, "z")]));
        assert_eq!(s.records()[0].id, "next");
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let s = Store::new();
        let t = s.begin_load();
        s.load_succeeded(t, vec![rec("a", 1.0, "x")]);
        assert!(!s.select(Some("zzz")));
        assert!(s.marker_activated("a"));
        assert_eq!(s.selected_record().map(|r| r.id), Some("a".to_string()));
        assert!(s.select(None));
        assert_eq!(s.selected_record(), None);
    }

    #[tokio::test]
    async fn subscribers_see_transitions_in_order() {
        let s = Store::new();
        let mut rx = s.subscribe();
        let t = s.begin_load();
        s.load_succeeded(t, vec![rec("a", 5.0, "Japan")]);
        s.set_filters(FilterPatch::min_magnitude(6.0));

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::LoadStarted { ticket: t });
        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::LoadSucceeded { total: 1, filtered: 1 }
        );
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::FiltersChanged { filtered: 0 });
    }
}
