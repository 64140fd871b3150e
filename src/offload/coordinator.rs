//! Main-thread side of the offload protocol.
//!
//! One [`Coordinator`] owns every piece of bookkeeping: the last issued request
//! id, what the worker was last sent (for diffing), and the id→entry index
//! used to turn the worker's id lists back into entries.
//!
//! ## Request flow
//!
//! ```text
//! request(state) ──► regional sort?   ──► Recompute::Ranked(job)   (async, main thread)
//!                ──► worker present?  ──► post JSON, Recompute::Offloaded
//!                ──► otherwise         ──► Recompute::Completed(view)
//!
//! poll(now)      ──► reply id == latest pending id ──► Some(view)
//!                ──► older id                       ──► dropped
//!                ──► pending past the timeout       ──► Some(view computed here)
//! ```

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::CatalogItem;
use crate::engine::{FilterOptions, SortContext, SortDirection, SortKey, compute};
use crate::error::LookupError;
use crate::store::State;

use super::protocol::{WorkerRequest, WorkerResponse};

/// Message channel to a background worker.
pub trait WorkerPort {
    /// Queue a request. `false` means the worker is gone.
    fn post(&mut self, message: String) -> bool;
    /// Next reply, if one has arrived.
    fn try_recv(&mut self) -> Option<String>;
}

/// External regional-rank lookup: id → rank within one region.
pub trait RankLookup {
    fn ranks(&self, region: &str) -> impl Future<Output = Result<HashMap<u32, u32>, LookupError>>;
}

/// Everything needed to recompute one view without the store.
#[derive(Debug, Clone)]
struct ViewInputs {
    catalog: Arc<Vec<CatalogItem>>,
    filters: FilterOptions,
    sort_key: SortKey,
    sort_direction: SortDirection,
    favorites: BTreeSet<u32>,
}

impl ViewInputs {
    fn from_state(state: &State) -> Self {
        Self {
            catalog: Arc::clone(&state.catalog),
            filters: state.filters.clone(),
            sort_key: state.sort_key.clone(),
            sort_direction: state.sort_direction,
            favorites: state.favorites.clone(),
        }
    }

    fn compute(&self) -> Vec<CatalogItem> {
        let ctx = SortContext {
            favorites: Some(&self.favorites),
            ranks: None,
        };
        compute(&self.catalog, &self.filters, &self.sort_key, self.sort_direction, &ctx)
            .into_iter()
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
struct Pending {
    request_id: u64,
    issued_at_ms: u64,
    inputs: ViewInputs,
}

/// What a call to [`Coordinator::request`] did.
#[derive(Debug)]
pub enum Recompute {
    /// Sent to the worker; the view arrives through [`Coordinator::poll`].
    Offloaded { request_id: u64 },
    /// Computed on the calling thread.
    Completed { request_id: u64, view: Vec<CatalogItem> },
    /// Needs the async rank lookup; run the job, then hand the result to
    /// [`Coordinator::accept_ranked`].
    Ranked(RankedJob),
}

/// Regional-sort computation detached from the coordinator.
#[derive(Debug, Clone)]
pub struct RankedJob {
    pub request_id: u64,
    region: Option<String>,
    catalog: Arc<Vec<CatalogItem>>,
    filters: FilterOptions,
    sort_direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub request_id: u64,
    pub view: Vec<CatalogItem>,
}

impl RankedJob {
    /// Look up the ranks and compute the view. A failed or missing lookup
    /// leaves every entry unranked, which keeps filter order.
    pub async fn run<L: RankLookup>(self, lookup: &L) -> RankedResult {
        let ranks = match &self.region {
            Some(region) => match lookup.ranks(region).await {
                Ok(ranks) => ranks,
                Err(e) => {
                    warn!(region = %region, error = %e, "regional rank lookup failed");
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };
        let ctx = SortContext {
            favorites: None,
            ranks: Some(&ranks),
        };
        let view = compute(
            &self.catalog,
            &self.filters,
            &SortKey::Regional,
            self.sort_direction,
            &ctx,
        )
        .into_iter()
        .cloned()
        .collect();
        RankedResult {
            request_id: self.request_id,
            view,
        }
    }
}

pub struct Coordinator {
    worker: Option<Box<dyn WorkerPort>>,
    timeout_ms: u64,
    latest_id: u64,
    pending: Option<Pending>,
    synced_catalog: Option<Arc<Vec<CatalogItem>>>,
    synced_favorites: Option<BTreeSet<u32>>,
    index_catalog: Option<Arc<Vec<CatalogItem>>>,
    index: HashMap<u32, usize>,
}

impl Coordinator {
    pub fn new(worker: Option<Box<dyn WorkerPort>>, timeout_ms: u64) -> Self {
        Self {
            worker,
            timeout_ms,
            latest_id: 0,
            pending: None,
            synced_catalog: None,
            synced_favorites: None,
            index_catalog: None,
            index: HashMap::new(),
        }
    }

    /// Coordinator with no worker: every request completes synchronously.
    pub fn synchronous() -> Self {
        Self::new(None, 0)
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn latest_request_id(&self) -> u64 {
        self.latest_id
    }

    fn next_id(&mut self) -> u64 {
        self.latest_id += 1;
        // A newer request supersedes whatever was in flight.
        self.pending = None;
        self.latest_id
    }

    /// Forget what the worker has cached so the next request resends it.
    fn invalidate_sync(&mut self) {
        self.synced_catalog = None;
        self.synced_favorites = None;
    }

    /// Start recomputing the derived view for `state`.
    pub fn request(&mut self, state: &State, now_ms: u64) -> Recompute {
        if state.sort_key == SortKey::Regional {
            return Recompute::Ranked(self.begin_ranked(state));
        }
        let request_id = self.next_id();
        let inputs = ViewInputs::from_state(state);
        if self.post_to_worker(&inputs, request_id) {
            self.pending = Some(Pending {
                request_id,
                issued_at_ms: now_ms,
                inputs,
            });
            return Recompute::Offloaded { request_id };
        }
        Recompute::Completed {
            request_id,
            view: inputs.compute(),
        }
    }

    fn post_to_worker(&mut self, inputs: &ViewInputs, request_id: u64) -> bool {
        let Some(worker) = self.worker.as_mut() else {
            return false;
        };
        let send_catalog = !self
            .synced_catalog
            .as_ref()
            .is_some_and(|synced| Arc::ptr_eq(synced, &inputs.catalog));
        let send_favorites = inputs.sort_key.needs_favorites()
            && self.synced_favorites.as_ref() != Some(&inputs.favorites);
        let favorites: Vec<u32> = if send_favorites {
            inputs.favorites.iter().copied().collect()
        } else {
            Vec::new()
        };

        let message = WorkerRequest {
            catalog: send_catalog.then_some(inputs.catalog.as_slice()),
            filter_options: &inputs.filters,
            sort_key: inputs.sort_key.as_str(),
            sort_direction: inputs.sort_direction,
            comparator_input: send_favorites.then_some(favorites.as_slice()),
            request_id,
        }
        .to_json();
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "could not serialize worker request");
                return false;
            }
        };
        if !worker.post(message) {
            warn!("filter worker unavailable, computing on main thread");
            self.worker = None;
            return false;
        }
        if send_catalog {
            self.synced_catalog = Some(Arc::clone(&inputs.catalog));
        }
        if send_favorites {
            self.synced_favorites = Some(inputs.favorites.clone());
        }
        debug!(request_id, send_catalog, send_favorites, "offloaded filter request");
        true
    }

    /// Drain worker replies and check the timeout. Returns the new view when
    /// the current request has been answered or recomputed.
    pub fn poll(&mut self, now_ms: u64) -> Option<Vec<CatalogItem>> {
        let mut view = None;
        while let Some(raw) = self.worker.as_mut().and_then(|w| w.try_recv()) {
            if let Some(accepted) = self.accept_reply(&raw) {
                view = Some(accepted);
            }
        }
        if view.is_some() {
            return view;
        }

        let timed_out = self
            .pending
            .as_ref()
            .is_some_and(|p| now_ms.saturating_sub(p.issued_at_ms) >= self.timeout_ms);
        if timed_out && let Some(pending) = self.pending.take() {
            warn!(
                request_id = pending.request_id,
                "filter worker timed out, computing on main thread"
            );
            self.invalidate_sync();
            return Some(pending.inputs.compute());
        }
        None
    }

    fn accept_reply(&mut self, raw: &str) -> Option<Vec<CatalogItem>> {
        let Some(response) = WorkerResponse::parse(raw) else {
            warn!("ignoring unparseable worker reply");
            return None;
        };
        let is_current = self
            .pending
            .as_ref()
            .is_some_and(|p| p.request_id == response.request_id);
        if !is_current {
            debug!(
                request_id = response.request_id,
                latest = self.latest_id,
                "discarding stale worker reply"
            );
            return None;
        }
        let pending = self.pending.take()?;
        if let Some(error) = response.error {
            // The worker's cache may not match what we think it has.
            warn!(request_id = response.request_id, %error, "worker reported an error");
            self.invalidate_sync();
            return Some(pending.inputs.compute());
        }
        Some(self.resolve(&pending.inputs.catalog, &response.result_ids))
    }

    /// Map ids back to entries. The index is rebuilt only when the catalog
    /// changes; ids missing from the catalog are skipped.
    pub fn resolve(&mut self, catalog: &Arc<Vec<CatalogItem>>, ids: &[u32]) -> Vec<CatalogItem> {
        let stale = !self
            .index_catalog
            .as_ref()
            .is_some_and(|indexed| Arc::ptr_eq(indexed, catalog));
        if stale {
            self.index = catalog
                .iter()
                .enumerate()
                .map(|(pos, item)| (item.id, pos))
                .collect();
            self.index_catalog = Some(Arc::clone(catalog));
        }
        ids.iter()
            .filter_map(|id| self.index.get(id).map(|pos| catalog[*pos].clone()))
            .collect()
    }

    /// Issue a request id for the regional sort and package its inputs.
    pub fn begin_ranked(&mut self, state: &State) -> RankedJob {
        RankedJob {
            request_id: self.next_id(),
            region: state.catalog_index.clone(),
            catalog: Arc::clone(&state.catalog),
            filters: state.filters.clone(),
            sort_direction: state.sort_direction,
        }
    }

    /// Accept a finished regional job unless a newer request superseded it.
    pub fn accept_ranked(&mut self, result: RankedResult) -> Option<Vec<CatalogItem>> {
        if result.request_id != self.latest_id {
            debug!(
                request_id = result.request_id,
                latest = self.latest_id,
                "discarding stale regional result"
            );
            return None;
        }
        Some(result.view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offload::worker::WorkerState;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Records posted messages; replies are pushed by the test in any order.
    #[derive(Default)]
    struct ManualPort {
        sent: Rc<RefCell<Vec<String>>>,
        replies: Rc<RefCell<VecDeque<String>>>,
        closed: bool,
    }

    impl WorkerPort for ManualPort {
        fn post(&mut self, message: String) -> bool {
            if self.closed {
                return false;
            }
            self.sent.borrow_mut().push(message);
            true
        }

        fn try_recv(&mut self) -> Option<String> {
            self.replies.borrow_mut().pop_front()
        }
    }

    struct Harness {
        coordinator: Coordinator,
        sent: Rc<RefCell<Vec<String>>>,
        replies: Rc<RefCell<VecDeque<String>>>,
    }

    fn harness() -> Harness {
        let port = ManualPort::default();
        let sent = Rc::clone(&port.sent);
        let replies = Rc::clone(&port.replies);
        Harness {
            coordinator: Coordinator::new(Some(Box::new(port)), 1_000),
            sent,
            replies,
        }
    }

    /// Answer a recorded request with a real worker, preserving its id.
    fn answer(worker: &mut WorkerState, message: &str) -> String {
        worker.handle_message(message).unwrap()
    }

    fn state() -> State {
        State {
            catalog: Arc::new(vec![
                CatalogItem::new(1, "bulbasaur", &["grass", "poison"]),
                CatalogItem::new(4, "charmander", &["fire"]),
                CatalogItem::new(7, "squirtle", &["water"]),
            ]),
            ..State::default()
        }
    }

    fn ids(view: &[CatalogItem]) -> Vec<u32> {
        view.iter().map(|i| i.id).collect()
    }

    fn sent_json(h: &Harness, n: usize) -> serde_json::Value {
        serde_json::from_str(&h.sent.borrow()[n]).unwrap()
    }

    #[test]
    fn late_reply_for_superseded_request_is_discarded() {
        let mut h = harness();
        let mut worker = WorkerState::new();
        let mut s = state();

        let Recompute::Offloaded { request_id: r1 } = h.coordinator.request(&s, 0) else {
            panic!("expected offload");
        };
        s.sort_direction = SortDirection::Desc;
        let Recompute::Offloaded { request_id: r2 } = h.coordinator.request(&s, 1) else {
            panic!("expected offload");
        };
        assert_eq!((r1, r2), (1, 2));

        let reply1 = answer(&mut worker, &h.sent.borrow()[0]);
        let reply2 = answer(&mut worker, &h.sent.borrow()[1]);

        // R2 arrives first and is shown.
        h.replies.borrow_mut().push_back(reply2);
        assert_eq!(ids(&h.coordinator.poll(2).unwrap()), vec![7, 4, 1]);
        // R1 arrives afterwards and is dropped.
        h.replies.borrow_mut().push_back(reply1);
        assert!(h.coordinator.poll(3).is_none());
        assert!(!h.coordinator.is_busy());
    }

    #[test]
    fn unchanged_catalog_is_not_resent() {
        let mut h = harness();
        let mut s = state();
        h.coordinator.request(&s, 0);
        s.filters.search_term = "char".to_string();
        h.coordinator.request(&s, 0);
        assert!(sent_json(&h, 0).get("catalog").is_some());
        assert!(sent_json(&h, 1).get("catalog").is_none());

        s.catalog = Arc::new(s.catalog.as_ref().clone());
        h.coordinator.request(&s, 0);
        assert!(sent_json(&h, 2).get("catalog").is_some());
    }

    #[test]
    fn favorites_sent_only_when_needed_and_changed() {
        let mut h = harness();
        let mut s = state();
        s.favorites.insert(4);
        h.coordinator.request(&s, 0);
        assert!(sent_json(&h, 0).get("comparatorInput").is_none());

        s.sort_key = SortKey::Favorite;
        h.coordinator.request(&s, 0);
        assert_eq!(sent_json(&h, 1)["comparatorInput"], serde_json::json!([4]));

        h.coordinator.request(&s, 0);
        assert!(sent_json(&h, 2).get("comparatorInput").is_none());

        s.favorites.insert(7);
        h.coordinator.request(&s, 0);
        assert_eq!(sent_json(&h, 3)["comparatorInput"], serde_json::json!([4, 7]));
    }

    #[test]
    fn no_worker_computes_synchronously() {
        let mut coordinator = Coordinator::synchronous();
        let mut s = state();
        s.sort_key = SortKey::Name;
        s.sort_direction = SortDirection::Desc;
        let Recompute::Completed { view, .. } = coordinator.request(&s, 0) else {
            panic!("expected synchronous result");
        };
        assert_eq!(ids(&view), vec![7, 4, 1]);
        assert!(!coordinator.is_busy());
    }

    #[test]
    fn closed_worker_falls_back_and_is_forgotten() {
        let port = ManualPort {
            closed: true,
            ..ManualPort::default()
        };
        let mut coordinator = Coordinator::new(Some(Box::new(port)), 1_000);
        assert!(matches!(coordinator.request(&state(), 0), Recompute::Completed { .. }));
        assert!(!coordinator.has_worker());
    }

    #[test]
    fn timeout_recomputes_and_ignores_late_reply() {
        let mut h = harness();
        let mut worker = WorkerState::new();
        let s = state();
        h.coordinator.request(&s, 100);
        assert!(h.coordinator.poll(500).is_none());
        assert!(h.coordinator.is_busy());

        let view = h.coordinator.poll(1_100).unwrap();
        assert_eq!(ids(&view), vec![1, 4, 7]);
        assert!(!h.coordinator.is_busy());

        let late = answer(&mut worker, &h.sent.borrow()[0]);
        h.replies.borrow_mut().push_back(late);
        assert!(h.coordinator.poll(1_200).is_none());

        // The worker may have missed the catalog, so it is sent again.
        h.coordinator.request(&s, 1_300);
        assert!(sent_json(&h, 1).get("catalog").is_some());
    }

    #[test]
    fn error_reply_recomputes_locally() {
        let mut h = harness();
        let s = state();
        let Recompute::Offloaded { request_id } = h.coordinator.request(&s, 0) else {
            panic!("expected offload");
        };
        let reply = serde_json::to_string(&WorkerResponse::failed(request_id, "internal error")).unwrap();
        h.replies.borrow_mut().push_back(reply);
        assert_eq!(ids(&h.coordinator.poll(1).unwrap()), vec![1, 4, 7]);
    }

    #[test]
    fn resolve_skips_unknown_ids_and_reuses_index() {
        let mut coordinator = Coordinator::synchronous();
        let catalog = state().catalog;
        assert_eq!(ids(&coordinator.resolve(&catalog, &[7, 99, 1])), vec![7, 1]);
        assert_eq!(ids(&coordinator.resolve(&catalog, &[4])), vec![4]);
    }

    struct FixedRanks;

    impl RankLookup for FixedRanks {
        async fn ranks(&self, region: &str) -> Result<HashMap<u32, u32>, LookupError> {
            match region {
                "kanto" => Ok([(7, 1), (1, 2)].into_iter().collect()),
                other => Err(LookupError::UnknownRegion(other.to_string())),
            }
        }
    }

    #[test]
    fn regional_sort_bypasses_worker() {
        let mut h = harness();
        let mut s = state();
        s.sort_key = SortKey::Regional;
        s.catalog_index = Some("kanto".to_string());
        let Recompute::Ranked(job) = h.coordinator.request(&s, 0) else {
            panic!("expected ranked job");
        };
        assert!(h.sent.borrow().is_empty());
        let result = block_on(job.run(&FixedRanks));
        assert_eq!(ids(&h.coordinator.accept_ranked(result).unwrap()), vec![7, 1, 4]);
    }

    #[test]
    fn stale_regional_result_is_discarded() {
        let mut coordinator = Coordinator::synchronous();
        let mut s = state();
        s.sort_key = SortKey::Regional;
        s.catalog_index = Some("kanto".to_string());
        let first = coordinator.begin_ranked(&s);
        let second = coordinator.begin_ranked(&s);
        let first = block_on(first.run(&FixedRanks));
        let second = block_on(second.run(&FixedRanks));
        assert!(coordinator.accept_ranked(first).is_none());
        assert!(coordinator.accept_ranked(second).is_some());
    }

    #[test]
    fn failed_lookup_keeps_filter_order() {
        let mut coordinator = Coordinator::synchronous();
        let mut s = state();
        s.sort_key = SortKey::Regional;
        s.catalog_index = Some("atlantis".to_string());
        let job = coordinator.begin_ranked(&s);
        let result = block_on(job.run(&FixedRanks));
        assert_eq!(ids(&result.view), vec![1, 4, 7]);
    }
}
