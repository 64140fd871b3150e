//! Side effects that follow a dispatch: recomputing the derived view and
//! writing the persisted subset.
//!
//! Reducers stay pure; everything here runs after the state has changed and
//! feeds its results back in as ordinary actions.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::CatalogItem;
use crate::config::StoreConfig;
use crate::engine::{FilterOptions, SortDirection, SortKey};
use crate::offload::{Coordinator, RankedJob, RankedResult, Recompute, WorkerPort};
use crate::persist::{self, PersistedSnapshot, Storage};
use crate::store::{Action, State, Store};

/// The parts of state the derived view depends on.
#[derive(Debug, Clone)]
pub struct ViewDeps {
    catalog: Arc<Vec<CatalogItem>>,
    filters: FilterOptions,
    sort_key: SortKey,
    sort_direction: SortDirection,
    favorites: BTreeSet<u32>,
    catalog_index: Option<String>,
}

impl ViewDeps {
    pub fn of(state: &State) -> Self {
        Self {
            catalog: Arc::clone(&state.catalog),
            filters: state.filters.clone(),
            sort_key: state.sort_key.clone(),
            sort_direction: state.sort_direction,
            favorites: state.favorites.clone(),
            catalog_index: state.catalog_index.clone(),
        }
    }

    /// Whether the view computed for `self` is out of date for `next`.
    /// Favorites and the region only matter to the sort keys that read them.
    pub fn changed(&self, next: &State) -> bool {
        !Arc::ptr_eq(&self.catalog, &next.catalog)
            || self.filters != next.filters
            || self.sort_key != next.sort_key
            || self.sort_direction != next.sort_direction
            || (next.sort_key.needs_favorites() && self.favorites != next.favorites)
            || (next.sort_key == SortKey::Regional && self.catalog_index != next.catalog_index)
    }
}

/// Follow-up work produced by one dispatch.
#[derive(Debug, Default)]
pub struct Reaction {
    pub actions: Vec<Action>,
    pub ranked: Option<RankedJob>,
}

pub struct Effects {
    coordinator: Coordinator,
    storage: Box<dyn Storage>,
    last_saved: Option<PersistedSnapshot>,
}

impl Effects {
    pub fn new(coordinator: Coordinator, storage: Box<dyn Storage>) -> Self {
        Self {
            coordinator,
            storage,
            last_saved: None,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn after_dispatch(&mut self, prev: &ViewDeps, next: &State, now_ms: u64) -> Reaction {
        let mut reaction = Reaction::default();
        if prev.changed(next) {
            self.recompute(next, now_ms, &mut reaction);
        }
        self.persist(next);
        reaction
    }

    pub fn recompute(&mut self, state: &State, now_ms: u64, reaction: &mut Reaction) {
        match self.coordinator.request(state, now_ms) {
            Recompute::Offloaded { .. } => reaction.actions.push(Action::SetFilterBusy(true)),
            Recompute::Completed { view, .. } => reaction.actions.push(Action::SetFilteredView(view)),
            Recompute::Ranked(job) => {
                reaction.actions.push(Action::SetFilterBusy(true));
                reaction.ranked = Some(job);
            }
        }
    }

    /// Write the persisted subset if it differs from the last write.
    fn persist(&mut self, state: &State) {
        let snapshot = PersistedSnapshot::from_state(state);
        if self.last_saved.as_ref() == Some(&snapshot) {
            return;
        }
        match persist::save(self.storage.as_ref(), &snapshot) {
            Ok(()) => {
                debug!("persisted state saved");
                self.last_saved = Some(snapshot);
            }
            Err(e) => warn!(error = %e, "could not save persisted state"),
        }
    }

    /// Mark `snapshot` as already on disk.
    pub fn mark_saved(&mut self, snapshot: PersistedSnapshot) {
        self.last_saved = Some(snapshot);
    }

    /// Worker replies and timeouts, as view updates.
    pub fn poll(&mut self, now_ms: u64) -> Option<Action> {
        self.coordinator.poll(now_ms).map(Action::SetFilteredView)
    }

    pub fn accept_ranked(&mut self, result: RankedResult) -> Option<Action> {
        self.coordinator.accept_ranked(result).map(Action::SetFilteredView)
    }
}

/// A store wired to its effects: the unit a host drives.
pub struct Session {
    store: Store,
    effects: Effects,
    ranked: Option<RankedJob>,
}

impl Session {
    pub fn new(config: StoreConfig, worker: Option<Box<dyn WorkerPort>>, storage: Box<dyn Storage>) -> Self {
        let coordinator = Coordinator::new(worker, config.worker_timeout_ms);
        Self {
            store: Store::new(config),
            effects: Effects::new(coordinator, storage),
            ranked: None,
        }
    }

    pub fn state(&self) -> &State {
        self.store.state()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    /// Hydrate from storage, migrating legacy keys if needed.
    pub fn start(&mut self, now_ms: u64) -> bool {
        let snapshot = persist::load(self.effects.storage(), self.store.config());
        self.effects.mark_saved(snapshot.clone());
        self.dispatch(Action::Hydrate(Box::new(snapshot)), now_ms)
    }

    /// Dispatch an action and run its effects. Returns whether the state
    /// changed.
    pub fn dispatch(&mut self, action: Action, now_ms: u64) -> bool {
        let deps = ViewDeps::of(self.store.state());
        if !self.store.dispatch(action) {
            return false;
        }
        let reaction = self.effects.after_dispatch(&deps, self.store.state(), now_ms);
        self.apply(reaction);
        true
    }

    fn apply(&mut self, reaction: Reaction) {
        if let Some(job) = reaction.ranked {
            self.ranked = Some(job);
        }
        // Follow-ups only touch the derived view, so they never re-trigger a
        // recompute.
        for action in reaction.actions {
            self.store.dispatch(action);
        }
    }

    /// Integrate worker replies and handle timeouts.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.effects.poll(now_ms) {
            Some(action) => self.store.dispatch(action),
            None => false,
        }
    }

    /// Regional-sort job waiting to run, if any.
    pub fn take_ranked_job(&mut self) -> Option<RankedJob> {
        self.ranked.take()
    }

    pub fn finish_ranked(&mut self, result: RankedResult) -> bool {
        match self.effects.accept_ranked(result) {
            Some(action) => self.store.dispatch(action),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::offload::RankLookup;
    use crate::persist::{MemoryStorage, STORAGE_KEY, Theme};
    use futures::executor::block_on;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Storage shared between the session and the test.
    #[derive(Clone, Default)]
    struct SharedStorage(Rc<MemoryStorage>);

    impl Storage for SharedStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), crate::error::StorageError> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) {
            self.0.remove(key)
        }
    }

    fn catalog() -> Arc<Vec<CatalogItem>> {
        Arc::new(vec![
            CatalogItem::new(1, "bulbasaur", &["grass", "poison"]),
            CatalogItem::new(4, "charmander", &["fire"]),
            CatalogItem::new(7, "squirtle", &["water"]),
        ])
    }

    fn session() -> (Session, SharedStorage) {
        let storage = SharedStorage::default();
        let session = Session::new(StoreConfig::default(), None, Box::new(storage.clone()));
        (session, storage)
    }

    fn view_ids(session: &Session) -> Vec<u32> {
        session.state().filtered.iter().map(|i| i.id).collect()
    }

    #[test]
    fn filter_changes_update_the_view() {
        let (mut s, _) = session();
        s.dispatch(Action::CatalogLoaded(catalog()), 0);
        assert_eq!(view_ids(&s), vec![1, 4, 7]);
        s.dispatch(Action::SetSelectedTypes(vec!["grass".to_string()]), 0);
        assert_eq!(view_ids(&s), vec![1]);
        s.dispatch(Action::ResetFilters, 0);
        s.dispatch(Action::SetSortKey(SortKey::Name), 0);
        s.dispatch(Action::SetSortDirection(SortDirection::Desc), 0);
        assert_eq!(view_ids(&s), vec![7, 4, 1]);
    }

    #[test]
    fn favorites_only_recompute_under_favorite_sort() {
        let (mut s, _) = session();
        s.dispatch(Action::CatalogLoaded(catalog()), 0);
        let deps = ViewDeps::of(s.state());
        s.dispatch(Action::ToggleFavorite(7), 0);
        assert!(!deps.changed(s.state()));

        s.dispatch(Action::SetSortKey(SortKey::Favorite), 0);
        assert_eq!(view_ids(&s), vec![7, 1, 4]);
        s.dispatch(Action::ToggleFavorite(4), 0);
        assert_eq!(view_ids(&s), vec![4, 7, 1]);
    }

    #[test]
    fn persisted_subset_is_written_on_change() {
        let (mut s, storage) = session();
        s.dispatch(Action::AddToTeam(25), 0);
        s.dispatch(Action::SetTheme(Theme::Dark), 0);
        let json = storage.get(STORAGE_KEY).unwrap();
        let saved = persist::parse_snapshot(&json, &StoreConfig::default());
        assert_eq!(saved.team, vec![25]);
        assert_eq!(saved.theme, Theme::Dark);
    }

    #[test]
    fn view_only_changes_do_not_rewrite_storage() {
        let (mut s, storage) = session();
        s.dispatch(Action::AddToTeam(1), 0);
        storage.remove(STORAGE_KEY);
        s.dispatch(Action::SetFilterBusy(true), 0);
        assert!(storage.get(STORAGE_KEY).is_none());
    }

    #[test]
    fn start_hydrates_from_storage() {
        let storage = SharedStorage::default();
        persist::save(
            &storage,
            &PersistedSnapshot {
                team: vec![4, 1],
                favorites: vec![7],
                ..PersistedSnapshot::default()
            },
        )
        .unwrap();
        let mut s = Session::new(StoreConfig::default(), None, Box::new(storage));
        assert!(s.start(0));
        assert_eq!(s.state().team, vec![4, 1]);
        assert!(s.state().favorites.contains(&7));
    }

    struct Ranks;

    impl RankLookup for Ranks {
        async fn ranks(&self, _region: &str) -> Result<HashMap<u32, u32>, LookupError> {
            Ok([(4, 1), (7, 2)].into_iter().collect())
        }
    }

    #[test]
    fn regional_sort_runs_as_async_job() {
        let (mut s, _) = session();
        s.dispatch(Action::CatalogLoaded(catalog()), 0);
        s.dispatch(Action::SelectCatalogIndex(Some("kanto".to_string())), 0);
        s.dispatch(Action::SetSortKey(SortKey::Regional), 0);
        assert!(s.state().filter_busy);

        let job = s.take_ranked_job().unwrap();
        assert!(s.finish_ranked(block_on(job.run(&Ranks))));
        assert_eq!(view_ids(&s), vec![4, 7, 1]);
        assert!(!s.state().filter_busy);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn thread_worker_round_trip() {
        use crate::offload::thread::ThreadWorker;

        let worker = ThreadWorker::spawn().map(|w| Box::new(w) as Box<dyn WorkerPort>);
        let mut s = Session::new(StoreConfig::default(), worker, Box::new(MemoryStorage::new()));
        s.dispatch(Action::CatalogLoaded(catalog()), 0);
        assert!(s.state().filter_busy);

        let mut now = 1;
        while !s.tick(now) {
            std::thread::sleep(std::time::Duration::from_millis(1));
            now += 1;
            assert!(now < 5_000, "worker never replied");
        }
        assert_eq!(view_ids(&s), vec![1, 4, 7]);
        assert!(!s.state().filter_busy);
    }
}
