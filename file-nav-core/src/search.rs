//! One result set for two search modes.
//!
//! "Current folder" search is the listing engine's display filter. "Global"
//! search hands the query to an external index, which streams paths back in
//! batches from any thread; batches are applied on the owning thread by
//! [`SearchFacade::poll`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use indexmap::IndexSet;

use crate::access::PathScopeResolver;
use crate::core::NavigatorConfig;
use crate::listing::{DirectoryItem, ListingEngine};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// Index scope handed to the global search collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchScope {
    /// Local volumes.
    Local,
    /// Mounted network volumes.
    Network,
    /// The user's home directory.
    UserHome,
}

/// Which search the caller asked for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Filter the current directory listing.
    #[default]
    CurrentFolder,
    /// Query the system index.
    Global,
}

/// External indexing service.
pub trait SearchIndex: Send + Sync {
    /// Starts a query. Matches go to `sink` in any number of batches, from
    /// any thread; [`SearchSink::finish`] marks the end of the stream.
    fn search(&self, query: &str, scopes: &[SearchScope], sink: SearchSink);
}

/// Index that never matches anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullIndex;

impl SearchIndex for NullIndex {
    fn search(&self, _query: &str, _scopes: &[SearchScope], sink: SearchSink) {
        sink.finish();
    }
}

#[derive(Debug)]
enum SearchBatch {
    Paths { generation: u64, paths: Vec<PathBuf> },
    Finished { generation: u64 },
}

/// Generation value that no sink carries; stored when nothing is accepted.
const GATE_CLOSED: u64 = 0;

/// Delivery handle for one global query. Cheap to clone and `Send`.
///
/// Once the query is cancelled, superseded or has hit the result cap, the
/// sink refuses further batches without queueing them.
#[derive(Clone, Debug)]
pub struct SearchSink {
    generation: u64,
    gate: Arc<AtomicU64>,
    tx: Sender<SearchBatch>,
}

impl SearchSink {
    /// Generation of the query this sink belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the facade still accepts results from this sink. Indexes
    /// should stop producing once this turns `false`.
    pub fn is_live(&self) -> bool {
        self.gate.load(Ordering::Acquire) == self.generation
    }

    /// Delivers a partial result. Returns `false` (and drops the batch)
    /// once the sink is no longer live or the facade is gone.
    pub fn deliver(&self, paths: Vec<PathBuf>) -> bool {
        if !self.is_live() {
            return false;
        }
        self.tx
            .send(SearchBatch::Paths {
                generation: self.generation,
                paths,
            })
            .is_ok()
    }

    /// Marks the query as complete. No-op for a sink that is no longer live.
    pub fn finish(&self) {
        if !self.is_live() {
            return;
        }
        let _ = self.tx.send(SearchBatch::Finished {
            generation: self.generation,
        });
    }
}

/// One search result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchHit {
    /// Row from the current directory listing.
    Listed(DirectoryItem),
    /// Path reported by the system index.
    Indexed(PathBuf),
}

impl SearchHit {
    /// Name shown for the hit.
    pub fn display_name(&self) -> String {
        match self {
            Self::Listed(item) => item.display_name().to_string(),
            Self::Indexed(p) => p
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string()),
        }
    }

    /// Filesystem path, `None` for group rows.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Listed(item) => item.path(),
            Self::Indexed(p) => Some(p),
        }
    }
}

/// Normalizes current-folder and global search into one result set.
pub struct SearchFacade {
    index: Arc<dyn SearchIndex>,
    resolver: Arc<PathScopeResolver>,
    home_dir: PathBuf,
    scopes: Vec<SearchScope>,
    cap: usize,

    mode: SearchMode,
    query: String,
    generation: u64,
    listed: Vec<DirectoryItem>,
    indexed: IndexSet<PathBuf>,
    complete: bool,
    truncated: bool,

    gate: Arc<AtomicU64>,
    tx: Sender<SearchBatch>,
    rx: Receiver<SearchBatch>,
}

impl std::fmt::Debug for SearchFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchFacade")
            .field("mode", &self.mode)
            .field("query", &self.query)
            .field("generation", &self.generation)
            .field("results", &self.len())
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

impl SearchFacade {
    /// Creates a facade. Scopes, cap and home root come from `config`.
    pub fn new(
        index: Arc<dyn SearchIndex>,
        resolver: Arc<PathScopeResolver>,
        config: &NavigatorConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            index,
            resolver,
            home_dir: config.home_dir.clone(),
            scopes: config.search_scopes.clone(),
            cap: config.search_result_cap.max(1),
            mode: SearchMode::default(),
            query: String::new(),
            generation: 0,
            listed: Vec::new(),
            indexed: IndexSet::new(),
            complete: true,
            truncated: false,
            gate: Arc::new(AtomicU64::new(GATE_CLOSED)),
            tx,
            rx,
        }
    }

    /// Whether global search is available: a live grant must cover the
    /// user's home root.
    pub fn has_global_scope(&self) -> bool {
        self.resolver.has_access(&self.home_dir).is_some()
    }

    /// Starts a search, replacing any previous one.
    ///
    /// Current-folder results are available immediately. Global results
    /// arrive through [`poll`](Self::poll); without a global scope the
    /// result set stays empty.
    pub fn search(&mut self, mode: SearchMode, query: &str, listing: &mut ListingEngine) {
        self.reset();
        self.mode = mode;
        self.query = query.to_string();

        match mode {
            SearchMode::CurrentFolder => {
                listing.set_query(query);
                self.listed = listing.visible();
                self.complete = true;
            }
            SearchMode::Global => {
                listing.clear_query();
                if query.trim().is_empty() {
                    self.complete = true;
                    return;
                }
                if !self.has_global_scope() {
                    #[cfg(feature = "tracing")]
                    debug!(
                        event = "search.global_unavailable",
                        home = %self.home_dir.display(),
                        "no grant for home root"
                    );
                    self.complete = true;
                    return;
                }
                self.complete = false;
                self.gate.store(self.generation, Ordering::Release);
                let sink = SearchSink {
                    generation: self.generation,
                    gate: self.gate.clone(),
                    tx: self.tx.clone(),
                };
                #[cfg(feature = "tracing")]
                debug!(
                    event = "search.started",
                    generation = self.generation,
                    query,
                    "global search started"
                );
                self.index.search(query, &self.scopes, sink);
            }
        }
    }

    /// Re-reads the listing filter after the listing changed (new directory
    /// or refreshed snapshot). No-op in global mode.
    pub fn refresh_listed(&mut self, listing: &ListingEngine) {
        if self.mode == SearchMode::CurrentFolder && !self.query.is_empty() {
            self.listed = listing.visible();
        }
    }

    /// Applies every pending batch. Stale batches are dropped; each batch
    /// is merged whole (de-duplicated, capped). Returns whether results
    /// changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(batch) = self.rx.try_recv() {
            match batch {
                SearchBatch::Paths { generation, paths } => {
                    if generation != self.generation {
                        trace_search_dropped_stale(generation, self.generation);
                        continue;
                    }
                    changed |= self.merge_batch(paths);
                }
                SearchBatch::Finished { generation } => {
                    if generation == self.generation && !self.complete {
                        self.complete = true;
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Clears the query and drops in-flight results.
    pub fn cancel(&mut self, listing: &mut ListingEngine) {
        self.reset();
        self.query.clear();
        listing.clear_query();
        listing.clear_query();
    }

    /// Current results in arrival/listing order.
    pub fn results(&self) -> Vec<SearchHit> {
        match self.mode {
            SearchMode::CurrentFolder => {
                self.listed.iter().cloned().map(SearchHit::Listed).collect()
            }
            SearchMode::Global => self.indexed.iter().cloned().map(SearchHit::Indexed).collect(),
        }
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        match self.mode {
            SearchMode::CurrentFolder => self.listed.len(),
            SearchMode::Global => self.indexed.len(),
        }
    }

    /// Returns `true` if there are no results.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the active query will produce no more results.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the result cap discarded matches.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Active mode.
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Active query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Generation of the active query.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn reset(&mut self) {
        self.gate.store(GATE_CLOSED, Ordering::Release);
        while self.rx.try_recv().is_ok() {}
        self.generation = self.generation.saturating_add(1);
        self.listed.clear();
        self.indexed.clear();
        self.complete = true;
        self.truncated = false;
    }

    fn merge_batch(&mut self, paths: Vec<PathBuf>) -> bool {
        let before = self.indexed.len();
        for p in paths {
            if self.indexed.len() >= self.cap {
                if !self.indexed.contains(&p) {
                    self.truncated = true;
                }
                continue;
            }
            self.indexed.insert(p);
        }
        if self.indexed.len() >= self.cap {
            // Full: refuse further batches and stop waiting for the index.
            self.gate.store(GATE_CLOSED, Ordering::Release);
            self.complete = true;
        }
        #[cfg(feature = "tracing")]
        trace!(
            event = "search.batch_applied",
            generation = self.generation,
            added = self.indexed.len() - before,
            total = self.indexed.len(),
            "search batch applied"
        );
        self.indexed.len() != before
    }
}

#[cfg(feature = "tracing")]
fn trace_search_dropped_stale(generation: u64, current_generation: u64) {
    trace!(
        event = "search.dropped_stale",
        generation, current_generation, "search dropped stale batch"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_search_dropped_stale(_generation: u64, _current_generation: u64) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessAuthority, PathAuthority};
    use crate::fs::MemoryFileSystem;
    use crate::groups::GroupStore;
    use crate::listing::ListingOptions;
    use crate::store::MemoryStore;
    use parking_lot::Mutex;

    /// Index that hands sinks back to the test instead of answering.
    #[derive(Default)]
    struct CapturingIndex {
        sinks: Mutex<Vec<(String, SearchSink)>>,
    }

    impl SearchIndex for CapturingIndex {
        fn search(&self, query: &str, _scopes: &[SearchScope], sink: SearchSink) {
            self.sinks.lock().push((query.to_string(), sink));
        }
    }

    struct Fixture {
        fs: Arc<MemoryFileSystem>,
        resolver: Arc<PathScopeResolver>,
        index: Arc<CapturingIndex>,
        facade: SearchFacade,
        listing: ListingEngine,
    }

    fn fixture(cap: usize) -> Fixture {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/home");
        fs.add_dir("/home/u");
        fs.add_file("/home/u/report.txt", 1);
        fs.add_file("/home/u/notes.md", 1);
        let resolver = Arc::new(PathScopeResolver::new(
            Arc::new(MemoryStore::new()),
            Arc::new(PathAuthority::new(fs.clone())),
        ));
        let index = Arc::new(CapturingIndex::default());
        let config = NavigatorConfig::default()
            .home_dir("/home/u")
            .search_result_cap(cap);
        let facade = SearchFacade::new(index.clone(), resolver.clone(), &config);
        Fixture {
            fs,
            resolver,
            index,
            facade,
            listing: ListingEngine::new(ListingOptions::default()),
        }
    }

    fn grant_home(f: &Fixture) {
        let token = PathAuthority::new(f.fs.clone())
            .mint(Path::new("/home/u"))
            .unwrap();
        f.resolver.store_grant(Path::new("/home/u"), token);
    }

    fn indexed(f: &Fixture) -> Vec<PathBuf> {
        f.facade
            .results()
            .into_iter()
            .filter_map(|h| h.path().map(Path::to_path_buf))
            .collect()
    }

    #[test]
    fn global_without_home_grant_is_empty_not_error() {
        let mut f = fixture(10);
        assert!(!f.facade.has_global_scope());
        f.facade.search(SearchMode::Global, "report", &mut f.listing);
        assert!(f.facade.is_empty());
        assert!(f.facade.is_complete());
        assert!(f.index.sinks.lock().is_empty());
    }

    #[test]
    fn global_batches_are_deduplicated_and_capped() {
        let mut f = fixture(3);
        grant_home(&f);
        assert!(f.facade.has_global_scope());
        f.facade.search(SearchMode::Global, "x", &mut f.listing);

        let sink = f.index.sinks.lock()[0].1.clone();
        sink.deliver(vec!["/a".into(), "/b".into()]);
        sink.deliver(vec!["/b".into(), "/c".into(), "/d".into()]);
        assert!(!f.facade.is_complete());
        assert!(f.facade.poll());

        assert_eq!(
            indexed(&f),
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
        );
        assert!(f.facade.is_truncated());
        assert!(f.facade.is_complete());

        assert!(!sink.is_live());
        assert!(!sink.deliver(vec!["/e".into()]));
        assert!(!f.facade.poll());
        assert_eq!(indexed(&f).len(), 3);
    }

    #[test]
    fn stale_batches_never_reach_results() {
        let mut f = fixture(10);
        grant_home(&f);
        f.facade.search(SearchMode::Global, "old", &mut f.listing);
        f.facade.search(SearchMode::Global, "new", &mut f.listing);

        let sinks = f.index.sinks.lock().clone();
        assert_eq!(sinks.len(), 2);
        sinks[0].1.deliver(vec!["/stale".into()]);
        sinks[0].1.finish();
        sinks[1].1.deliver(vec!["/fresh".into()]);
        f.facade.poll();

        assert_eq!(indexed(&f), vec![PathBuf::from("/fresh")]);
        assert!(!f.facade.is_complete());
    }

    #[test]
    fn cancel_drops_in_flight_results() {
        let mut f = fixture(10);
        grant_home(&f);
        f.facade.search(SearchMode::Global, "x", &mut f.listing);
        let sink = f.index.sinks.lock()[0].1.clone();
        f.facade.cancel(&mut f.listing);
        assert!(!sink.deliver(vec!["/late".into()]));
        assert!(!f.facade.poll());
        assert!(f.facade.is_empty());
        assert_eq!(f.facade.query(), "");
    }

    #[test]
    fn sink_refuses_batches_once_superseded() {
        let mut f = fixture(10);
        grant_home(&f);
        f.facade.search(SearchMode::Global, "x", &mut f.listing);
        let first = f.index.sinks.lock()[0].1.clone();
        assert!(first.is_live());
        assert!(first.deliver(vec!["/kept".into()]));

        // Queued but unpolled batches from the old query are drained too.
        f.facade.search(SearchMode::Global, "y", &mut f.listing);
        let second = f.index.sinks.lock()[1].1.clone();
        assert!(!first.is_live());
        assert!(second.is_live());
        for _ in 0..100 {
            assert!(!first.deliver(vec!["/flood".into()]));
        }
        first.finish();

        assert!(second.deliver(vec!["/fresh".into()]));
        assert!(f.facade.poll());
        assert_eq!(indexed(&f), vec![PathBuf::from("/fresh")]);
        assert!(!f.facade.is_complete());
    }

    #[test]
    fn results_delivered_from_worker_thread() {
        let mut f = fixture(100);
        grant_home(&f);
        f.facade.search(SearchMode::Global, "x", &mut f.listing);
        let sink = f.index.sinks.lock()[0].1.clone();
        std::thread::spawn(move || {
            for i in 0..10 {
                sink.deliver(vec![PathBuf::from(format!("/r{i}")), PathBuf::from("/r0")]);
            }
            sink.finish();
        })
        .join()
        .unwrap();

        f.facade.poll();
        assert_eq!(f.facade.len(), 10);
        assert!(f.facade.is_complete());
    }

    #[test]
    fn current_folder_delegates_to_listing_filter() {
        let mut f = fixture(10);
        grant_home(&f);
        let mut groups = GroupStore::open(Arc::new(MemoryStore::new()), f.fs.clone());
        f.listing
            .list(Path::new("/home/u"), &f.resolver, &mut groups, &*f.fs);

        f.facade
            .search(SearchMode::CurrentFolder, "REP", &mut f.listing);
        let names: Vec<String> = f
            .facade
            .results()
            .iter()
            .map(SearchHit::display_name)
            .collect();
        assert_eq!(names, vec!["report.txt"]);
        assert_eq!(f.listing.query(), "REP");
        assert_eq!(f.listing.snapshot().len(), 2);

        f.facade.cancel(&mut f.listing);
        assert_eq!(f.listing.query(), "");
    }

    #[test]
    fn null_index_completes_immediately() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/h");
        let resolver = Arc::new(PathScopeResolver::new(
            Arc::new(MemoryStore::new()),
            Arc::new(PathAuthority::new(fs.clone())),
        ));
        resolver.ensure_access(Path::new("/h")).unwrap();
        let config = NavigatorConfig::default().home_dir("/h");
        let mut facade = SearchFacade::new(Arc::new(NullIndex), resolver, &config);
        let mut listing = ListingEngine::default();

        facade.search(SearchMode::Global, "anything", &mut listing);
        facade.poll();
        assert!(facade.is_complete());
        assert!(facade.is_empty());
    }
}
