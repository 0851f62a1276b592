//! The navigator session: one instance of each service, wired together.
//!
//! A navigation request enters through history; directory requests pass
//! through the resolver and drive the listing engine, group requests surface
//! the validated group directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::access::{
    AccessAuthority, DirectoryPicker, PathAuthority, PathScopeResolver, normalize_path,
};
use crate::core::{NavError, NavigatorConfig};
use crate::fs::{FileSystem, StdFileSystem};
use crate::groups::{Group, GroupStore};
use crate::history::{NavigationEntry, NavigationHistory};
use crate::listing::{DirectoryItem, ListingEngine, ListingOptions, ListingStatus};
use crate::search::{NullIndex, SearchFacade, SearchHit, SearchIndex, SearchMode};
use crate::store::{DataDir, DocumentStore, KeyValueStore, MemoryStore};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Collaborators injected into a [`Navigator`].
#[derive(Clone)]
pub struct Services {
    /// Filesystem used for enumeration and existence checks.
    pub fs: Arc<dyn FileSystem>,
    /// Mints and validates access tokens.
    pub authority: Arc<dyn AccessAuthority>,
    /// Durable grant table.
    pub grants: Arc<dyn KeyValueStore>,
    /// Durable group document.
    pub groups: Arc<dyn DocumentStore>,
    /// System search index.
    pub index: Arc<dyn SearchIndex>,
}

impl Services {
    /// Services over `fs` with in-memory persistence and no search index.
    pub fn in_memory(fs: Arc<dyn FileSystem>) -> Self {
        let store = MemoryStore::new();
        Self {
            authority: Arc::new(PathAuthority::new(fs.clone())),
            fs,
            grants: Arc::new(store.clone()),
            groups: Arc::new(store),
            index: Arc::new(NullIndex),
        }
    }

    /// Replaces the search index.
    pub fn with_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.index = index;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// Composition root of the navigation core.
pub struct Navigator {
    config: NavigatorConfig,
    fs: Arc<dyn FileSystem>,
    resolver: Arc<PathScopeResolver>,
    groups: GroupStore,
    listing: ListingEngine,
    history: NavigationHistory,
    search: SearchFacade,
    current: Option<NavigationEntry>,
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current)
            .field("history", &self.history)
            .field("listing", &self.listing.status())
            .field("groups", &self.groups)
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

impl Navigator {
    /// Opens a session on the real filesystem, persisting grants and groups
    /// under `config.data_dir`.
    pub fn open(config: NavigatorConfig) -> Result<Self, NavError> {
        let data = DataDir::open(&config.data_dir)?;
        let fs: Arc<dyn FileSystem> = Arc::new(StdFileSystem);
        let services = Services {
            authority: Arc::new(PathAuthority::new(fs.clone())),
            fs,
            grants: Arc::new(data.key_values()),
            groups: Arc::new(data.groups_document()),
            index: Arc::new(NullIndex),
        };
        #[cfg(feature = "tracing")]
        info!(event = "session.opened", data_dir = %data.root().display(), "navigator opened");
        Ok(Self::new(config, services))
    }

    /// Wires a session from explicit collaborators.
    pub fn new(config: NavigatorConfig, services: Services) -> Self {
        let resolver = Arc::new(PathScopeResolver::new(services.grants, services.authority));
        let groups = GroupStore::open(services.groups, services.fs.clone());
        let listing = ListingEngine::new(ListingOptions::from(&config));
        let search = SearchFacade::new(services.index, resolver.clone(), &config);
        Self {
            config,
            fs: services.fs,
            resolver,
            groups,
            listing,
            history: NavigationHistory::new(),
            search,
            current: None,
        }
    }

    /// Navigates to a directory and lists it.
    ///
    /// The location changes even when the directory is not covered by a
    /// grant; the listing then reports [`ListingStatus::NeedsAccess`] and
    /// [`request_access`](Self::request_access) can recover.
    pub fn navigate_to_directory(&mut self, path: impl AsRef<Path>) -> &ListingStatus {
        let entry = NavigationEntry::directory(normalize_path(path.as_ref()));
        self.enter(entry);
        self.listing.status()
    }

    /// Navigates to a breadcrumb segment.
    ///
    /// Tries [`PathScopeResolver::ensure_access`] first so that a readable
    /// ancestor of a granted directory lists without a prompt. When that
    /// fails the listing reports [`ListingStatus::NeedsAccess`] as usual.
    pub fn navigate_via_breadcrumb(&mut self, path: impl AsRef<Path>) -> &ListingStatus {
        let path = normalize_path(path.as_ref());
        if self.resolver.ensure_access(&path).is_none() {
            #[cfg(feature = "tracing")]
            debug!(event = "session.breadcrumb_needs_access", path = %path.display(), "no silent grant");
        }
        self.navigate_to_directory(path)
    }

    /// Opens a group. Returns the validated group, `None` for an unknown id.
    pub fn open_group(&mut self, id: Uuid) -> Option<Group> {
        let group = self.groups.get(id)?.clone();
        let group = self.groups.validate(&group);
        self.enter(NavigationEntry::group(group.clone()));
        Some(group)
    }

    /// Steps back. Returns `false` when there is no history.
    ///
    /// Entries that would land on the current location again (a deleted
    /// group resolving to the directory already shown) are skipped.
    pub fn go_back(&mut self) -> bool {
        let Some(current) = self.current.clone() else {
            return false;
        };
        self.collapse_history();
        match self.history.go_back(current) {
            Some(target) => {
                self.enter(target);
                true
            }
            None => false,
        }
    }

    /// Steps forward. Returns `false` when there is nothing ahead.
    pub fn go_forward(&mut self) -> bool {
        let Some(current) = self.current.clone() else {
            return false;
        };
        self.collapse_history();
        match self.history.go_forward(current) {
            Some(target) => {
                self.enter(target);
                true
            }
            None => false,
        }
    }

    /// Jumps to `back_entries()[index]`.
    pub fn jump_to(&mut self, index: usize) -> bool {
        let Some(current) = self.current.clone() else {
            return false;
        };
        match self.history.jump_to(index, current) {
            Some(target) => {
                self.enter(target);
                true
            }
            None => false,
        }
    }

    /// Prompts for access to the current directory and relists on success.
    pub fn request_access(&mut self, picker: &dyn DirectoryPicker) -> bool {
        let Some(NavigationEntry::Directory(dir)) = self.current.clone() else {
            return false;
        };
        if self.resolver.request_access(&dir, picker).is_none() {
            return false;
        }
        self.reload();
        true
    }

    /// Re-enumerates the current location without touching history.
    pub fn reload(&mut self) {
        if let Some(entry) = self.current.clone() {
            self.load(&entry);
            self.collapse_history();
        }
    }

    /// Current location.
    pub fn current(&self) -> Option<&NavigationEntry> {
        self.current.as_ref()
    }

    /// Rows of the current location, filtered by the current-folder query.
    pub fn items(&self) -> Vec<DirectoryItem> {
        match self.current {
            Some(_) => self.listing.visible(),
            None => Vec::new(),
        }
    }

    /// Listing status of the current directory.
    pub fn status(&self) -> &ListingStatus {
        self.listing.status()
    }

    /// Groups whose parent directory is gone.
    pub fn lost_groups(&mut self) -> Vec<DirectoryItem> {
        self.listing.list_lost_groups(&mut self.groups)
    }

    /// Creates a group in the current context directory.
    pub fn create_group<I, P>(&mut self, name: impl Into<String>, items: I) -> Result<Group, NavError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let parent = self.context_directory().unwrap_or_else(|| self.config.home_dir.clone());
        let group = self.groups.create(name, items, parent)?;
        self.listing.refresh_groups(&mut self.groups);
        Ok(group)
    }

    /// Renames a group. `Ok(None)` for an unknown id.
    pub fn rename_group(&mut self, id: Uuid, name: impl Into<String>) -> Result<Option<Group>, NavError> {
        let group = self.groups.rename(id, name)?;
        self.after_group_change(group.as_ref());
        Ok(group)
    }

    /// Adds members to a group. `Ok(None)` for an unknown id.
    pub fn add_to_group<I, P>(&mut self, id: Uuid, items: I) -> Result<Option<Group>, NavError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let group = self.groups.add_items(id, items)?;
        self.after_group_change(group.as_ref());
        Ok(group)
    }

    /// Removes members from a group. `Ok(None)` for an unknown id.
    pub fn remove_from_group<I, P>(&mut self, id: Uuid, items: I) -> Result<Option<Group>, NavError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let group = self.groups.remove_items(id, items)?;
        self.after_group_change(group.as_ref());
        Ok(group)
    }

    /// Deletes a group. Member files are never touched. When the deleted
    /// group is open, the session moves to the directory it was opened from
    /// without recording the group in history.
    pub fn delete_group(&mut self, id: Uuid) -> Result<bool, NavError> {
        if !self.groups.delete(id)? {
            return Ok(false);
        }
        self.listing.refresh_groups(&mut self.groups);
        let fallback = match &self.current {
            Some(NavigationEntry::Group {
                group,
                parent_directory,
            }) if group.id() == id => Some(parent_directory.clone()),
            _ => None,
        };
        if let Some(parent) = fallback {
            self.replace_current(NavigationEntry::Directory(parent));
        }
        self.collapse_history();
        Ok(true)
    }

    /// Starts a search. Current-folder mode filters the current location;
    /// global mode queries the index (results arrive via
    /// [`poll_search`](Self::poll_search)).
    pub fn search(&mut self, mode: SearchMode, query: &str) {
        self.search.search(mode, query, &mut self.listing);
    }

    /// Applies pending global search batches.
    pub fn poll_search(&mut self) -> bool {
        self.search.poll()
    }

    /// Clears the search.
    pub fn cancel_search(&mut self) {
        self.search.cancel(&mut self.listing);
    }

    /// Current search results.
    pub fn search_results(&self) -> Vec<SearchHit> {
        self.search.results()
    }

    /// Search facade (read-only).
    pub fn search_state(&self) -> &SearchFacade {
        &self.search
    }

    /// Navigation history (read-only).
    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    /// Group store.
    pub fn groups(&self) -> &GroupStore {
        &self.groups
    }

    /// Mutable group store, e.g. for [`GroupStore::subscribe`]. Call
    /// [`reload`](Self::reload) after mutating through it.
    pub fn groups_mut(&mut self) -> &mut GroupStore {
        &mut self.groups
    }

    /// Access resolver, shareable with worker threads.
    pub fn resolver(&self) -> &Arc<PathScopeResolver> {
        &self.resolver
    }

    /// Active configuration.
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    fn context_directory(&self) -> Option<PathBuf> {
        self.current
            .as_ref()
            .map(|entry| entry.context_directory().to_path_buf())
    }

    fn enter(&mut self, entry: NavigationEntry) {
        let entry = self.resolve_entry(entry);
        match self.current.replace(entry.clone()) {
            Some(previous) if previous != entry => {
                self.history.push(previous);
            }
            _ => self.history.finish_traversal(),
        }
        self.search.cancel(&mut self.listing);
        self.load(&entry);
        self.collapse_history();
        #[cfg(feature = "tracing")]
        debug!(
            event = "session.navigated",
            location = %entry.label(),
            back = self.history.back_entries().len(),
            "navigated"
        );
    }

    /// Moves to `entry` without recording the location being left.
    fn replace_current(&mut self, entry: NavigationEntry) {
        self.current = Some(entry.clone());
        self.search.cancel(&mut self.listing);
        self.load(&entry);
    }

    fn collapse_history(&mut self) {
        let Some(current) = self.current.clone() else {
            return;
        };
        let groups = &self.groups;
        self.history
            .collapse_repeats(&current, |entry| landing(groups, entry));
    }

    /// History may name a group that has since been deleted; it resolves to
    /// the directory it was opened from. Live groups are refreshed.
    fn resolve_entry(&mut self, entry: NavigationEntry) -> NavigationEntry {
        match entry {
            NavigationEntry::Group {
                group,
                parent_directory,
            } => match self.groups.get(group.id()).cloned() {
                Some(latest) => NavigationEntry::Group {
                    group: self.groups.validate(&latest),
                    parent_directory,
                },
                None => NavigationEntry::Directory(parent_directory),
            },
            directory => directory,
        }
    }

    fn load(&mut self, entry: &NavigationEntry) {
        match entry {
            NavigationEntry::Directory(dir) => {
                self.listing
                    .list(dir, &self.resolver, &mut self.groups, self.fs.as_ref());
            }
            NavigationEntry::Group { group, .. } => {
                self.listing
                    .open_group(group, &self.resolver, self.fs.as_ref());
            }
        }
    }

    fn after_group_change(&mut self, changed: Option<&Group>) {
        self.listing.refresh_groups(&mut self.groups);
        let Some(changed) = changed else {
            return;
        };
        let mut reopen = false;
        if let Some(NavigationEntry::Group { group, .. }) = &mut self.current {
            if group.id() == changed.id() {
                *group = changed.clone();
                reopen = true;
            }
        }
        if reopen {
            self.reload();
        }
    }
}

/// Place an entry opens without refreshing it: a deleted group lands on its
/// parent directory.
fn landing(groups: &GroupStore, entry: &NavigationEntry) -> NavigationEntry {
    match entry {
        NavigationEntry::Group {
            group,
            parent_directory,
        } if groups.get(group.id()).is_none() => {
            NavigationEntry::Directory(parent_directory.clone())
        }
        other => other.clone(),
    }
}
