use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::normalize_path;
use crate::core::NavError;
use crate::fs::FileSystem;
use crate::store::DocumentStore;

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// A user-defined, named collection of path references.
///
/// Membership says nothing about where the files live: items may sit outside
/// [`parent_directory`](Self::parent_directory), which only decides in whose
/// listing the group shows up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: Uuid,
    name: String,
    items: IndexSet<PathBuf>,
    parent_directory: PathBuf,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl Group {
    fn new(name: String, items: IndexSet<PathBuf>, parent_directory: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            items,
            parent_directory,
            created_at: now,
            modified_at: now,
        }
    }

    /// Immutable identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member paths in insertion order.
    pub fn items(&self) -> impl ExactSizeIterator<Item = &Path> {
        self.items.iter().map(PathBuf::as_path)
    }

    /// Number of member paths.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `path` is a member.
    pub fn contains(&self, path: &Path) -> bool {
        self.items.contains(&normalize_path(path))
    }

    /// Directory whose listing shows this group.
    pub fn parent_directory(&self) -> &Path {
        &self.parent_directory
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last mutation timestamp.
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Sets the display name (persist through [`GroupStore::update`]).
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Appends a member; duplicates are dropped. Returns whether it was added.
    pub fn insert(&mut self, path: impl AsRef<Path>) -> bool {
        self.items.insert(normalize_path(path.as_ref()))
    }

    /// Removes a member, keeping the order of the rest.
    pub fn remove(&mut self, path: impl AsRef<Path>) -> bool {
        self.items.shift_remove(&normalize_path(path.as_ref()))
    }

    /// Bumps `modified_at`, strictly later than the previous value even when
    /// the clock has not advanced.
    fn touch(&mut self) {
        let now = Utc::now();
        self.modified_at = if now > self.modified_at {
            now
        } else {
            self.modified_at + TimeDelta::nanoseconds(1)
        };
    }
}

/// Change notification emitted by [`GroupStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupEvent {
    /// A group was created.
    Created(Uuid),
    /// A group was renamed or its items changed.
    Updated(Uuid),
    /// A group was deleted (member files are never touched).
    Deleted(Uuid),
    /// Validation removed members that no longer exist.
    Pruned {
        /// Group identity.
        id: Uuid,
        /// Paths that were dropped.
        removed: Vec<PathBuf>,
    },
}

/// Handle returned by [`GroupStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&GroupEvent) + 'static>;

#[derive(Serialize, Deserialize)]
struct GroupDocument {
    version: u32,
    groups: Vec<Group>,
}

impl GroupDocument {
    const VERSION: u32 = 1;
}

/// Owner of every [`Group`]. The full collection is rewritten as one JSON
/// document on each mutation.
pub struct GroupStore {
    document: Arc<dyn DocumentStore>,
    fs: Arc<dyn FileSystem>,
    groups: Vec<Group>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl std::fmt::Debug for GroupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupStore")
            .field("groups", &self.groups.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl GroupStore {
    /// Loads the collection from `document`.
    ///
    /// A missing document is an empty collection. A corrupt one is logged and
    /// treated as empty; it is left on disk until the next mutation.
    pub fn open(document: Arc<dyn DocumentStore>, fs: Arc<dyn FileSystem>) -> Self {
        let groups = match document.load() {
            Ok(Some(text)) => match decode_document(&text) {
                Ok(groups) => groups,
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    warn!(event = "groups.load_failed", error = %_err, "group document unreadable");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                warn!(event = "groups.load_failed", error = %_err, "group store unreadable");
                Vec::new()
            }
        };
        #[cfg(feature = "tracing")]
        debug!(event = "groups.loaded", groups = groups.len(), "groups loaded");
        Self {
            document,
            fs,
            groups,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// All groups in creation order.
    pub fn all(&self) -> &[Group] {
        &self.groups
    }

    /// Looks up a group by id.
    pub fn get(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Creates a group from a selection. Duplicate items are dropped, first
    /// occurrence wins.
    pub fn create<I, P>(
        &mut self,
        name: impl Into<String>,
        items: I,
        parent_directory: impl AsRef<Path>,
    ) -> Result<Group, NavError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let items = items
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .collect();
        let group = Group::new(
            name.into(),
            items,
            normalize_path(parent_directory.as_ref()),
        );
        self.groups.push(group.clone());
        let saved = self.persist();
        self.notify(GroupEvent::Created(group.id));
        saved.map(|()| group)
    }

    /// Replaces a group by identity.
    ///
    /// `id`, `parent_directory` and `created_at` always keep their stored
    /// values. Unknown ids are a no-op returning `Ok(None)`.
    pub fn update(&mut self, group: Group) -> Result<Option<Group>, NavError> {
        self.mutate(group.id, |stored| {
            stored.name = group.name;
            stored.items = group.items;
        })
    }

    /// Renames a group.
    pub fn rename(&mut self, id: Uuid, name: impl Into<String>) -> Result<Option<Group>, NavError> {
        let name = name.into();
        self.mutate(id, |stored| stored.name = name)
    }

    /// Appends items to a group, dropping duplicates.
    pub fn add_items<I, P>(&mut self, id: Uuid, items: I) -> Result<Option<Group>, NavError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.mutate(id, |stored| {
            for p in items {
                stored.insert(p);
            }
        })
    }

    /// Removes items from a group.
    pub fn remove_items<I, P>(&mut self, id: Uuid, items: I) -> Result<Option<Group>, NavError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.mutate(id, |stored| {
            for p in items {
                stored.remove(p);
            }
        })
    }

    /// Deletes a group. Member files are never touched.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, NavError> {
        let Some(i) = self.groups.iter().position(|g| g.id == id) else {
            return Ok(false);
        };
        self.groups.remove(i);
        let saved = self.persist();
        self.notify(GroupEvent::Deleted(id));
        saved.map(|()| true)
    }

    /// Groups shown in `dir`'s listing (exact parent match, no inheritance).
    pub fn groups_in_directory(&self, dir: &Path) -> Vec<Group> {
        let dir = normalize_path(dir);
        self.groups
            .iter()
            .filter(|g| g.parent_directory == dir)
            .cloned()
            .collect()
    }

    /// Groups whose parent directory no longer exists.
    pub fn orphaned_groups(&self) -> Vec<Group> {
        self.groups
            .iter()
            .filter(|g| !self.fs.is_dir(&g.parent_directory))
            .cloned()
            .collect()
    }

    /// Drops members whose path no longer exists.
    ///
    /// The stored group with `group`'s id is the one validated, so a stale
    /// copy never rolls back later mutations. When nothing was pruned the
    /// stored group comes back unchanged (same `modified_at`). Otherwise the
    /// corrected group is persisted, observers get [`GroupEvent::Pruned`],
    /// and it is returned. A group no longer in the store is filtered and
    /// returned without persisting or notifying. Never fails: a persistence
    /// error is logged and the pruned group still returned.
    pub fn validate(&mut self, group: &Group) -> Group {
        let Some(index) = self.groups.iter().position(|g| g.id == group.id) else {
            let mut detached = group.clone();
            detached.items.retain(|p| self.fs.exists(p));
            return detached;
        };
        let removed: Vec<PathBuf> = self.groups[index]
            .items
            .iter()
            .filter(|p| !self.fs.exists(p))
            .cloned()
            .collect();
        if removed.is_empty() {
            return self.groups[index].clone();
        }

        let stored = &mut self.groups[index];
        stored.items.retain(|p| !removed.contains(p));
        stored.touch();
        let pruned = stored.clone();

        #[cfg(feature = "tracing")]
        {
            let note = NavError::ValidationPruned {
                name: pruned.name.clone(),
                removed: removed.len(),
            };
            info!(event = "groups.pruned", id = %pruned.id, note = %note, "group pruned during validation");
        }

        if let Err(_err) = self.persist() {
            #[cfg(feature = "tracing")]
            warn!(event = "groups.persist_failed", error = %_err, "pruned group kept in memory only");
        }
        self.notify(GroupEvent::Pruned {
            id: pruned.id,
            removed,
        });
        pruned
    }

    /// Registers a change observer.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&GroupEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Removes an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    fn mutate(
        &mut self,
        id: Uuid,
        f: impl FnOnce(&mut Group),
    ) -> Result<Option<Group>, NavError> {
        let Some(stored) = self.groups.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };
        f(stored);
        stored.touch();
        let updated = stored.clone();
        let saved = self.persist();
        self.notify(GroupEvent::Updated(id));
        saved.map(|()| Some(updated))
    }

    fn persist(&self) -> Result<(), NavError> {
        let doc = GroupDocument {
            version: GroupDocument::VERSION,
            groups: self.groups.clone(),
        };
        let text = serde_json::to_string_pretty(&doc)?;
        self.document.save(&text)?;
        Ok(())
    }

    fn notify(&mut self, event: GroupEvent) {
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
    }
}

fn decode_document(text: &str) -> Result<Vec<Group>, NavError> {
    let doc: GroupDocument = serde_json::from_str(text)?;
    if doc.version != GroupDocument::VERSION {
        return Err(crate::core::StoreError::Corrupt {
            name: "groups".into(),
            message: format!("unsupported version {}", doc.version),
        }
        .into());
    }
    Ok(doc.groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::store::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (Arc<MemoryFileSystem>, MemoryStore, GroupStore) {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/D");
        fs.add_file("/D/A", 1);
        fs.add_file("/D/B", 2);
        fs.add_file("/elsewhere.txt", 3);
        let store = MemoryStore::new();
        let groups = GroupStore::open(Arc::new(store.clone()), fs.clone());
        (fs, store, groups)
    }

    #[test]
    fn create_then_list_round_trips() {
        let (_, _, mut groups) = setup();
        groups
            .create("Design", ["/D/A", "/D/B", "/D/A"], "/D")
            .unwrap();

        let in_dir = groups.groups_in_directory(Path::new("/D"));
        assert_eq!(in_dir.len(), 1);
        let g = &in_dir[0];
        assert_eq!(g.name(), "Design");
        assert_eq!(
            g.items().collect::<Vec<_>>(),
            vec![Path::new("/D/A"), Path::new("/D/B")]
        );
        assert_eq!(g.parent_directory(), Path::new("/D"));
    }

    #[test]
    fn groups_are_not_inherited_by_subdirectories() {
        let (fs, _, mut groups) = setup();
        fs.add_dir("/D/sub");
        groups.create("G", ["/elsewhere.txt"], "/D").unwrap();
        assert!(groups.groups_in_directory(Path::new("/D/sub")).is_empty());
        assert!(groups.groups_in_directory(Path::new("/")).is_empty());
        assert_eq!(groups.groups_in_directory(Path::new("/D/")).len(), 1);
    }

    #[test]
    fn validate_prunes_missing_and_persists() {
        let (fs, store, mut groups) = setup();
        let g = groups.create("Design", ["/D/A", "/D/B"], "/D").unwrap();
        fs.remove(Path::new("/D/A"));

        let pruned = groups.validate(&g);
        assert_eq!(pruned.items().collect::<Vec<_>>(), vec![Path::new("/D/B")]);
        assert!(pruned.modified_at() > g.modified_at());

        let reopened = GroupStore::open(Arc::new(store), fs.clone());
        let persisted = reopened.get(g.id()).unwrap();
        assert_eq!(
            persisted.items().collect::<Vec<_>>(),
            vec![Path::new("/D/B")]
        );
        assert_eq!(persisted.modified_at(), pruned.modified_at());
    }

    #[test]
    fn validate_is_idempotent_for_valid_group() {
        let (_, store, mut groups) = setup();
        let g = groups.create("Design", ["/D/A", "/D/B"], "/D").unwrap();
        let saves = store.save_count();

        let once = groups.validate(&g);
        let twice = groups.validate(&once);
        assert_eq!(once, g);
        assert_eq!(twice.modified_at(), g.modified_at());
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn validate_stale_copy_keeps_later_mutations() {
        let (fs, store, mut groups) = setup();
        let original = groups.create("Design", ["/D/A", "/D/B"], "/D").unwrap();
        groups.rename(original.id(), "Renamed").unwrap();
        groups.add_items(original.id(), ["/elsewhere.txt"]).unwrap();
        fs.remove(Path::new("/D/A"));

        let validated = groups.validate(&original);
        assert_eq!(validated.name(), "Renamed");
        assert_eq!(
            validated.items().collect::<Vec<_>>(),
            vec![Path::new("/D/B"), Path::new("/elsewhere.txt")]
        );

        let reopened = GroupStore::open(Arc::new(store), fs.clone());
        assert_eq!(reopened.get(original.id()), Some(&validated));
    }

    #[test]
    fn validate_deleted_group_filters_without_persisting() {
        let (fs, store, mut groups) = setup();
        let g = groups.create("Gone", ["/D/A", "/D/B"], "/D").unwrap();
        groups.delete(g.id()).unwrap();
        fs.remove(Path::new("/D/A"));
        let saves = store.save_count();

        let detached = groups.validate(&g);
        assert_eq!(detached.items().collect::<Vec<_>>(), vec![Path::new("/D/B")]);
        assert_eq!(store.save_count(), saves);
        assert!(groups.all().is_empty());
    }

    #[test]
    fn update_unknown_id_is_noop() {
        let (_, store, mut groups) = setup();
        let mut g = groups.create("G", ["/D/A"], "/D").unwrap();
        groups.delete(g.id()).unwrap();
        let saves = store.save_count();

        g.set_name("renamed");
        assert!(groups.update(g).unwrap().is_none());
        assert_eq!(store.save_count(), saves);
        assert!(groups.all().is_empty());
    }

    #[test]
    fn update_keeps_identity_and_bumps_timestamp() {
        let (_, _, mut groups) = setup();
        let g = groups.create("G", ["/D/A"], "/D").unwrap();
        let mut edited = g.clone();
        edited.set_name("H");
        edited.insert("/D/B");
        edited.insert("/D/A");

        let updated = groups.update(edited).unwrap().unwrap();
        assert_eq!(updated.id(), g.id());
        assert_eq!(updated.name(), "H");
        assert_eq!(updated.len(), 2);
        assert_eq!(updated.created_at(), g.created_at());
        assert!(updated.modified_at() > g.modified_at());
    }

    #[test]
    fn add_and_remove_items_preserve_order() {
        let (_, _, mut groups) = setup();
        let g = groups.create("G", ["/D/A"], "/D").unwrap();
        groups
            .add_items(g.id(), ["/elsewhere.txt", "/D/B", "/D/A"])
            .unwrap();
        let after = groups.remove_items(g.id(), ["/elsewhere.txt"]).unwrap().unwrap();
        assert_eq!(
            after.items().collect::<Vec<_>>(),
            vec![Path::new("/D/A"), Path::new("/D/B")]
        );
    }

    #[test]
    fn observers_see_every_mutation() {
        let (fs, _, mut groups) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = groups.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let g = groups.create("G", ["/D/A", "/D/B"], "/D").unwrap();
        groups.rename(g.id(), "G2").unwrap();
        fs.remove(Path::new("/D/B"));
        let current = groups.get(g.id()).unwrap().clone();
        groups.validate(&current);
        groups.delete(g.id()).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                GroupEvent::Created(g.id()),
                GroupEvent::Updated(g.id()),
                GroupEvent::Pruned {
                    id: g.id(),
                    removed: vec![PathBuf::from("/D/B")],
                },
                GroupEvent::Deleted(g.id()),
            ]
        );

        assert!(groups.unsubscribe(sub));
        groups.create("H", ["/D/A"], "/D").unwrap();
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn orphaned_groups_are_reported() {
        let (fs, _, mut groups) = setup();
        fs.add_dir("/gone");
        let g = groups.create("Lost", ["/D/A"], "/gone").unwrap();
        groups.create("Home", ["/D/A"], "/D").unwrap();
        fs.remove(Path::new("/gone"));

        let orphans = groups.orphaned_groups();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id(), g.id());
    }

    #[test]
    fn corrupt_document_starts_empty() {
        let fs = Arc::new(MemoryFileSystem::new());
        let store = MemoryStore::new();
        DocumentStore::save(&store, "{\"version\":99,\"groups\":[]}").unwrap();
        let groups = GroupStore::open(Arc::new(store.clone()), fs.clone());
        assert!(groups.all().is_empty());

        DocumentStore::save(&store, "not json").unwrap();
        let groups = GroupStore::open(Arc::new(store), fs);
        assert!(groups.all().is_empty());
    }
}
