//! Scoped access grants and ancestor-walking path resolution.
//!
//! A grant is an opaque token minted for one directory root. Any descendant
//! of a granted root is readable without prompting again; the resolver proves
//! that by walking the requested path's ancestors until it finds a live grant
//! and then re-joining the remainder onto the *validated* root.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::core::NavError;
use crate::fs::FileSystem;
use crate::store::KeyValueStore;

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

/// Key prefix for persisted grants.
pub const GRANT_KEY_PREFIX: &str = "bookmark.";

/// Key prefix for grant roots that are not valid UTF-8. The rest of the key
/// is the raw path bytes, hex-encoded.
pub const GRANT_KEY_HEX_PREFIX: &str = "bookmark-hex.";

/// Opaque, revocable access credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken(Vec<u8>);

impl AccessToken {
    /// Wraps raw token bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A stored grant: one token per normalized root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessGrant {
    /// Normalized root the token was minted for.
    pub root: PathBuf,
    /// Opaque credential.
    pub token: AccessToken,
}

/// A path proven readable under some grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    root: PathBuf,
}

impl ResolvedPath {
    /// The readable path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The validated grant root the path was derived from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Consumes the value, returning the readable path.
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

/// Issues and validates tokens (the OS sandbox in a real host).
pub trait AccessAuthority: Send + Sync {
    /// Mints a token for `root` without user interaction.
    ///
    /// Returns `None` when the process cannot already read `root` as a
    /// directory.
    fn mint(&self, root: &Path) -> Option<AccessToken>;

    /// Validates a stored token, returning the root it currently resolves to.
    ///
    /// A stale or corrupt token yields [`NavError::StaleGrant`].
    fn validate(&self, root: &Path, token: &AccessToken) -> Result<PathBuf, NavError>;

    /// Starts using a validated root. Called at most once per root per process.
    fn begin_access(&self, _root: &Path) {}

    /// Stops using a root after revocation.
    fn end_access(&self, _root: &Path) {}
}

/// Interactive directory picker (an OS dialog in a real host).
pub trait DirectoryPicker {
    /// Shows the picker seeded at `seed`; `None` when the user cancels.
    fn pick_directory(&self, seed: &Path) -> Option<PathBuf>;
}

/// Default authority: tokens carry the root path, and stay live as long as
/// that directory exists.
pub struct PathAuthority {
    fs: Arc<dyn FileSystem>,
}

const PATH_TOKEN_MAGIC: &[u8] = b"fnav1\0";

impl PathAuthority {
    /// Creates an authority checking liveness against `fs`.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl std::fmt::Debug for PathAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathAuthority").finish_non_exhaustive()
    }
}

impl AccessAuthority for PathAuthority {
    fn mint(&self, root: &Path) -> Option<AccessToken> {
        if !self.fs.is_dir(root) {
            return None;
        }
        let raw = path_to_bytes(root)?;
        let mut bytes = PATH_TOKEN_MAGIC.to_vec();
        bytes.extend_from_slice(&raw);
        Some(AccessToken(bytes))
    }

    fn validate(&self, root: &Path, token: &AccessToken) -> Result<PathBuf, NavError> {
        let stale = || NavError::StaleGrant(root.to_path_buf());
        let payload = token
            .as_bytes()
            .strip_prefix(PATH_TOKEN_MAGIC)
            .ok_or_else(stale)?;
        let target = path_from_bytes(payload).ok_or_else(stale)?;
        if target.as_os_str().is_empty() || !self.fs.is_dir(&target) {
            return Err(stale());
        }
        Ok(target)
    }
}

/// Resolves requested paths to readable paths using persisted grants.
///
/// Lookups take `&self` and are safe from any thread; the grant table is
/// only written when a new grant is stored or one is revoked.
pub struct PathScopeResolver {
    store: Arc<dyn KeyValueStore>,
    authority: Arc<dyn AccessAuthority>,
    grants: RwLock<BTreeMap<PathBuf, AccessToken>>,
    active: Mutex<BTreeSet<PathBuf>>,
}

impl std::fmt::Debug for PathScopeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathScopeResolver")
            .field("grants", &self.grants.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PathScopeResolver {
    /// Creates a resolver and loads every persisted grant from `store`.
    ///
    /// Unreadable entries are skipped; a failing store starts the session
    /// with no grants.
    pub fn new(store: Arc<dyn KeyValueStore>, authority: Arc<dyn AccessAuthority>) -> Self {
        let mut grants = BTreeMap::new();
        match store.keys() {
            Ok(keys) => {
                for key in keys {
                    let Some(root) = parse_grant_key(&key) else {
                        continue;
                    };
                    match store.get(&key) {
                        Ok(Some(bytes)) => {
                            grants.insert(normalize_path(&root), AccessToken(bytes));
                        }
                        Ok(None) => {}
                        Err(_err) => {
                            #[cfg(feature = "tracing")]
                            warn!(event = "access.load_failed", key = %key, error = %_err, "skipping unreadable grant");
                        }
                    }
                }
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                warn!(event = "access.load_failed", error = %_err, "grant store unreadable");
            }
        }
        #[cfg(feature = "tracing")]
        debug!(event = "access.loaded", grants = grants.len(), "grants loaded");
        Self {
            store,
            authority,
            grants: RwLock::new(grants),
            active: Mutex::new(BTreeSet::new()),
        }
    }

    /// Non-interactive lookup.
    ///
    /// Walks `path` and its ancestors from most specific to the filesystem
    /// root. The first live grant wins, so with overlapping grants the
    /// longest matching root is used. Stale tokens fall through to the next
    /// ancestor.
    pub fn has_access(&self, path: &Path) -> Option<ResolvedPath> {
        let requested = normalize_path(path);
        for ancestor in requested.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            let Some(token) = self.grants.read().get(ancestor).cloned() else {
                continue;
            };
            let validated_root = match self.authority.validate(ancestor, &token) {
                Ok(root) => root,
                Err(err) => {
                    trace_stale_grant(ancestor, &err);
                    continue;
                }
            };
            self.begin_access(&validated_root);

            let resolved = if ancestor == requested.as_path() {
                validated_root.clone()
            } else {
                match requested.strip_prefix(ancestor) {
                    Ok(remainder) => validated_root.join(remainder),
                    Err(_) => continue,
                }
            };
            trace_access_resolved(&requested, ancestor, &resolved);
            return Some(ResolvedPath {
                path: resolved,
                root: validated_root,
            });
        }
        trace_access_denied(&requested);
        None
    }

    /// Interactive request: prompts with `picker` seeded at `path`, stores a
    /// grant for the root the user picked, then resolves.
    ///
    /// The picked root may differ from `path` (e.g. a parent). When it does
    /// not cover `path`, the picked root itself is returned.
    pub fn request_access(
        &self,
        path: &Path,
        picker: &dyn DirectoryPicker,
    ) -> Option<ResolvedPath> {
        let seed = normalize_path(path);
        let Some(picked) = picker.pick_directory(&seed) else {
            #[cfg(feature = "tracing")]
            debug!(event = "access.prompt_cancelled", seed = %seed.display(), "access prompt cancelled");
            return None;
        };
        let picked = normalize_path(&picked);
        let Some(token) = self.authority.mint(&picked) else {
            #[cfg(feature = "tracing")]
            warn!(event = "access.mint_failed", root = %picked.display(), "picked root not grantable");
            return None;
        };
        self.store_grant(&picked, token);
        self.has_access(&seed).or_else(|| self.has_access(&picked))
    }

    /// Non-interactive variant of [`request_access`](Self::request_access).
    ///
    /// Never prompts. When no grant covers `path`, tries to mint one silently
    /// for `path` (or its parent when `path` is not a directory); this only
    /// succeeds for locations the process can already read. Callers fall back
    /// to `request_access` on `None`.
    pub fn ensure_access(&self, path: &Path) -> Option<ResolvedPath> {
        if let Some(resolved) = self.has_access(path) {
            return Some(resolved);
        }
        let requested = normalize_path(path);
        let candidates = [Some(requested.as_path()), requested.parent()];
        for root in candidates.into_iter().flatten() {
            if root.as_os_str().is_empty() {
                continue;
            }
            if let Some(token) = self.authority.mint(root) {
                self.store_grant(root, token);
                return self.has_access(&requested);
            }
        }
        None
    }

    /// All granted roots, sorted.
    pub fn grants(&self) -> Vec<PathBuf> {
        self.grants.read().keys().cloned().collect()
    }

    /// Returns the stored grant for an exact root.
    pub fn grant(&self, root: &Path) -> Option<AccessGrant> {
        let root = normalize_path(root);
        let token = self.grants.read().get(&root).cloned()?;
        Some(AccessGrant { root, token })
    }

    /// Explicitly revokes the grant stored for `root`.
    pub fn revoke(&self, root: &Path) -> bool {
        let root = normalize_path(root);
        if self.grants.write().remove(&root).is_none() {
            return false;
        }
        let removed = match grant_key(&root) {
            Some(key) => self.store.remove(&key),
            None => Ok(()),
        };
        if let Err(_err) = removed {
            #[cfg(feature = "tracing")]
            warn!(event = "access.persist_failed", root = %root.display(), error = %_err, "failed to remove grant");
        }
        let mut active = self.active.lock();
        let was_active: Vec<PathBuf> = active
            .iter()
            .filter(|p| p.starts_with(&root))
            .cloned()
            .collect();
        for p in was_active {
            active.remove(&p);
            self.authority.end_access(&p);
        }
        true
    }

    /// Stores a grant. A live grant for the same root is kept as is; a stale
    /// one is replaced. Returns whether the table changed.
    pub fn store_grant(&self, root: &Path, token: AccessToken) -> bool {
        let root = normalize_path(root);
        let mut grants = self.grants.write();
        if let Some(existing) = grants.get(&root) {
            if self.authority.validate(&root, existing).is_ok() {
                #[cfg(feature = "tracing")]
                trace!(event = "access.grant_kept", root = %root.display(), "live grant kept");
                return false;
            }
            #[cfg(feature = "tracing")]
            debug!(event = "access.grant_replaced", root = %root.display(), "replacing stale grant");
        }
        match grant_key(&root) {
            Some(key) => {
                if let Err(_err) = self.store.set(&key, token.as_bytes()) {
                    // The user approved the prompt; keep the grant for this session.
                    #[cfg(feature = "tracing")]
                    warn!(event = "access.persist_failed", root = %root.display(), error = %_err, "grant kept in memory only");
                }
            }
            None => {
                #[cfg(feature = "tracing")]
                warn!(event = "access.persist_failed", root = %root.display(), "root has no portable encoding; grant kept in memory only");
            }
        }
        grants.insert(root.clone(), token);
        #[cfg(feature = "tracing")]
        debug!(event = "access.grant_stored", root = %root.display(), "grant stored");
        true
    }

    fn begin_access(&self, root: &Path) {
        let mut active = self.active.lock();
        if active.insert(root.to_path_buf()) {
            self.authority.begin_access(root);
        }
    }
}

/// Lexically normalizes a path: drops `.`, resolves `..` against preceding
/// components (never above the root) and trailing separators.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Store key for a grant root. UTF-8 roots are stored readable; anything
/// else is hex-encoded so the exact bytes survive a restart.
fn grant_key(root: &Path) -> Option<String> {
    match root.to_str() {
        Some(utf8) => Some(format!("{GRANT_KEY_PREFIX}{utf8}")),
        None => path_to_bytes(root).map(|raw| format!("{GRANT_KEY_HEX_PREFIX}{}", hex::encode(raw))),
    }
}

fn parse_grant_key(key: &str) -> Option<PathBuf> {
    if let Some(encoded) = key.strip_prefix(GRANT_KEY_HEX_PREFIX) {
        return path_from_bytes(&hex::decode(encoded).ok()?);
    }
    key.strip_prefix(GRANT_KEY_PREFIX).map(PathBuf::from)
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Option<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Some(path.as_os_str().as_bytes().to_vec())
}

// Only UTF-8 paths have a stable byte form off unix.
#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Option<Vec<u8>> {
    path.to_str().map(|s| s.as_bytes().to_vec())
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStrExt;
    Some(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> Option<PathBuf> {
    std::str::from_utf8(bytes).ok().map(PathBuf::from)
}

#[cfg(feature = "tracing")]
fn trace_stale_grant(root: &Path, err: &NavError) {
    debug!(
        event = "access.stale_grant",
        root = %root.display(),
        error = %err,
        "stale grant skipped"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_stale_grant(_root: &Path, _err: &NavError) {}

#[cfg(feature = "tracing")]
fn trace_access_resolved(requested: &Path, grant_root: &Path, resolved: &Path) {
    trace!(
        event = "access.resolved",
        requested = %requested.display(),
        grant_root = %grant_root.display(),
        resolved = %resolved.display(),
        "access resolved"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_access_resolved(_requested: &Path, _grant_root: &Path, _resolved: &Path) {}

#[cfg(feature = "tracing")]
fn trace_access_denied(requested: &Path) {
    trace!(event = "access.denied", requested = %requested.display(), "no live grant");
}

#[cfg(not(feature = "tracing"))]
fn trace_access_denied(_requested: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::store::MemoryStore;
    use std::cell::Cell;

    struct FixedPicker {
        answer: Option<PathBuf>,
        calls: Cell<usize>,
    }

    impl FixedPicker {
        fn new(answer: Option<&str>) -> Self {
            Self {
                answer: answer.map(PathBuf::from),
                calls: Cell::new(0),
            }
        }
    }

    impl DirectoryPicker for FixedPicker {
        fn pick_directory(&self, _seed: &Path) -> Option<PathBuf> {
            self.calls.set(self.calls.get() + 1);
            self.answer.clone()
        }
    }

    fn setup() -> (Arc<MemoryFileSystem>, MemoryStore, PathScopeResolver) {
        let fs = Arc::new(MemoryFileSystem::new());
        for d in [
            "/",
            "/Users",
            "/Users/a",
            "/Users/a/Documents",
            "/Users/a/Documents/Projects",
        ] {
            fs.add_dir(d);
        }
        fs.add_file("/Users/a/Documents/Projects/x.txt", 10);
        let store = MemoryStore::new();
        let resolver = PathScopeResolver::new(
            Arc::new(store.clone()),
            Arc::new(PathAuthority::new(fs.clone())),
        );
        (fs, store, resolver)
    }

    fn grant(resolver: &PathScopeResolver, fs: &Arc<MemoryFileSystem>, root: &str) {
        let authority = PathAuthority::new(fs.clone());
        let token = authority.mint(Path::new(root)).unwrap();
        assert!(resolver.store_grant(Path::new(root), token));
    }

    #[test]
    fn descendant_resolves_to_full_path_not_root() {
        let (fs, _, resolver) = setup();
        grant(&resolver, &fs, "/Users/a/Documents");

        let resolved = resolver
            .has_access(Path::new("/Users/a/Documents/Projects/x.txt"))
            .unwrap();
        assert_eq!(
            resolved.path(),
            Path::new("/Users/a/Documents/Projects/x.txt")
        );
        assert_eq!(resolved.root(), Path::new("/Users/a/Documents"));
    }

    #[test]
    fn resolved_path_is_root_prefix_plus_remainder() {
        let (fs, _, resolver) = setup();
        grant(&resolver, &fs, "/Users/a");

        for p in [
            "/Users/a",
            "/Users/a/Documents",
            "/Users/a/Documents/Projects/x.txt",
            "/Users/a/not/yet/created",
        ] {
            let requested = Path::new(p);
            let resolved = resolver.has_access(requested).unwrap();
            let remainder = requested.strip_prefix("/Users/a").unwrap();
            assert!(resolved.path().starts_with(resolved.root()));
            assert!(resolved.path().ends_with(remainder));
            assert_eq!(resolved.path(), requested);
        }
    }

    #[test]
    fn no_grant_means_no_access() {
        let (_, _, resolver) = setup();
        assert!(resolver.has_access(Path::new("/Users/a")).is_none());
    }

    #[test]
    fn grant_at_filesystem_root_covers_everything() {
        let (fs, _, resolver) = setup();
        grant(&resolver, &fs, "/");
        let resolved = resolver.has_access(Path::new("/Users/a/Documents")).unwrap();
        assert_eq!(resolved.path(), Path::new("/Users/a/Documents"));
        assert_eq!(resolved.root(), Path::new("/"));
    }

    #[test]
    fn overlapping_grants_prefer_most_specific_root() {
        let (fs, _, resolver) = setup();
        grant(&resolver, &fs, "/Users/a");
        grant(&resolver, &fs, "/Users/a/Documents");

        let resolved = resolver
            .has_access(Path::new("/Users/a/Documents/Projects"))
            .unwrap();
        assert_eq!(resolved.root(), Path::new("/Users/a/Documents"));
    }

    #[test]
    fn stale_grant_falls_through_to_ancestor() {
        let (fs, _, resolver) = setup();
        grant(&resolver, &fs, "/Users/a");
        grant(&resolver, &fs, "/Users/a/Documents/Projects");
        fs.remove(Path::new("/Users/a/Documents/Projects"));

        let resolved = resolver
            .has_access(Path::new("/Users/a/Documents/Projects/x.txt"))
            .unwrap();
        assert_eq!(resolved.root(), Path::new("/Users/a"));
    }

    #[test]
    fn corrupt_token_is_treated_as_absent() {
        let (_, _, resolver) = setup();
        resolver.store_grant(Path::new("/Users/a"), AccessToken::from_bytes(b"garbage".to_vec()));
        assert!(resolver.has_access(Path::new("/Users/a/Documents")).is_none());
    }

    #[test]
    fn live_grant_is_never_overwritten() {
        let (fs, _, resolver) = setup();
        grant(&resolver, &fs, "/Users/a");
        let replaced = resolver.store_grant(
            Path::new("/Users/a/"),
            AccessToken::from_bytes(b"other".to_vec()),
        );
        assert!(!replaced);
        assert_eq!(resolver.grants(), vec![PathBuf::from("/Users/a")]);
        assert!(resolver.has_access(Path::new("/Users/a")).is_some());
    }

    #[test]
    fn request_access_stores_picked_parent_root() {
        let (_, store, resolver) = setup();
        let picker = FixedPicker::new(Some("/Users/a"));

        let resolved = resolver
            .request_access(Path::new("/Users/a/Documents"), &picker)
            .unwrap();
        assert_eq!(resolved.path(), Path::new("/Users/a/Documents"));
        assert_eq!(picker.calls.get(), 1);
        assert!(store.get("bookmark./Users/a").unwrap().is_some());
    }

    #[test]
    fn request_access_cancelled_returns_none() {
        let (_, _, resolver) = setup();
        let picker = FixedPicker::new(None);
        assert!(resolver
            .request_access(Path::new("/Users/a"), &picker)
            .is_none());
        assert!(resolver.grants().is_empty());
    }

    #[test]
    fn request_access_unrelated_pick_returns_picked_root() {
        let (fs, _, resolver) = setup();
        fs.add_dir("/Volumes");
        let picker = FixedPicker::new(Some("/Volumes"));
        let resolved = resolver
            .request_access(Path::new("/Users/a"), &picker)
            .unwrap();
        assert_eq!(resolved.path(), Path::new("/Volumes"));
    }

    #[test]
    fn ensure_access_mints_without_prompting() {
        let (_, _, resolver) = setup();
        let resolved = resolver
            .ensure_access(Path::new("/Users/a/Documents/Projects/x.txt"))
            .unwrap();
        assert_eq!(resolved.root(), Path::new("/Users/a/Documents/Projects"));
        assert!(resolver.ensure_access(Path::new("/missing/dir")).is_none());
    }

    #[test]
    fn grants_reload_from_store() {
        let (fs, store, resolver) = setup();
        grant(&resolver, &fs, "/Users/a/Documents");
        drop(resolver);

        let reloaded =
            PathScopeResolver::new(Arc::new(store), Arc::new(PathAuthority::new(fs.clone())));
        assert_eq!(reloaded.grants(), vec![PathBuf::from("/Users/a/Documents")]);
        assert!(reloaded
            .has_access(Path::new("/Users/a/Documents/Projects"))
            .is_some());
    }

    #[test]
    fn revoke_removes_grant_and_persisted_key() {
        let (fs, store, resolver) = setup();
        grant(&resolver, &fs, "/Users/a");
        assert!(resolver.has_access(Path::new("/Users/a")).is_some());
        assert!(resolver.revoke(Path::new("/Users/a")));
        assert!(!resolver.revoke(Path::new("/Users/a")));
        assert!(resolver.has_access(Path::new("/Users/a")).is_none());
        assert!(store.get("bookmark./Users/a").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_root_keeps_exact_bytes_across_restart() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (fs, store, resolver) = setup();
        let latin1 = Path::new(OsStr::from_bytes(b"/Users/a/caf\xe9"));
        let lossy_twin = PathBuf::from(latin1.to_string_lossy().into_owned());
        fs.add_dir(latin1);
        fs.add_dir(lossy_twin.clone());
        fs.add_file(latin1.join("menu.txt"), 3);

        let resolved = resolver.ensure_access(latin1).unwrap();
        assert_eq!(resolved.path(), latin1);
        assert!(resolver.has_access(&latin1.join("menu.txt")).is_some());
        assert!(resolver.has_access(&lossy_twin).is_none());

        let keys = store.keys().unwrap();
        assert_eq!(
            keys,
            vec![format!(
                "{GRANT_KEY_HEX_PREFIX}{}",
                hex::encode(b"/Users/a/caf\xe9")
            )]
        );
        drop(resolver);

        let reloaded = PathScopeResolver::new(
            Arc::new(store.clone()),
            Arc::new(PathAuthority::new(fs.clone())),
        );
        assert_eq!(reloaded.grants(), vec![latin1.to_path_buf()]);
        let again = reloaded.has_access(&latin1.join("menu.txt")).unwrap();
        assert_eq!(again.root(), latin1);
        assert!(reloaded.revoke(latin1));
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn normalize_handles_dots_and_trailing_separators() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c/")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
    }
}
