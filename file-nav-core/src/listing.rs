use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use crate::access::{PathScopeResolver, normalize_path};
use crate::core::{NavError, NavigatorConfig};
use crate::fs::FileSystem;
use crate::groups::{Group, GroupStore};

#[cfg(feature = "tracing")]
use tracing::trace;

/// A real filesystem child of the listed directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSystemEntry {
    /// Base name (no parent path).
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// Directory presented as an opaque package (not enterable).
    pub is_package: bool,
    /// File size in bytes (files only).
    pub size: Option<u64>,
    /// Last modified timestamp.
    pub modified: Option<SystemTime>,
}

/// One row of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryItem {
    /// Real file, directory or package.
    FileSystem(FileSystemEntry),
    /// Virtual group overlaid on the directory.
    Group(Group),
}

impl DirectoryItem {
    /// Name shown in the listing.
    pub fn display_name(&self) -> &str {
        match self {
            Self::FileSystem(e) => &e.name,
            Self::Group(g) => g.name(),
        }
    }

    /// Whether activating the row navigates into it. Always `true` for groups.
    pub fn is_container(&self) -> bool {
        match self {
            Self::FileSystem(e) => e.is_dir && !e.is_package,
            Self::Group(_) => true,
        }
    }

    /// Modification time.
    pub fn modified(&self) -> Option<SystemTime> {
        match self {
            Self::FileSystem(e) => e.modified,
            Self::Group(g) => Some(SystemTime::from(g.modified_at())),
        }
    }

    /// Size in bytes; groups have none.
    pub fn size(&self) -> Option<u64> {
        match self {
            Self::FileSystem(e) => e.size,
            Self::Group(_) => None,
        }
    }

    /// Filesystem path, `None` for groups.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::FileSystem(e) => Some(&e.path),
            Self::Group(_) => None,
        }
    }

    /// The group, if this row is one.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(g) => Some(g),
            Self::FileSystem(_) => None,
        }
    }

    /// Sort class: groups, then containers, then everything else.
    fn class_rank(&self) -> u8 {
        match self {
            Self::Group(_) => 0,
            item if item.is_container() => 1,
            _ => 2,
        }
    }
}

/// Enumeration knobs taken from [`NavigatorConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingOptions {
    /// Show dot-prefixed entries.
    pub show_hidden: bool,
    /// Lower-case directory extensions presented as opaque packages.
    pub package_extensions: Vec<String>,
}

impl From<&NavigatorConfig> for ListingOptions {
    fn from(cfg: &NavigatorConfig) -> Self {
        Self {
            show_hidden: cfg.show_hidden,
            package_extensions: cfg.package_extensions.clone(),
        }
    }
}

/// Current state of the listing pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ListingStatus {
    /// Nothing requested yet, or the last request was cancelled.
    #[default]
    Idle,
    /// Enumeration in flight.
    Scanning {
        /// Active generation id.
        generation: u64,
    },
    /// Snapshot is current.
    Complete {
        /// Completed generation id.
        generation: u64,
        /// Merged item count (before the query filter).
        loaded: usize,
    },
    /// No grant covers the directory; the caller should offer an access prompt.
    NeedsAccess {
        /// Directory that was refused.
        directory: PathBuf,
    },
    /// Enumeration failed (revoked mid-session, deleted, ...).
    Failed {
        /// Failed generation id.
        generation: u64,
        /// Error message captured from the filesystem.
        message: String,
    },
}

/// A pending enumeration, detached from the engine so it can run on a
/// worker thread.
#[derive(Clone, Debug)]
pub struct ScanTicket {
    /// Generation this ticket belongs to.
    pub generation: u64,
    /// Directory as requested (key for group lookup).
    pub directory: PathBuf,
    /// Path proven readable by the resolver.
    pub readable: PathBuf,
    options: ListingOptions,
}

impl ScanTicket {
    /// Enumerates the immediate children. Hidden entries are dropped and
    /// package directories marked; no sorting happens here.
    pub fn run(self, fs: &dyn FileSystem) -> ScanOutcome {
        let result = fs
            .read_dir(&self.readable)
            .map(|entries| {
                entries
                    .into_iter()
                    .filter(|e| self.options.show_hidden || !e.name.starts_with('.'))
                    .map(|e| {
                        let is_package = e.is_dir && is_package_name(&e.name, &self.options);
                        FileSystemEntry {
                            name: e.name,
                            path: e.path,
                            is_dir: e.is_dir,
                            is_package,
                            size: e.size,
                            modified: e.modified,
                        }
                    })
                    .collect()
            })
            .map_err(|source| NavError::EnumerationFailed {
                path: self.readable.clone(),
                source,
            });
        ScanOutcome {
            generation: self.generation,
            directory: self.directory,
            result,
        }
    }
}

/// Result of running a [`ScanTicket`].
#[derive(Debug)]
pub struct ScanOutcome {
    /// Generation the result belongs to.
    pub generation: u64,
    /// Directory as requested.
    pub directory: PathBuf,
    /// Enumerated entries or the enumeration error.
    pub result: Result<Vec<FileSystemEntry>, NavError>,
}

/// Produces merged, sorted listings of filesystem entries and groups.
///
/// Enumeration may run anywhere (see [`ScanTicket`]); merging and sorting
/// happen in [`apply`](Self::apply) on the thread that owns the engine.
#[derive(Debug, Default)]
pub struct ListingEngine {
    options: ListingOptions,
    directory: Option<PathBuf>,
    snapshot: Vec<DirectoryItem>,
    query: String,
    status: ListingStatus,
    generation: u64,
    started_at: Option<Instant>,
}

impl ListingEngine {
    /// Creates an engine with the given options.
    pub fn new(options: ListingOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Synchronous listing: resolve, enumerate, merge, filter.
    ///
    /// Refused or failing directories yield an empty list; inspect
    /// [`status`](Self::status) to tell them apart.
    pub fn list(
        &mut self,
        directory: &Path,
        resolver: &PathScopeResolver,
        groups: &mut GroupStore,
        fs: &dyn FileSystem,
    ) -> Vec<DirectoryItem> {
        if let Some(ticket) = self.begin(directory, resolver) {
            let outcome = ticket.run(fs);
            self.apply(outcome, groups);
        }
        self.visible()
    }

    /// Starts a new listing generation for `directory`.
    ///
    /// Any in-flight ticket becomes stale. Returns `None` (status
    /// [`ListingStatus::NeedsAccess`]) when no grant covers the directory.
    pub fn begin(&mut self, directory: &Path, resolver: &PathScopeResolver) -> Option<ScanTicket> {
        let directory = normalize_path(directory);
        self.generation = self.generation.saturating_add(1);
        self.directory = Some(directory.clone());
        self.snapshot.clear();

        let Some(resolved) = resolver.has_access(&directory) else {
            trace_scan_refused(self.generation, &directory);
            self.status = ListingStatus::NeedsAccess { directory };
            self.started_at = None;
            return None;
        };

        let ticket = ScanTicket {
            generation: self.generation,
            directory,
            readable: resolved.into_path_buf(),
            options: self.options.clone(),
        };
        trace_scan_requested(&ticket);
        self.status = ListingStatus::Scanning {
            generation: self.generation,
        };
        self.started_at = Some(Instant::now());
        Some(ticket)
    }

    /// Applies an enumeration outcome: validates the directory's groups,
    /// merges and sorts. Stale outcomes are dropped; returns whether the
    /// outcome was applied.
    pub fn apply(&mut self, outcome: ScanOutcome, groups: &mut GroupStore) -> bool {
        if outcome.generation != self.generation {
            trace_scan_dropped_stale(outcome.generation, self.generation);
            return false;
        }

        match outcome.result {
            Ok(entries) => {
                let mut items: Vec<DirectoryItem> =
                    entries.into_iter().map(DirectoryItem::FileSystem).collect();
                items.extend(validated_groups(groups, &outcome.directory));
                sort_items_in_place(&mut items);
                let loaded = items.len();
                self.snapshot = items;
                let duration_ms = self
                    .started_at
                    .take()
                    .map(|started| started.elapsed().as_millis())
                    .unwrap_or(0);
                trace_scan_completed(outcome.generation, loaded, duration_ms);
                self.status = ListingStatus::Complete {
                    generation: outcome.generation,
                    loaded,
                };
            }
            Err(err) => {
                trace_scan_failed(outcome.generation, &err);
                self.snapshot.clear();
                self.started_at = None;
                self.status = ListingStatus::Failed {
                    generation: outcome.generation,
                    message: err.to_string(),
                };
            }
        }
        true
    }

    /// Re-merges the current directory's groups after a group change,
    /// without enumerating the filesystem again.
    pub fn refresh_groups(&mut self, groups: &mut GroupStore) {
        let (Some(directory), ListingStatus::Complete { generation, .. }) =
            (self.directory.clone(), self.status.clone())
        else {
            return;
        };
        self.snapshot
            .retain(|item| matches!(item, DirectoryItem::FileSystem(_)));
        self.snapshot.extend(validated_groups(groups, &directory));
        sort_items_in_place(&mut self.snapshot);
        self.status = ListingStatus::Complete {
            generation,
            loaded: self.snapshot.len(),
        };
    }

    /// Invalidates any in-flight enumeration.
    pub fn cancel(&mut self) {
        self.generation = self.generation.saturating_add(1);
        if matches!(self.status, ListingStatus::Scanning { .. }) {
            self.status = ListingStatus::Idle;
        }
        self.started_at = None;
    }

    /// Sets the display filter (case-insensitive substring). The cached
    /// snapshot is untouched.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Clears the display filter.
    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    /// Active display filter.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Snapshot items matching the active query, in listing order.
    pub fn visible(&self) -> Vec<DirectoryItem> {
        filter_items(&self.snapshot, &self.query)
    }

    /// Full merged snapshot, ignoring the query.
    pub fn snapshot(&self) -> &[DirectoryItem] {
        &self.snapshot
    }

    /// Directory of the latest request.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Current pipeline status.
    pub fn status(&self) -> &ListingStatus {
        &self.status
    }

    /// Latest issued generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Options used for new tickets.
    pub fn options(&self) -> &ListingOptions {
        &self.options
    }

    /// The synthetic "lost groups" location: groups whose parent directory
    /// is gone, validated and sorted by name.
    pub fn list_lost_groups(&self, groups: &mut GroupStore) -> Vec<DirectoryItem> {
        let orphans = groups.orphaned_groups();
        let mut items: Vec<DirectoryItem> = orphans
            .iter()
            .map(|g| DirectoryItem::Group(groups.validate(g)))
            .collect();
        sort_items_in_place(&mut items);
        filter_items(&items, &self.query)
    }

    /// Replaces the snapshot with an opened group's members, in insertion
    /// order. Bumps the generation so in-flight directory scans are dropped.
    pub fn open_group(
        &mut self,
        group: &Group,
        resolver: &PathScopeResolver,
        fs: &dyn FileSystem,
    ) -> Vec<DirectoryItem> {
        self.generation = self.generation.saturating_add(1);
        self.directory = None;
        self.started_at = None;
        self.snapshot = group_rows(group, resolver, fs, &self.options);
        self.status = ListingStatus::Complete {
            generation: self.generation,
            loaded: self.snapshot.len(),
        };
        self.visible()
    }
}

/// Members without a covering grant are still listed, with whatever
/// metadata the filesystem reports for the raw path; vanished members are
/// skipped.
fn group_rows(
    group: &Group,
    resolver: &PathScopeResolver,
    fs: &dyn FileSystem,
    options: &ListingOptions,
) -> Vec<DirectoryItem> {
    group
        .items()
        .filter_map(|member| {
            let readable = resolver
                .has_access(member)
                .map(|r| r.into_path_buf())
                .unwrap_or_else(|| member.to_path_buf());
            let meta = fs.metadata(&readable).ok()?;
            let name = member
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| member.display().to_string());
            let is_package = meta.is_dir && is_package_name(&name, options);
            Some(DirectoryItem::FileSystem(FileSystemEntry {
                name,
                path: member.to_path_buf(),
                is_dir: meta.is_dir,
                is_package,
                size: meta.size,
                modified: meta.modified,
            }))
        })
        .collect()
}

fn validated_groups(groups: &mut GroupStore, directory: &Path) -> Vec<DirectoryItem> {
    groups
        .groups_in_directory(directory)
        .iter()
        .map(|g| DirectoryItem::Group(groups.validate(g)))
        .collect()
}

fn is_package_name(name: &str, options: &ListingOptions) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_lowercase();
    options.package_extensions.iter().any(|p| *p == ext)
}

fn filter_items(items: &[DirectoryItem], query: &str) -> Vec<DirectoryItem> {
    let query = query.trim();
    if query.is_empty() {
        return items.to_vec();
    }
    let q = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.display_name().to_lowercase().contains(&q))
        .cloned()
        .collect()
}

/// Groups before containers before files; case-insensitive name within a
/// class, raw name as the tie breaker.
fn sort_items_in_place(items: &mut [DirectoryItem]) {
    items.sort_by(|a, b| {
        a.class_rank()
            .cmp(&b.class_rank())
            .then_with(|| {
                a.display_name()
                    .to_lowercase()
                    .cmp(&b.display_name().to_lowercase())
            })
            .then_with(|| a.display_name().cmp(b.display_name()))
    });
}

#[cfg(feature = "tracing")]
fn trace_scan_requested(ticket: &ScanTicket) {
    trace!(
        event = "scan.requested",
        generation = ticket.generation,
        directory = %ticket.directory.display(),
        readable = %ticket.readable.display(),
        "scan requested"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_requested(_ticket: &ScanTicket) {}

#[cfg(feature = "tracing")]
fn trace_scan_refused(generation: u64, directory: &Path) {
    trace!(
        event = "scan.refused",
        generation,
        directory = %directory.display(),
        "scan refused: no access"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_refused(_generation: u64, _directory: &Path) {}

#[cfg(feature = "tracing")]
fn trace_scan_completed(generation: u64, total_items: usize, duration_ms: u128) {
    trace!(
        event = "scan.completed",
        generation, total_items, duration_ms, "scan completed"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_completed(_generation: u64, _total_items: usize, _duration_ms: u128) {}

#[cfg(feature = "tracing")]
fn trace_scan_failed(generation: u64, err: &NavError) {
    trace!(event = "scan.failed", generation, error = %err, "scan failed");
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_failed(_generation: u64, _err: &NavError) {}

#[cfg(feature = "tracing")]
fn trace_scan_dropped_stale(generation: u64, current_generation: u64) {
    trace!(
        event = "scan.dropped_stale",
        generation, current_generation, "scan dropped stale outcome"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_dropped_stale(_generation: u64, _current_generation: u64) {}
