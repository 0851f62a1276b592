#![deny(missing_docs)]
//! Navigation core for sandboxed desktop file browsers.
//!
//! Three coupled subsystems, with no view layer:
//! - [`PathScopeResolver`]: persisted, revocable access grants rooted at
//!   directories, re-derived for any descendant path without prompting again
//! - [`NavigationHistory`]: back/forward over real directories and virtual
//!   groups
//! - [`GroupStore`] and [`ListingEngine`]: user-defined groups of path
//!   references overlaid on directory listings, pruned as members vanish
//!
//! [`SearchFacade`] merges current-folder filtering and global index search
//! into one result set. [`Navigator`] owns one instance of each service and
//! wires a navigation request through history, access and listing.
//!
//! Collaborators are traits: [`FileSystem`], [`AccessAuthority`],
//! [`DirectoryPicker`], [`SearchIndex`], [`KeyValueStore`] and
//! [`DocumentStore`]. In-memory doubles ship for tests and dry runs.
//!
//! Logging goes through `tracing` (default feature `tracing`). The native
//! folder picker is behind `native-rfd`.

mod access;
mod core;
mod fs;
mod groups;
mod history;
mod listing;
#[cfg(feature = "native-rfd")]
mod native;
mod search;
mod session;
mod store;

pub use access::{
    AccessAuthority, AccessGrant, AccessToken, DirectoryPicker, GRANT_KEY_HEX_PREFIX, GRANT_KEY_PREFIX,
    PathAuthority, PathScopeResolver, ResolvedPath, normalize_path,
};
pub use core::{NavError, NavigatorConfig, StoreError};
pub use fs::{FileSystem, FsEntry, FsMetadata, MemoryFileSystem, StdFileSystem};
pub use groups::{Group, GroupEvent, GroupStore, SubscriptionId};
pub use history::{NavigationEntry, NavigationHistory};
pub use listing::{
    DirectoryItem, FileSystemEntry, ListingEngine, ListingOptions, ListingStatus, ScanOutcome,
    ScanTicket,
};
#[cfg(feature = "native-rfd")]
pub use native::RfdPicker;
pub use search::{
    NullIndex, SearchFacade, SearchHit, SearchIndex, SearchMode, SearchScope, SearchSink,
};
pub use session::{Navigator, Services};
pub use store::{DataDir, DocumentFile, DocumentStore, KeyValueFile, KeyValueStore, MemoryStore};
