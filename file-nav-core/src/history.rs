//! Back/forward history over directory and group locations.
//!
//! The history only orders *visited* locations. The current location is owned
//! by the caller and handed in whenever a traversal needs it.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::groups::Group;

#[cfg(feature = "tracing")]
use tracing::trace;

/// One addressable location.
///
/// Equality is by variant plus key fields: the directory path, or the group
/// id together with the directory it was opened from. Renaming a group does
/// not make it a different location.
#[derive(Clone, Debug)]
pub enum NavigationEntry {
    /// A real directory.
    Directory(PathBuf),
    /// A group opened from a directory listing.
    Group {
        /// Group snapshot at the time of navigation.
        group: Group,
        /// Directory the group was opened from.
        parent_directory: PathBuf,
    },
}

impl NavigationEntry {
    /// Directory location.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory(path.into())
    }

    /// Group location in the context of its own parent directory.
    pub fn group(group: Group) -> Self {
        let parent_directory = group.parent_directory().to_path_buf();
        Self::Group {
            group,
            parent_directory,
        }
    }

    /// Directory that frames this location: the directory itself, or the
    /// directory a group was opened from.
    pub fn context_directory(&self) -> &Path {
        match self {
            Self::Directory(p) => p,
            Self::Group {
                parent_directory, ..
            } => parent_directory,
        }
    }

    /// Short label for a "recent locations" menu.
    pub fn label(&self) -> String {
        match self {
            Self::Directory(p) => p
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string()),
            Self::Group { group, .. } => group.name().to_string(),
        }
    }
}

impl PartialEq for NavigationEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Directory(a), Self::Directory(b)) => a == b,
            (
                Self::Group {
                    group: ga,
                    parent_directory: pa,
                },
                Self::Group {
                    group: gb,
                    parent_directory: pb,
                },
            ) => ga.id() == gb.id() && pa == pb,
            _ => false,
        }
    }
}

impl Eq for NavigationEntry {}

/// Bidirectional stack machine over [`NavigationEntry`] values.
///
/// `back` holds the most recent entry last; `forward` holds the next entry
/// to visit first. A traversal (`go_back`, `go_forward`, `jump_to`) arms a
/// re-entrancy flag so the `push` triggered by the resulting navigation is
/// swallowed instead of clearing `forward`.
#[derive(Debug, Default)]
pub struct NavigationHistory {
    back: Vec<NavigationEntry>,
    forward: VecDeque<NavigationEntry>,
    traversing: bool,
}

impl NavigationHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the location being left.
    ///
    /// Clears `forward`. Skipped when the navigation was caused by a
    /// traversal; returns whether the entry was recorded.
    pub fn push(&mut self, current: NavigationEntry) -> bool {
        if std::mem::take(&mut self.traversing) {
            trace_history("push_suppressed", self);
            return false;
        }
        self.back.push(current);
        self.forward.clear();
        trace_history("push", self);
        true
    }

    /// Steps back. `None` ("no history") leaves both stacks untouched.
    pub fn go_back(&mut self, current: NavigationEntry) -> Option<NavigationEntry> {
        let target = self.back.pop()?;
        self.forward.push_front(current);
        self.traversing = true;
        trace_history("go_back", self);
        Some(target)
    }

    /// Steps forward. `None` leaves both stacks untouched.
    pub fn go_forward(&mut self, current: NavigationEntry) -> Option<NavigationEntry> {
        let target = self.forward.pop_front()?;
        self.back.push(current);
        self.traversing = true;
        trace_history("go_forward", self);
        Some(target)
    }

    /// Jumps to `back[index]` from a recent-locations menu.
    ///
    /// Everything visited after the target, followed by `current`, moves to
    /// the front of `forward` so that going forward replays the skipped
    /// locations in their original order.
    pub fn jump_to(&mut self, index: usize, current: NavigationEntry) -> Option<NavigationEntry> {
        if index >= self.back.len() {
            return None;
        }
        let mut skipped = self.back.split_off(index);
        let target = skipped.remove(0);
        skipped.push(current);
        for entry in skipped.into_iter().rev() {
            self.forward.push_front(entry);
        }
        self.traversing = true;
        trace_history("jump_to", self);
        Some(target)
    }

    /// Disarms a pending traversal whose navigation was abandoned (e.g. the
    /// target needed an access prompt the user cancelled).
    pub fn finish_traversal(&mut self) {
        self.traversing = false;
    }

    /// Whether a traversal is waiting for its navigation.
    pub fn is_traversing(&self) -> bool {
        self.traversing
    }

    /// Whether `go_back` would succeed.
    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    /// Whether `go_forward` would succeed.
    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Visited locations, oldest first.
    pub fn back_entries(&self) -> &[NavigationEntry] {
        &self.back
    }

    /// Locations ahead, next to visit first.
    pub fn forward_entries(&self) -> impl ExactSizeIterator<Item = &NavigationEntry> {
        self.forward.iter()
    }

    /// Total entries on both stacks.
    pub fn len(&self) -> usize {
        self.back.len() + self.forward.len()
    }

    /// Returns `true` if both stacks are empty.
    pub fn is_empty(&self) -> bool {
        self.back.is_empty() && self.forward.is_empty()
    }

    /// Drops all history.
    pub fn clear(&mut self) {
        self.back.clear();
        self.forward.clear();
        self.traversing = false;
    }

    /// Removes entries that land on the same place as their neighbour along
    /// the timeline `back.., current, forward..`, where `landing` maps an
    /// entry to the place it opens (e.g. a deleted group to its parent
    /// directory). `current` itself is never removed. Returns how many
    /// entries were dropped.
    pub fn collapse_repeats<K, F>(&mut self, current: &NavigationEntry, mut landing: F) -> usize
    where
        K: PartialEq,
        F: FnMut(&NavigationEntry) -> K,
    {
        let before = self.len();

        let mut newer = landing(current);
        let mut kept = Vec::with_capacity(self.back.len());
        for entry in std::mem::take(&mut self.back).into_iter().rev() {
            let place = landing(&entry);
            if place != newer {
                kept.push(entry);
                newer = place;
            }
        }
        kept.reverse();
        self.back = kept;

        let mut older = landing(current);
        self.forward.retain(|entry| {
            let place = landing(entry);
            if place == older {
                return false;
            }
            older = place;
            true
        });

        let dropped = before - self.len();
        if dropped > 0 {
            trace_history("collapse", self);
        }
        dropped
    }
}

#[cfg(feature = "tracing")]
fn trace_history(op: &'static str, history: &NavigationHistory) {
    trace!(
        event = "history.changed",
        op,
        back = history.back.len(),
        forward = history.forward.len(),
        "history changed"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_history(_op: &'static str, _history: &NavigationHistory) {}
