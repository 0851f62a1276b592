//! Native (rfd) directory picker.
//!
//! Opens the OS folder dialog through the `rfd` crate. The dialog is modal
//! and blocks until the user confirms or cancels, so call it from the UI
//! thread only.
use std::path::{Path, PathBuf};

use crate::access::DirectoryPicker;

#[cfg(feature = "tracing")]
use tracing::trace;

/// [`DirectoryPicker`] backed by the system folder dialog.
#[derive(Clone, Debug, Default)]
pub struct RfdPicker {
    title: Option<String>,
}

impl RfdPicker {
    /// Creates a picker with the platform's default dialog title.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialog title (e.g. "Grant access to this folder").
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn to_rfd(&self, seed: &Path) -> rfd::FileDialog {
        let mut d = rfd::FileDialog::new();
        if seed.is_dir() {
            d = d.set_directory(seed);
        } else if let Some(parent) = seed.parent() {
            d = d.set_directory(parent);
        }
        if let Some(title) = &self.title {
            d = d.set_title(title);
        }
        d
    }
}

impl DirectoryPicker for RfdPicker {
    fn pick_directory(&self, seed: &Path) -> Option<PathBuf> {
        #[cfg(feature = "tracing")]
        trace!(event = "native.pick_folder", seed = %seed.display(), "rfd pick folder");
        self.to_rfd(seed).pick_folder()
    }
}
