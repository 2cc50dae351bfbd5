//! Capability traits for the shell dialog and its result handles.
//!
//! The orchestrator only talks to these traits. `com` binds them to the
//! shell's `IFileOpenDialog`; the `fake` backend records
//! every acquisition and release for tests.
//!
//! Release is `Drop`: every handle type returned here gives its reference
//! back when it goes out of scope, so early returns cannot leak.

#[cfg(windows)]
pub mod com;

use crate::errors::PickerResult;
use crate::filter::FilterSpec;
use crate::request::DialogOptions;

#[cfg(any(test, feature = "test-support"))]
use mockall::automock;

/// Entry point of a backend: apartment setup and dialog creation.
pub trait DialogBackend {
    /// Guard for the per-thread COM apartment; leaving it uninitializes.
    type Apartment;
    type Dialog: DialogHandle;

    /// Enter the apartment for the calling thread.
    fn initialize(&self) -> PickerResult<Self::Apartment>;

    /// Create a fresh file-open dialog object.
    fn create_dialog(&self) -> PickerResult<Self::Dialog>;
}

/// One dialog session.
pub trait DialogHandle {
    type Item: ShellItem;
    type Items: ShellItemCollection<Item = Self::Item>;

    /// Current option flags.
    fn options(&self) -> PickerResult<DialogOptions>;

    fn set_options(&self, options: DialogOptions) -> PickerResult<()>;

    fn set_title(&self, title: &str) -> PickerResult<()>;

    fn set_filter(&self, filter: &FilterSpec) -> PickerResult<()>;

    /// Run the dialog modally.
    ///
    /// Returns [`PickerError::Cancelled`](crate::PickerError::Cancelled)
    /// when the user dismisses it.
    fn show(&self) -> PickerResult<()>;

    /// The chosen item of a single-selection dialog.
    fn result(&self) -> PickerResult<Self::Item>;

    /// The chosen items of a multi-selection dialog.
    fn results(&self) -> PickerResult<Self::Items>;
}

/// An ordered collection of chosen items.
pub trait ShellItemCollection {
    type Item: ShellItem;

    fn count(&self) -> PickerResult<u32>;

    fn item_at(&self, index: u32) -> PickerResult<Self::Item>;
}

/// A single chosen filesystem entry.
#[cfg_attr(any(test, feature = "test-support"), automock)]
pub trait ShellItem {
    /// The entry's filesystem path (`SIGDN_FILESYSPATH`).
    fn file_system_path(&self) -> PickerResult<String>;
}
