//! # winpick
//!
//! Native Windows file and folder pickers over the shell's
//! `IFileOpenDialog` COM object.
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> winpick::PickerResult<()> {
//! let image = winpick::select_file("Please select an image", &["jpg", "png", "gif"])?;
//! let folders = winpick::select_folders("Please select folders")?;
//! # let _ = (image, folders);
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! Every call initializes COM for the calling thread (STA), shows the
//! dialog modally and releases every interface before returning.
//!
//! ## Features
//! - `test-support`: exposes the `fake` backend and `MockShellItem`
//!   via `mockall`, for testing code built on [`FilePicker`].

pub mod backend;
mod errors;
mod filter;
mod picker;
mod request;
pub mod wide;

#[cfg(windows)]
mod com_guard;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

// Stable public API
pub use backend::{DialogBackend, DialogHandle, ShellItem, ShellItemCollection};
pub use errors::{
    ConfigStep, E_CANCELLED, HResult, PickerError, PickerResult, ResultStage, friendly_com_hint,
    friendly_hresult_hint,
};
pub use filter::{FilterSpec, SUPPORTED_FILES_LABEL};
pub use picker::{FilePicker, resolve_path};
pub use request::{DialogOptions, DialogRequest, Multiplicity, SelectionKind};

#[cfg(windows)]
pub use backend::com::ComBackend;
#[cfg(windows)]
pub use com_guard::ApartmentGuard;

// Test support re-export
#[cfg(any(test, feature = "test-support"))]
pub use backend::MockShellItem;

/// Picker bound to the operating system's dialog.
#[cfg(windows)]
pub type NativePicker = FilePicker<ComBackend>;

/// Show a single-file picker.
///
/// `extensions` are bare suffixes (`"jpg"`) combined into one
/// "Supported Files" filter; an empty slice shows all files. An empty
/// `title` keeps the shell's default.
///
/// # Errors
///
/// [`PickerError::Cancelled`] if the user dismisses the dialog,
/// [`PickerError::NothingSelected`] ("no file selected") if the choice has
/// no filesystem path, or the COM failure that stopped the dialog.
#[cfg(windows)]
pub fn select_file<S: AsRef<str>>(title: &str, extensions: &[S]) -> PickerResult<String> {
    NativePicker::default().select_file(title, extensions)
}

/// Show a multi-file picker. Paths come back in the shell's order.
#[cfg(windows)]
pub fn select_files<S: AsRef<str>>(title: &str, extensions: &[S]) -> PickerResult<Vec<String>> {
    NativePicker::default().select_files(title, extensions)
}

/// Show a single-folder picker.
///
/// # Errors
///
/// As [`select_file`], with "no folder selected".
#[cfg(windows)]
pub fn select_folder(title: &str) -> PickerResult<String> {
    NativePicker::default().select_folder(title)
}

/// Show a multi-folder picker.
#[cfg(windows)]
pub fn select_folders(title: &str) -> PickerResult<Vec<String>> {
    NativePicker::default().select_folders(title)
}
