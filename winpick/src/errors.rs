use std::fmt;
use thiserror::Error;

use crate::request::SelectionKind;

/// Result type alias for picker operations.
pub type PickerResult<T> = Result<T, PickerError>;

/// `HRESULT_FROM_WIN32(ERROR_CANCELLED)`, returned by `IModalWindow::Show`
/// when the user dismisses the dialog.
#[allow(clippy::cast_possible_wrap)]
pub const E_CANCELLED: HResult = HResult(0x8007_04C7_u32 as i32);

/// A COM status code.
///
/// Kept as a plain 32-bit value so the error taxonomy is usable on every
/// target, including the fake backend used by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    /// Unsigned view of the code, as Windows documentation prints it.
    #[allow(clippy::cast_sign_loss)]
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.as_u32())?;
        if let Some(hint) = friendly_hresult_hint(*self) {
            write!(f, ": {hint}")?;
        }
        Ok(())
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for HResult {
    fn from(err: windows::core::Error) -> Self {
        Self(err.code().0)
    }
}

#[cfg(windows)]
impl From<windows::core::HRESULT> for HResult {
    fn from(hr: windows::core::HRESULT) -> Self {
        Self(hr.0)
    }
}

/// Dialog configuration step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    Options,
    Title,
    FileTypes,
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Options => "options",
            Self::Title => "title",
            Self::FileTypes => "file types",
        })
    }
}

/// Result retrieval step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStage {
    /// `IFileOpenDialog::GetResult`.
    Item,
    /// `IFileOpenDialog::GetResults`.
    ItemArray,
    /// `IShellItemArray::GetCount`.
    ItemCount,
}

impl fmt::Display for ResultStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Item => "result",
            Self::ItemArray => "results array",
            Self::ItemCount => "item count",
        })
    }
}

/// Centralized error enum for the picker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PickerError {
    /// `CoInitializeEx` failed for the calling thread.
    #[error("COM initialization failed: {0}")]
    ComInit(HResult),

    /// The shell `FileOpenDialog` object could not be instantiated.
    #[error("failed to create FileOpenDialog: {0}")]
    CreateDialog(HResult),

    /// Setting options, title or file types on the dialog failed.
    #[error("failed to set {step}: {code}")]
    Configure { step: ConfigStep, code: HResult },

    /// The user dismissed the dialog.
    #[error("user cancelled")]
    Cancelled,

    /// The dialog could not be shown for a reason other than cancellation.
    #[error("failed to show dialog: {0}")]
    Show(HResult),

    /// The shell reported success but the selection could not be read back.
    #[error("failed to retrieve {stage}: {code}")]
    Results { stage: ResultStage, code: HResult },

    /// The dialog succeeded but no filesystem path could be resolved.
    #[error("no {0} selected")]
    NothingSelected(SelectionKind),
}

impl PickerError {
    /// `true` when the user dismissed the dialog.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// `true` for outcomes driven by the user rather than by a failure.
    pub const fn is_no_selection(&self) -> bool {
        matches!(self, Self::Cancelled | Self::NothingSelected(_))
    }

    /// The COM status code behind this error, if there is one.
    pub const fn hresult(&self) -> Option<HResult> {
        match self {
            Self::ComInit(code)
            | Self::CreateDialog(code)
            | Self::Show(code)
            | Self::Configure { code, .. }
            | Self::Results { code, .. } => Some(*code),
            Self::Cancelled => Some(E_CANCELLED),
            Self::NothingSelected(_) => None,
        }
    }
}

/// Maps known COM error codes to actionable hints.
///
/// # Examples
/// ```
/// use winpick::{HResult, friendly_hresult_hint};
///
/// assert_eq!(
///     friendly_hresult_hint(HResult(0x8001_0106_u32 as i32)),
///     Some("Thread already initialized COM with a different apartment model"),
/// );
/// assert_eq!(friendly_hresult_hint(HResult(0)), None);
/// ```
pub fn friendly_hresult_hint(hr: HResult) -> Option<&'static str> {
    match hr.as_u32() {
        0x8007_04C7 => Some("Operation cancelled by the user"),
        0x8001_0106 => Some("Thread already initialized COM with a different apartment model"),
        0x8004_01F0 => Some("COM is not initialized on this thread"),
        0x8004_0154 => Some("FileOpenDialog class is not registered on this machine"),
        0x8007_0057 => Some("Invalid argument (check the option flag combination)"),
        0x8007_000E => Some("Out of memory"),
        0x8000_4002 => Some("Interface not supported by this shell version"),
        0x8000_4005 => Some("Unspecified failure"),
        0x8007_0002 => Some("The selected item no longer exists"),
        _ => None,
    }
}

/// Maps a [`PickerError`] to a friendly COM hint if it carries a status code.
pub fn friendly_com_hint(error: &PickerError) -> Option<&'static str> {
    error.hresult().and_then(friendly_hresult_hint)
}
