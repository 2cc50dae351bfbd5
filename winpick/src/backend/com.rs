//! Native backend over the shell's `IFileOpenDialog`.
//!
//! Interface references are `windows` crate smart pointers, which call
//! `Release` on drop; shell-allocated strings go through
//! [`TaskMemWString`](crate::wide::TaskMemWString).

use windows::Win32::System::Com::{CLSCTX_INPROC_SERVER, CoCreateInstance};
use windows::Win32::UI::Shell::Common::COMDLG_FILTERSPEC;
use windows::Win32::UI::Shell::{
    FILEOPENDIALOGOPTIONS, FileOpenDialog, IFileOpenDialog, IShellItem, IShellItemArray,
    SIGDN_FILESYSPATH,
};
use windows::core::PCWSTR;

use super::{DialogBackend, DialogHandle, ShellItem, ShellItemCollection};
use crate::com_guard::{ApartmentGuard, ensure_dpi_aware};
use crate::errors::{ConfigStep, E_CANCELLED, HResult, PickerError, PickerResult, ResultStage};
use crate::filter::FilterSpec;
use crate::request::DialogOptions;
use crate::wide::{TaskMemWString, to_wide};

/// The operating system's file-open dialog.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComBackend;

impl DialogBackend for ComBackend {
    type Apartment = ApartmentGuard;
    type Dialog = ComDialog;

    fn initialize(&self) -> PickerResult<ApartmentGuard> {
        ensure_dpi_aware();
        ApartmentGuard::enter()
    }

    fn create_dialog(&self) -> PickerResult<ComDialog> {
        // SAFETY: `FileOpenDialog` is a valid CLSID constant and the
        // apartment was entered by `initialize` on this thread.
        let dialog: IFileOpenDialog =
            unsafe { CoCreateInstance(&FileOpenDialog, None, CLSCTX_INPROC_SERVER) }.map_err(
                |e| {
                    let code = HResult::from(e);
                    tracing::error!(%code, "CoCreateInstance(FileOpenDialog) failed");
                    PickerError::CreateDialog(code)
                },
            )?;
        Ok(ComDialog(dialog))
    }
}

fn configure_error(step: ConfigStep) -> impl FnOnce(windows::core::Error) -> PickerError {
    move |e| PickerError::Configure {
        step,
        code: HResult::from(e),
    }
}

fn results_error(stage: ResultStage) -> impl FnOnce(windows::core::Error) -> PickerError {
    move |e| PickerError::Results {
        stage,
        code: HResult::from(e),
    }
}

pub struct ComDialog(IFileOpenDialog);

impl DialogHandle for ComDialog {
    type Item = ComItem;
    type Items = ComItemArray;

    fn options(&self) -> PickerResult<DialogOptions> {
        // SAFETY: `self.0` is a live interface pointer owned by this handle.
        let options = unsafe { self.0.GetOptions() }.map_err(configure_error(ConfigStep::Options))?;
        Ok(DialogOptions::from_bits(options.0))
    }

    fn set_options(&self, options: DialogOptions) -> PickerResult<()> {
        // SAFETY: `self.0` is a live interface pointer owned by this handle.
        unsafe { self.0.SetOptions(FILEOPENDIALOGOPTIONS(options.bits())) }
            .map_err(configure_error(ConfigStep::Options))
    }

    fn set_title(&self, title: &str) -> PickerResult<()> {
        let wide = to_wide(title);
        // SAFETY: `wide` is null-terminated and outlives the call; the
        // dialog copies the string before returning.
        unsafe { self.0.SetTitle(PCWSTR(wide.as_ptr())) }
            .map_err(configure_error(ConfigStep::Title))
    }

    fn set_filter(&self, filter: &FilterSpec) -> PickerResult<()> {
        let name = to_wide(filter.name());
        let pattern = to_wide(filter.pattern());
        let specs = [COMDLG_FILTERSPEC {
            pszName: PCWSTR(name.as_ptr()),
            pszSpec: PCWSTR(pattern.as_ptr()),
        }];
        // SAFETY: both buffers are null-terminated and live until the end
        // of this function; `SetFileTypes` copies the specs.
        unsafe { self.0.SetFileTypes(&specs) }.map_err(configure_error(ConfigStep::FileTypes))
    }

    fn show(&self) -> PickerResult<()> {
        // SAFETY: `self.0` is a live interface pointer; no owner window.
        unsafe { self.0.Show(None) }.map_err(|e| {
            let code = HResult::from(e);
            if code == E_CANCELLED {
                PickerError::Cancelled
            } else {
                tracing::error!(%code, "IFileOpenDialog::Show failed");
                PickerError::Show(code)
            }
        })
    }

    fn result(&self) -> PickerResult<ComItem> {
        // SAFETY: `self.0` is a live interface pointer and `Show` succeeded.
        let item = unsafe { self.0.GetResult() }.map_err(results_error(ResultStage::Item))?;
        Ok(ComItem(item))
    }

    fn results(&self) -> PickerResult<ComItemArray> {
        // SAFETY: `self.0` is a live interface pointer and `Show` succeeded.
        let items = unsafe { self.0.GetResults() }.map_err(results_error(ResultStage::ItemArray))?;
        Ok(ComItemArray(items))
    }
}

pub struct ComItemArray(IShellItemArray);

impl ShellItemCollection for ComItemArray {
    type Item = ComItem;

    fn count(&self) -> PickerResult<u32> {
        // SAFETY: `self.0` is a live interface pointer owned by this handle.
        unsafe { self.0.GetCount() }.map_err(results_error(ResultStage::ItemCount))
    }

    fn item_at(&self, index: u32) -> PickerResult<ComItem> {
        // SAFETY: `self.0` is a live interface pointer; out-of-range
        // indices are reported as an error HRESULT.
        let item = unsafe { self.0.GetItemAt(index) }.map_err(results_error(ResultStage::Item))?;
        Ok(ComItem(item))
    }
}

pub struct ComItem(IShellItem);

impl ShellItem for ComItem {
    fn file_system_path(&self) -> PickerResult<String> {
        // SAFETY: `self.0` is a live interface pointer. On success the
        // returned buffer is owned by us and freed by `TaskMemWString`.
        let raw = unsafe { self.0.GetDisplayName(SIGDN_FILESYSPATH) }
            .map_err(results_error(ResultStage::Item))?;
        // SAFETY: `GetDisplayName` allocates with the COM task allocator
        // and transfers ownership to the caller.
        let buffer = unsafe { TaskMemWString::from_raw(raw) };
        Ok(buffer.to_string_lossy())
    }
}
