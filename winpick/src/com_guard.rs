//! RAII guard for the per-call COM apartment.
//!
//! Ensures `CoUninitialize` is called exactly once per successful
//! `CoInitializeEx`, even on early returns or panics.

use std::marker::PhantomData;
use std::sync::Once;

use windows::Win32::System::Com::{
    COINIT_APARTMENTTHREADED, COINIT_DISABLE_OLE1DDE, CoInitializeEx, CoUninitialize,
};
use windows::Win32::UI::WindowsAndMessaging::SetProcessDPIAware;

use crate::errors::{HResult, PickerError, PickerResult};

static DPI_AWARE: Once = Once::new();

/// Mark the process DPI-aware before the first dialog is shown.
///
/// Process-wide and idempotent; there is nothing to undo.
pub fn ensure_dpi_aware() {
    DPI_AWARE.call_once(|| {
        // SAFETY: `SetProcessDPIAware` takes no arguments and only flips
        // process-wide state; a failed call leaves the process unchanged.
        let ok = unsafe { SetProcessDPIAware() };
        if ok.as_bool() {
            tracing::debug!("process marked DPI-aware");
        } else {
            tracing::warn!("SetProcessDPIAware failed; dialogs may render scaled");
        }
    });
}

/// Drop guard for a single-threaded COM apartment.
///
/// [`ApartmentGuard::enter`] joins the calling thread to an STA, which the
/// shell dialog objects require. Dropping the guard calls `CoUninitialize`.
///
/// The guard is `!Send` and `!Sync`: apartment membership is per thread,
/// so it must be dropped on the thread that created it.
///
/// # Examples
///
/// ```no_run
/// # use winpick::ApartmentGuard;
/// # fn main() -> winpick::PickerResult<()> {
/// let _apartment = ApartmentGuard::enter()?;
/// // ... COM operations ...
/// // CoUninitialize runs on drop
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ApartmentGuard {
    _not_send: PhantomData<*mut ()>,
}

impl ApartmentGuard {
    /// Initialize COM in Single-Threaded Apartment mode.
    ///
    /// `S_FALSE` (already initialized on this thread) counts as success
    /// and is balanced like any other successful call.
    ///
    /// # Errors
    ///
    /// Returns [`PickerError::ComInit`] if `CoInitializeEx` fails, e.g.
    /// with `RPC_E_CHANGED_MODE` when the thread already joined the MTA.
    pub fn enter() -> PickerResult<Self> {
        // SAFETY: `CoInitializeEx` is a standard Win32 FFI call with no
        // pointer arguments. The result is checked below and a successful
        // call is paired with `CoUninitialize` in `Drop`.
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED | COINIT_DISABLE_OLE1DDE) };

        if hr.is_err() {
            let code = HResult::from(hr);
            tracing::error!(%code, "COM STA initialization failed");
            return Err(PickerError::ComInit(code));
        }

        tracing::debug!("COM STA initialized");

        Ok(Self {
            _not_send: PhantomData,
        })
    }
}

impl Drop for ApartmentGuard {
    fn drop(&mut self) {
        tracing::debug!("COM STA teardown");
        // SAFETY: paired with the successful `CoInitializeEx` in `enter()`.
        // The guard is `!Send`, so this runs on the initializing thread.
        unsafe {
            CoUninitialize();
        }
    }
}
