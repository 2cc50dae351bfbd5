//! Scriptable in-memory backend for tests.
//!
//! [`FakeBackend`] implements the same capability traits as the native
//! backend. Every apartment, dialog, collection, item and string buffer it
//! hands out is recorded in a shared [`Ledger`], and its `Drop` records the
//! release, so tests can assert that each call leaves nothing behind.
//!
//! Enabled under `cfg(test)` and the `test-support` feature.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{DialogBackend, DialogHandle, ShellItem, ShellItemCollection};
use crate::errors::{ConfigStep, HResult, PickerError, PickerResult, ResultStage};
use crate::filter::FilterSpec;
use crate::request::DialogOptions;
use crate::wide::{from_wide_ptr, to_wide};

/// Generic failure code used by scripted faults.
#[allow(clippy::cast_possible_wrap)]
pub const E_FAIL: HResult = HResult(0x8000_4005_u32 as i32);

/// Kind of resource tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Apartment,
    Dialog,
    ItemArray,
    Item,
    PathBuffer,
}

/// One observable backend event, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Acquired(Resource),
    Released(Resource),
    SetOptions(DialogOptions),
    SetTitle(String),
    SetFilter(FilterSpec),
    Show,
}

/// What the user does with the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowOutcome {
    #[default]
    Accept,
    Cancel,
    Fail(HResult),
}

/// One entry the fake user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEntry {
    /// Resolves to this path.
    Path(String),
    /// `GetDisplayName` fails.
    Unresolvable,
    /// The shell hands back a null path buffer.
    NullBuffer,
    /// `GetItemAt` fails for this index.
    Unreachable,
}

impl FakeEntry {
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }
}

/// Step at which the script injects a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Initialize,
    CreateDialog,
    GetOptions,
    SetOptions,
    SetTitle,
    SetFilter,
    GetResult,
    GetResults,
    GetCount,
}

/// Scripted behavior for one [`FakeBackend`].
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    /// Flags the dialog reports before configuration.
    pub initial_options: DialogOptions,
    pub outcome: ShowOutcome,
    pub selection: Vec<FakeEntry>,
    pub faults: Vec<Fault>,
}

impl FakeScript {
    /// A user who picks the given paths.
    pub fn picking<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selection: paths.into_iter().map(FakeEntry::path).collect(),
            ..Self::default()
        }
    }

    /// A user who dismisses the dialog.
    pub fn cancelling() -> Self {
        Self {
            outcome: ShowOutcome::Cancel,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    #[must_use]
    pub fn with_initial_options(mut self, options: DialogOptions) -> Self {
        self.initial_options = options;
        self
    }

    #[must_use]
    pub fn with_entries(mut self, entries: Vec<FakeEntry>) -> Self {
        self.selection = entries;
        self
    }

    fn fails_at(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }
}

/// Shared record of everything a fake backend did.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Ledger {
    fn lock(&self) -> MutexGuard<'_, Vec<Event>> {
        // A panicking test thread must not hide the ledger from the others.
        self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, event: Event) {
        self.lock().push(event);
    }

    /// All events so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    pub fn acquired(&self, resource: Resource) -> usize {
        self.count(&Event::Acquired(resource))
    }

    pub fn released(&self, resource: Resource) -> usize {
        self.count(&Event::Released(resource))
    }

    fn count(&self, wanted: &Event) -> usize {
        self.lock().iter().filter(|e| *e == wanted).count()
    }

    /// `true` when every acquired resource was released exactly once.
    pub fn is_balanced(&self) -> bool {
        [
            Resource::Apartment,
            Resource::Dialog,
            Resource::ItemArray,
            Resource::Item,
            Resource::PathBuffer,
        ]
        .into_iter()
        .all(|r| self.acquired(r) == self.released(r))
    }

    /// `true` when no interface or buffer was released after the apartment
    /// was left.
    pub fn released_before_uninitialize(&self) -> bool {
        let events = self.lock();
        let Some(left) = events
            .iter()
            .rposition(|e| *e == Event::Released(Resource::Apartment))
        else {
            return true;
        };
        events[left + 1..]
            .iter()
            .all(|e| !matches!(e, Event::Released(_)))
    }

    /// The title set on the dialog, if any.
    pub fn title(&self) -> Option<String> {
        self.lock().iter().find_map(|e| match e {
            Event::SetTitle(title) => Some(title.clone()),
            _ => None,
        })
    }

    /// The filter applied to the dialog, if any.
    pub fn filter(&self) -> Option<FilterSpec> {
        self.lock().iter().find_map(|e| match e {
            Event::SetFilter(spec) => Some(spec.clone()),
            _ => None,
        })
    }

    /// The options last written to the dialog, if any.
    pub fn options(&self) -> Option<DialogOptions> {
        self.lock().iter().rev().find_map(|e| match e {
            Event::SetOptions(options) => Some(*options),
            _ => None,
        })
    }

    pub fn was_shown(&self) -> bool {
        self.lock().contains(&Event::Show)
    }
}

/// Ledger-backed guard; records its release when dropped.
#[derive(Debug)]
pub struct Tracked {
    resource: Resource,
    ledger: Ledger,
}

impl Tracked {
    fn acquire(resource: Resource, ledger: &Ledger) -> Self {
        ledger.record(Event::Acquired(resource));
        Self {
            resource,
            ledger: ledger.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.ledger.record(Event::Released(self.resource));
    }
}

/// Backend that plays back a [`FakeScript`].
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    script: Arc<FakeScript>,
    ledger: Ledger,
}

impl FakeBackend {
    pub fn new(script: FakeScript) -> Self {
        Self {
            script: Arc::new(script),
            ledger: Ledger::default(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

impl DialogBackend for FakeBackend {
    type Apartment = Tracked;
    type Dialog = FakeDialog;

    fn initialize(&self) -> PickerResult<Tracked> {
        if self.script.fails_at(Fault::Initialize) {
            return Err(PickerError::ComInit(E_FAIL));
        }
        Ok(Tracked::acquire(Resource::Apartment, &self.ledger))
    }

    fn create_dialog(&self) -> PickerResult<FakeDialog> {
        if self.script.fails_at(Fault::CreateDialog) {
            return Err(PickerError::CreateDialog(E_FAIL));
        }
        Ok(FakeDialog {
            script: Arc::clone(&self.script),
            ledger: self.ledger.clone(),
            _handle: Tracked::acquire(Resource::Dialog, &self.ledger),
        })
    }
}

#[derive(Debug)]
pub struct FakeDialog {
    script: Arc<FakeScript>,
    ledger: Ledger,
    _handle: Tracked,
}

impl FakeDialog {
    fn configure_fault(&self, fault: Fault, step: ConfigStep) -> PickerResult<()> {
        if self.script.fails_at(fault) {
            return Err(PickerError::Configure { step, code: E_FAIL });
        }
        Ok(())
    }

    fn item(&self, entry: FakeEntry) -> FakeItem {
        FakeItem {
            entry,
            ledger: self.ledger.clone(),
            _handle: Tracked::acquire(Resource::Item, &self.ledger),
        }
    }
}

impl DialogHandle for FakeDialog {
    type Item = FakeItem;
    type Items = FakeItemArray;

    fn options(&self) -> PickerResult<DialogOptions> {
        self.configure_fault(Fault::GetOptions, ConfigStep::Options)?;
        Ok(self.script.initial_options)
    }

    fn set_options(&self, options: DialogOptions) -> PickerResult<()> {
        self.configure_fault(Fault::SetOptions, ConfigStep::Options)?;
        self.ledger.record(Event::SetOptions(options));
        Ok(())
    }

    fn set_title(&self, title: &str) -> PickerResult<()> {
        self.configure_fault(Fault::SetTitle, ConfigStep::Title)?;
        self.ledger.record(Event::SetTitle(title.to_string()));
        Ok(())
    }

    fn set_filter(&self, filter: &FilterSpec) -> PickerResult<()> {
        self.configure_fault(Fault::SetFilter, ConfigStep::FileTypes)?;
        self.ledger.record(Event::SetFilter(filter.clone()));
        Ok(())
    }

    fn show(&self) -> PickerResult<()> {
        self.ledger.record(Event::Show);
        match self.script.outcome {
            ShowOutcome::Accept => Ok(()),
            ShowOutcome::Cancel => Err(PickerError::Cancelled),
            ShowOutcome::Fail(code) => Err(PickerError::Show(code)),
        }
    }

    fn result(&self) -> PickerResult<FakeItem> {
        let first = self.script.selection.first().cloned();
        match first {
            Some(entry) if !self.script.fails_at(Fault::GetResult) => Ok(self.item(entry)),
            _ => Err(PickerError::Results {
                stage: ResultStage::Item,
                code: E_FAIL,
            }),
        }
    }

    fn results(&self) -> PickerResult<FakeItemArray> {
        if self.script.fails_at(Fault::GetResults) {
            return Err(PickerError::Results {
                stage: ResultStage::ItemArray,
                code: E_FAIL,
            });
        }
        Ok(FakeItemArray {
            script: Arc::clone(&self.script),
            ledger: self.ledger.clone(),
            _handle: Tracked::acquire(Resource::ItemArray, &self.ledger),
        })
    }
}

#[derive(Debug)]
pub struct FakeItemArray {
    script: Arc<FakeScript>,
    ledger: Ledger,
    _handle: Tracked,
}

impl ShellItemCollection for FakeItemArray {
    type Item = FakeItem;

    fn count(&self) -> PickerResult<u32> {
        if self.script.fails_at(Fault::GetCount) {
            return Err(PickerError::Results {
                stage: ResultStage::ItemCount,
                code: E_FAIL,
            });
        }
        Ok(u32::try_from(self.script.selection.len()).unwrap_or(u32::MAX))
    }

    fn item_at(&self, index: u32) -> PickerResult<FakeItem> {
        let entry = usize::try_from(index)
            .ok()
            .and_then(|i| self.script.selection.get(i));
        match entry {
            Some(FakeEntry::Unreachable) | None => Err(PickerError::Results {
                stage: ResultStage::Item,
                code: E_FAIL,
            }),
            Some(entry) => Ok(FakeItem {
                entry: entry.clone(),
                ledger: self.ledger.clone(),
                _handle: Tracked::acquire(Resource::Item, &self.ledger),
            }),
        }
    }
}

#[derive(Debug)]
pub struct FakeItem {
    entry: FakeEntry,
    ledger: Ledger,
    _handle: Tracked,
}

/// A shell-style path buffer: null-terminated UTF-16 that must be freed.
struct PathBuffer {
    units: Option<Vec<u16>>,
    _handle: Tracked,
}

impl PathBuffer {
    fn as_ptr(&self) -> *const u16 {
        self.units
            .as_ref()
            .map_or(std::ptr::null(), |units| units.as_ptr())
    }
}

impl ShellItem for FakeItem {
    fn file_system_path(&self) -> PickerResult<String> {
        let units = match &self.entry {
            FakeEntry::Path(path) => Some(to_wide(path)),
            FakeEntry::NullBuffer => None,
            FakeEntry::Unresolvable | FakeEntry::Unreachable => {
                return Err(PickerError::Results {
                    stage: ResultStage::Item,
                    code: E_FAIL,
                });
            }
        };
        let buffer = PathBuffer {
            units,
            _handle: Tracked::acquire(Resource::PathBuffer, &self.ledger),
        };
        // SAFETY: the buffer is null or a null-terminated vector that lives
        // until `buffer` drops at the end of this function.
        Ok(unsafe { from_wide_ptr(buffer.as_ptr()) })
    }
}
