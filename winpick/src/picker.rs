//! Dialog session orchestration shared by all four pickers.

use crate::backend::{DialogBackend, DialogHandle, ShellItem, ShellItemCollection};
use crate::errors::{PickerError, PickerResult};
use crate::request::{DialogOptions, DialogRequest, Multiplicity, SelectionKind};

/// Resolve `item` to its filesystem path, or `""` if the shell cannot.
///
/// Items without a filesystem path (virtual folders, devices) land here.
pub fn resolve_path<I: ShellItem + ?Sized>(item: &I) -> String {
    match item.file_system_path() {
        Ok(path) => path,
        Err(err) => {
            tracing::warn!(error = %err, "could not resolve selected item to a path");
            String::new()
        }
    }
}

/// Runs file and folder dialogs through a [`DialogBackend`].
///
/// Each call enters its own apartment, creates its own dialog and releases
/// everything before returning, so a picker holds no state between calls
/// and independent threads never share a dialog.
#[derive(Debug, Clone, Default)]
pub struct FilePicker<B> {
    backend: B,
}

impl<B: DialogBackend> FilePicker<B> {
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Pick one file. `extensions` are bare suffixes such as `"jpg"`.
    pub fn select_file<S: AsRef<str>>(
        &self,
        title: &str,
        extensions: &[S],
    ) -> PickerResult<String> {
        let request = DialogRequest::new(SelectionKind::File, Multiplicity::Single)
            .title(title)
            .extensions(extensions.iter().map(AsRef::<str>::as_ref));
        self.run_single(&request)
    }

    /// Pick one or more files.
    pub fn select_files<S: AsRef<str>>(
        &self,
        title: &str,
        extensions: &[S],
    ) -> PickerResult<Vec<String>> {
        let request = DialogRequest::new(SelectionKind::File, Multiplicity::Multiple)
            .title(title)
            .extensions(extensions.iter().map(AsRef::<str>::as_ref));
        self.run(&request)
    }

    /// Pick one folder.
    pub fn select_folder(&self, title: &str) -> PickerResult<String> {
        let request = DialogRequest::new(SelectionKind::Folder, Multiplicity::Single).title(title);
        self.run_single(&request)
    }

    /// Pick one or more folders.
    pub fn select_folders(&self, title: &str) -> PickerResult<Vec<String>> {
        let request =
            DialogRequest::new(SelectionKind::Folder, Multiplicity::Multiple).title(title);
        self.run(&request)
    }

    fn run_single(&self, request: &DialogRequest) -> PickerResult<String> {
        self.run(request)?
            .into_iter()
            .next()
            .ok_or(PickerError::NothingSelected(request.kind()))
    }

    /// Show a dialog for `request` and return the chosen paths in the
    /// order the shell reports them.
    ///
    /// # Errors
    ///
    /// Fails with [`PickerError::Cancelled`] when the user dismisses the
    /// dialog, [`PickerError::NothingSelected`] when no chosen item has a
    /// filesystem path, and the matching variant for any COM failure.
    pub fn run(&self, request: &DialogRequest) -> PickerResult<Vec<String>> {
        let kind = request.kind();
        tracing::debug!(%kind, multiplicity = ?request.multiplicity(), "opening dialog");

        // Declared first so it drops last: every interface below is
        // released before the apartment is left.
        let _apartment = self.backend.initialize()?;
        let dialog = self.backend.create_dialog()?;

        configure(&dialog, request)?;

        dialog.show().inspect_err(|err| {
            if err.is_cancelled() {
                tracing::info!(%kind, "dialog cancelled by user");
            }
        })?;

        let paths = match request.multiplicity() {
            Multiplicity::Single => collect_single(&dialog)?,
            Multiplicity::Multiple => collect_multiple(&dialog)?,
        };

        if paths.is_empty() {
            return Err(PickerError::NothingSelected(kind));
        }

        tracing::debug!(%kind, count = paths.len(), "dialog returned selection");
        Ok(paths)
    }
}

fn configure<D: DialogHandle>(dialog: &D, request: &DialogRequest) -> PickerResult<()> {
    let current = dialog.options().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not read dialog options; starting from none");
        DialogOptions::empty()
    });
    dialog.set_options(current | request.required_options())?;

    let title = request.title_text();
    if !title.is_empty() {
        dialog.set_title(title)?;
    }

    if let Some(filter) = request.filter() {
        tracing::trace!(pattern = filter.pattern(), "applying file type filter");
        dialog.set_filter(&filter)?;
    }

    Ok(())
}

fn collect_single<D: DialogHandle>(dialog: &D) -> PickerResult<Vec<String>> {
    let item = dialog.result()?;
    let path = resolve_path(&item);
    Ok(if path.is_empty() {
        Vec::new()
    } else {
        vec![path]
    })
}

fn collect_multiple<D: DialogHandle>(dialog: &D) -> PickerResult<Vec<String>> {
    let items = dialog.results()?;
    let count = items.count()?;

    let mut paths = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
    for index in 0..count {
        let item = match items.item_at(index) {
            Ok(item) => item,
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping unreadable selection entry");
                continue;
            }
        };
        let path = resolve_path(&item);
        if !path.is_empty() {
            paths.push(path);
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockShellItem;
    use crate::errors::{ConfigStep, HResult, ResultStage};
    use crate::fake::{
        E_FAIL, Event, FakeBackend, FakeEntry, FakeScript, Fault, Resource, ShowOutcome,
    };
    use crate::filter::SUPPORTED_FILES_LABEL;

    fn picker(script: FakeScript) -> FilePicker<FakeBackend> {
        FilePicker::new(FakeBackend::new(script))
    }

    fn assert_clean(picker: &FilePicker<FakeBackend>) {
        let ledger = picker.backend().ledger();
        assert!(ledger.is_balanced(), "unbalanced ledger: {:?}", ledger.events());
        assert!(
            ledger.released_before_uninitialize(),
            "released after CoUninitialize: {:?}",
            ledger.events()
        );
    }

    #[test]
    fn single_file_returns_backend_path() {
        let picker = picker(FakeScript::picking([r"C:\photos\cat.jpg"]));
        let path = picker.select_file("Pick a photo", &["jpg"]).unwrap();
        assert_eq!(path, r"C:\photos\cat.jpg");
        assert_clean(&picker);
    }

    #[test]
    fn multi_select_preserves_order_and_length() {
        let chosen = [r"C:\b.png", r"C:\a.png", r"C:\c.png"];
        let picker = picker(FakeScript::picking(chosen));
        let paths = picker.select_files("", &["png"]).unwrap();
        assert_eq!(paths, chosen);

        let ledger = picker.backend().ledger();
        assert_eq!(ledger.acquired(Resource::Item), 3);
        assert_eq!(ledger.acquired(Resource::ItemArray), 1);
        assert_clean(&picker);
    }

    #[test]
    fn cancel_yields_cancelled_never_a_path() {
        let picker = picker(FakeScript::cancelling());
        assert_eq!(picker.select_file::<&str>("", &[]), Err(PickerError::Cancelled));
        assert_eq!(picker.select_files::<&str>("", &[]), Err(PickerError::Cancelled));
        assert_eq!(picker.select_folder(""), Err(PickerError::Cancelled));
        assert_eq!(picker.select_folders(""), Err(PickerError::Cancelled));
        assert_eq!(picker.backend().ledger().acquired(Resource::Item), 0);
        assert_clean(&picker);
    }

    #[test]
    fn show_failure_is_not_cancellation() {
        let code = HResult(-2_147_467_259);
        let script = FakeScript {
            outcome: ShowOutcome::Fail(code),
            ..FakeScript::default()
        };
        let picker = picker(script);
        assert_eq!(picker.select_folder("x"), Err(PickerError::Show(code)));
        assert_clean(&picker);
    }

    #[test]
    fn extensions_become_supported_files_filter() {
        let picker = picker(FakeScript::picking([r"C:\a.jpg"]));
        picker.select_file("", &["jpg", "png"]).unwrap();

        let filter = picker.backend().ledger().filter().unwrap();
        assert_eq!(filter.name(), SUPPORTED_FILES_LABEL);
        assert_eq!(filter.pattern(), "*.jpg;*.png");
    }

    #[test]
    fn empty_extension_list_applies_no_filter() {
        let picker = picker(FakeScript::picking([r"C:\a.jpg"]));
        picker.select_file::<&str>("", &[]).unwrap();
        assert_eq!(picker.backend().ledger().filter(), None);
    }

    #[test]
    fn folder_mode_never_applies_filter() {
        let picker = picker(FakeScript::picking([r"C:\photos"]));
        let request = DialogRequest::new(SelectionKind::Folder, Multiplicity::Multiple)
            .extensions(["jpg", "png"]);
        let paths = picker.run(&request).unwrap();
        assert_eq!(paths, [r"C:\photos"]);

        let ledger = picker.backend().ledger();
        assert_eq!(ledger.filter(), None);
        assert!(ledger.options().unwrap().contains(DialogOptions::PICK_FOLDERS));
    }

    #[test]
    fn empty_title_keeps_default() {
        let picker = picker(FakeScript::picking([r"C:\a"]));
        picker.select_folder("").unwrap();
        assert_eq!(picker.backend().ledger().title(), None);

        let picker = self::picker(FakeScript::picking([r"C:\a"]));
        picker.select_folder("Choose output").unwrap();
        assert_eq!(picker.backend().ledger().title().as_deref(), Some("Choose output"));
    }

    #[test]
    fn existing_options_are_preserved() {
        let foreign = DialogOptions::from_bits(0x0000_0008 | 0x0200_0000);
        let script = FakeScript::picking([r"C:\a", r"C:\b"]).with_initial_options(foreign);
        let picker = picker(script);
        picker.select_folders("").unwrap();

        let options = picker.backend().ledger().options().unwrap();
        assert!(options.contains(foreign));
        assert!(options.contains(DialogOptions::FILE_MUST_EXIST));
        assert!(options.contains(DialogOptions::PICK_FOLDERS));
        assert!(options.contains(DialogOptions::ALLOW_MULTISELECT));
    }

    #[test]
    fn unreadable_options_fall_back_to_required_flags() {
        let script = FakeScript::picking([r"C:\a.txt"]).with_fault(Fault::GetOptions);
        let picker = picker(script);
        picker.select_file::<&str>("", &[]).unwrap();
        assert_eq!(
            picker.backend().ledger().options(),
            Some(DialogOptions::FILE_MUST_EXIST)
        );
    }

    #[test]
    fn failing_items_are_skipped_not_fatal() {
        let script = FakeScript::default().with_entries(vec![
            FakeEntry::path(r"C:\one"),
            FakeEntry::Unresolvable,
            FakeEntry::Unreachable,
            FakeEntry::NullBuffer,
            FakeEntry::path(r"C:\two"),
        ]);
        let picker = picker(script);
        let paths = picker.select_folders("").unwrap();
        assert_eq!(paths, [r"C:\one", r"C:\two"]);

        let ledger = picker.backend().ledger();
        // Unreachable never yields a handle.
        assert_eq!(ledger.acquired(Resource::Item), 4);
        assert_eq!(ledger.acquired(Resource::PathBuffer), 3);
        assert_clean(&picker);
    }

    #[test]
    fn unresolvable_single_item_is_nothing_selected() {
        let script = FakeScript::default().with_entries(vec![FakeEntry::NullBuffer]);
        let picker = picker(script);
        assert_eq!(
            picker.select_file::<&str>("", &[]),
            Err(PickerError::NothingSelected(SelectionKind::File))
        );
        assert_clean(&picker);
    }

    #[test]
    fn zero_items_is_nothing_selected() {
        let picker = picker(FakeScript::default());
        assert_eq!(
            picker.select_folders(""),
            Err(PickerError::NothingSelected(SelectionKind::Folder))
        );
        assert_clean(&picker);
    }

    #[test]
    fn empty_single_result_is_result_error() {
        let picker = picker(FakeScript::default());
        assert_eq!(
            picker.select_folder(""),
            Err(PickerError::Results { stage: ResultStage::Item, code: E_FAIL })
        );
        assert_clean(&picker);
    }

    #[test]
    fn unresolvable_single_folder_reports_no_folder() {
        let script = FakeScript::default().with_entries(vec![FakeEntry::NullBuffer]);
        let picker = picker(script);
        assert_eq!(picker.select_folder("").unwrap_err().to_string(), "no folder selected");
        assert_clean(&picker);
    }

    #[test]
    fn every_fault_releases_everything() {
        let cases = [
            (Fault::Initialize, PickerError::ComInit(E_FAIL)),
            (Fault::CreateDialog, PickerError::CreateDialog(E_FAIL)),
            (
                Fault::SetOptions,
                PickerError::Configure { step: ConfigStep::Options, code: E_FAIL },
            ),
            (
                Fault::SetTitle,
                PickerError::Configure { step: ConfigStep::Title, code: E_FAIL },
            ),
            (
                Fault::SetFilter,
                PickerError::Configure { step: ConfigStep::FileTypes, code: E_FAIL },
            ),
            (
                Fault::GetResults,
                PickerError::Results { stage: ResultStage::ItemArray, code: E_FAIL },
            ),
            (
                Fault::GetCount,
                PickerError::Results { stage: ResultStage::ItemCount, code: E_FAIL },
            ),
        ];

        for (fault, expected) in cases {
            let script = FakeScript::picking([r"C:\a.txt"]).with_fault(fault);
            let picker = picker(script);
            let result = picker.select_files("title", &["txt"]);
            assert_eq!(result, Err(expected), "fault {fault:?}");
            assert_clean(&picker);
            if fault != Fault::Initialize {
                let ledger = picker.backend().ledger();
                assert_eq!(ledger.acquired(Resource::Apartment), 1, "fault {fault:?}");
            }
        }
    }

    #[test]
    fn single_result_failure_releases_everything() {
        let script = FakeScript::picking([r"C:\a.txt"]).with_fault(Fault::GetResult);
        let picker = picker(script);
        assert_eq!(
            picker.select_file::<&str>("", &[]),
            Err(PickerError::Results { stage: ResultStage::Item, code: E_FAIL })
        );
        assert_clean(&picker);
    }

    #[test]
    fn configuration_failure_skips_show() {
        let script = FakeScript::picking([r"C:\a.txt"]).with_fault(Fault::SetOptions);
        let picker = picker(script);
        assert!(picker.select_file::<&str>("", &[]).is_err());
        assert!(!picker.backend().ledger().was_shown());
    }

    #[test]
    fn dialog_is_configured_before_show() {
        let picker = picker(FakeScript::picking([r"C:\a.txt"]));
        picker.select_file("Open", &["txt"]).unwrap();

        let events = picker.backend().ledger().events();
        let show = events.iter().position(|e| *e == Event::Show).unwrap();
        let filter = events
            .iter()
            .position(|e| matches!(e, Event::SetFilter(_)))
            .unwrap();
        let title = events
            .iter()
            .position(|e| matches!(e, Event::SetTitle(_)))
            .unwrap();
        assert!(filter < show && title < show);
        assert_eq!(events.first(), Some(&Event::Acquired(Resource::Apartment)));
        assert_eq!(events.last(), Some(&Event::Released(Resource::Apartment)));
    }

    #[test]
    fn repeated_calls_each_balance() {
        let picker = picker(FakeScript::picking([r"C:\a", r"C:\b"]));
        for _ in 0..3 {
            assert_eq!(picker.select_folders("").unwrap().len(), 2);
        }
        let ledger = picker.backend().ledger();
        assert_eq!(ledger.acquired(Resource::Apartment), 3);
        assert_eq!(ledger.acquired(Resource::Dialog), 3);
        assert_clean(&picker);
    }

    #[test]
    fn concurrent_calls_do_not_interfere() {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                std::thread::spawn(move || {
                    let expected = format!(r"C:\thread-{n}");
                    let picker = FilePicker::new(FakeBackend::new(FakeScript::picking([
                        expected.clone(),
                    ])));
                    let path = picker.select_folder(&format!("thread {n}")).unwrap();
                    let ledger = picker.backend().ledger();
                    (
                        n,
                        path,
                        expected,
                        ledger.title(),
                        ledger.is_balanced(),
                    )
                })
            })
            .collect();

        for handle in handles {
            let (n, path, expected, title, balanced) = handle.join().unwrap();
            assert_eq!(path, expected);
            assert_eq!(title, Some(format!("thread {n}")));
            assert!(balanced);
        }
    }

    #[test]
    fn resolve_path_passes_through_success() {
        let mut item = MockShellItem::new();
        item.expect_file_system_path()
            .times(1)
            .returning(|| Ok(r"D:\music\song.flac".to_string()));
        assert_eq!(resolve_path(&item), r"D:\music\song.flac");
    }

    #[test]
    fn resolve_path_maps_failure_to_empty() {
        let mut item = MockShellItem::new();
        item.expect_file_system_path().times(1).returning(|| {
            Err(PickerError::Results {
                stage: ResultStage::Item,
                code: E_FAIL,
            })
        });
        assert_eq!(resolve_path(&item), "");
    }
}
