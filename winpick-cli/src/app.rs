#![cfg_attr(not(windows), allow(dead_code))]

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use winpick::{DialogBackend, FilePicker, PickerError, PickerResult, friendly_com_hint};

/// Exit status for a completed selection.
pub const EXIT_OK: u8 = 0;
/// Exit status when the user cancelled or picked nothing usable.
pub const EXIT_NO_SELECTION: u8 = 1;
/// Exit status for any other failure.
pub const EXIT_FAILURE: u8 = 2;

/// Open native Windows file and folder pickers and print the chosen paths.
#[derive(Debug, Parser)]
#[command(name = "winpick", version, about)]
pub struct Cli {
    /// Dialog title; empty keeps the system default.
    #[arg(short, long, global = true, default_value = "")]
    pub title: String,

    /// Also write a daily rolling log file into this directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Pick a single file.
    File {
        /// Allowed extensions, e.g. `-e jpg -e png` or `-e jpg,png`.
        #[arg(short = 'e', long = "ext", value_delimiter = ',')]
        extensions: Vec<String>,
    },
    /// Pick one or more files.
    Files {
        #[arg(short = 'e', long = "ext", value_delimiter = ',')]
        extensions: Vec<String>,
    },
    /// Pick a single folder.
    Folder,
    /// Pick one or more folders.
    Folders,
    /// Walk through all four pickers in turn.
    Demo,
}

/// Map a picker outcome to the process exit status.
pub fn exit_code<T>(result: &PickerResult<T>) -> u8 {
    match result {
        Ok(_) => EXIT_OK,
        Err(err) if err.is_no_selection() => EXIT_NO_SELECTION,
        Err(_) => EXIT_FAILURE,
    }
}

/// Execute `cli.command` against `picker`, writing paths to `out`.
///
/// # Errors
///
/// Only write failures on `out` are returned; picker failures are
/// reported on stderr and folded into the exit status.
pub fn run<B, W>(picker: &FilePicker<B>, cli: &Cli, out: &mut W) -> io::Result<u8>
where
    B: DialogBackend,
    W: Write,
{
    let title = cli.title.as_str();
    let result = match &cli.command {
        Command::File { extensions } => {
            picker.select_file(title, extensions.as_slice()).map(|p| vec![p])
        }
        Command::Files { extensions } => picker.select_files(title, extensions.as_slice()),
        Command::Folder => picker.select_folder(title).map(|p| vec![p]),
        Command::Folders => picker.select_folders(title),
        Command::Demo => {
            run_demo(picker, out)?;
            return Ok(EXIT_OK);
        }
    };

    let code = exit_code(&result);
    match result {
        Ok(paths) => {
            for path in paths {
                writeln!(out, "{path}")?;
            }
        }
        Err(err) => report(&err),
    }
    Ok(code)
}

fn report(err: &PickerError) {
    tracing::debug!(error = ?err, "picker returned no paths");
    eprintln!("{}", failure_message(err));
}

/// One-line stderr text for a failed pick. Hints are skipped for a
/// cancel or an empty selection.
fn failure_message(err: &PickerError) -> String {
    match friendly_com_hint(err).filter(|_| !err.is_no_selection()) {
        Some(hint) => format!("winpick: {err} (hint: {hint})"),
        None => format!("winpick: {err}"),
    }
}

/// The four pickers in sequence, reporting each outcome.
pub fn run_demo<B, W>(picker: &FilePicker<B>, out: &mut W) -> io::Result<()>
where
    B: DialogBackend,
    W: Write,
{
    const IMAGES: [&str; 3] = ["jpg", "png", "gif"];

    match picker.select_file("Please select an image", &IMAGES) {
        Ok(file) => writeln!(out, "[Single file] Result: {file}")?,
        Err(err) => writeln!(out, "[Single file] Cancelled or error: {err}")?,
    }

    match picker.select_files("Please select multiple images", &IMAGES) {
        Ok(files) => write_list(out, "[Multiple files]", &files)?,
        Err(err) => writeln!(out, "[Multiple files] Cancelled or error: {err}")?,
    }

    match picker.select_folder("Please select a folder") {
        Ok(folder) => writeln!(out, "[Single folder] Result: {folder}")?,
        Err(err) => writeln!(out, "[Single folder] Cancelled or error: {err}")?,
    }

    match picker.select_folders("Please select multiple folders") {
        Ok(folders) => write_list(out, "[Multiple folders]", &folders)?,
        Err(err) => writeln!(out, "[Multiple folders] Cancelled or error: {err}")?,
    }

    Ok(())
}

fn write_list<W: Write>(out: &mut W, label: &str, paths: &[String]) -> io::Result<()> {
    writeln!(out, "{label} Results ({} total):", paths.len())?;
    for (i, path) in paths.iter().enumerate() {
        writeln!(out, "  {}: {path}", i + 1)?;
    }
    Ok(())
}
