//! Per-call dialog configuration.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::filter::FilterSpec;

/// What the dialog picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    File,
    Folder,
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Folder => "folder",
        })
    }
}

/// How many entries the user may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    Single,
    Multiple,
}

/// Bit set mirroring the shell's `FILEOPENDIALOGOPTIONS`.
///
/// Only the flags this crate sets are named; any other bits reported by
/// the dialog are carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DialogOptions(u32);

impl DialogOptions {
    /// `FOS_PICKFOLDERS`
    pub const PICK_FOLDERS: Self = Self(0x0000_0020);
    /// `FOS_ALLOWMULTISELECT`
    pub const ALLOW_MULTISELECT: Self = Self(0x0000_0200);
    /// `FOS_FILEMUSTEXIST`
    pub const FILE_MUST_EXIST: Self = Self(0x0000_1000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DialogOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DialogOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Everything one dialog invocation needs to know.
///
/// # Examples
/// ```
/// use winpick::{DialogOptions, DialogRequest, Multiplicity, SelectionKind};
///
/// let request = DialogRequest::new(SelectionKind::File, Multiplicity::Multiple)
///     .title("Pick images")
///     .extensions(["jpg", "png"]);
///
/// assert!(request.required_options().contains(DialogOptions::ALLOW_MULTISELECT));
/// assert_eq!(request.filter().unwrap().pattern(), "*.jpg;*.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogRequest {
    title: String,
    kind: SelectionKind,
    multiplicity: Multiplicity,
    extensions: Vec<String>,
}

impl DialogRequest {
    pub fn new(kind: SelectionKind, multiplicity: Multiplicity) -> Self {
        Self {
            title: String::new(),
            kind,
            multiplicity,
            extensions: Vec::new(),
        }
    }

    /// Dialog title. Empty keeps the shell's default title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Bare extensions (`"jpg"`) to offer. Ignored for folder pickers.
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn title_text(&self) -> &str {
        &self.title
    }

    pub const fn kind(&self) -> SelectionKind {
        self.kind
    }

    pub const fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Flags that must be set on top of whatever the dialog already has.
    pub fn required_options(&self) -> DialogOptions {
        let mut options = DialogOptions::FILE_MUST_EXIST;
        if self.kind == SelectionKind::Folder {
            options |= DialogOptions::PICK_FOLDERS;
        }
        if self.multiplicity == Multiplicity::Multiple {
            options |= DialogOptions::ALLOW_MULTISELECT;
        }
        options
    }

    /// The file type filter to apply, if any. Folder pickers never get one.
    pub fn filter(&self) -> Option<FilterSpec> {
        match self.kind {
            SelectionKind::File => FilterSpec::from_extensions(self.extensions.as_slice()),
            SelectionKind::Folder => None,
        }
    }
}
