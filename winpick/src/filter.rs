//! File type filter construction.

/// Display name of the single filter entry built from an extension list.
pub const SUPPORTED_FILES_LABEL: &str = "Supported Files";

/// A `(label, wildcard pattern)` pair restricting which files the dialog
/// offers for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    name: String,
    pattern: String,
}

impl FilterSpec {
    /// Build the `"Supported Files"` entry for a list of bare extensions.
    ///
    /// Each extension becomes `*.ext`, joined with `;`. A leading `.` or
    /// `*.` is stripped and blank entries are skipped. Returns `None` when
    /// nothing is left, meaning no filter should be applied.
    ///
    /// # Examples
    /// ```
    /// use winpick::FilterSpec;
    ///
    /// let spec = FilterSpec::from_extensions(&["jpg", "png"]).unwrap();
    /// assert_eq!(spec.name(), "Supported Files");
    /// assert_eq!(spec.pattern(), "*.jpg;*.png");
    ///
    /// assert!(FilterSpec::from_extensions::<&str>(&[]).is_none());
    /// ```
    pub fn from_extensions<S: AsRef<str>>(extensions: &[S]) -> Option<Self> {
        let pattern = extensions
            .iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .map(|ext| format!("*.{ext}"))
            .collect::<Vec<_>>()
            .join(";");

        if pattern.is_empty() {
            return None;
        }

        Some(Self {
            name: SUPPORTED_FILES_LABEL.to_string(),
            pattern,
        })
    }

    /// Label shown in the dialog's file type dropdown.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Semicolon-separated wildcard list, e.g. `*.jpg;*.png`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn normalize_extension(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let bare = trimmed
        .strip_prefix("*.")
        .or_else(|| trimmed.strip_prefix('.'))
        .unwrap_or(trimmed)
        .trim();
    (!bare.is_empty()).then_some(bare)
}
