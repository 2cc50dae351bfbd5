//! UTF-16 marshalling between Rust strings and shell string buffers.
//!
//! The shell hands back paths as null-terminated UTF-16 buffers that the
//! callee allocated and the caller must release with `CoTaskMemFree`.
//! Strings passed into the shell go the other way as null-terminated
//! buffers owned by Rust for the duration of the call.

/// Encode `s` as a null-terminated UTF-16 buffer.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode UTF-16 up to the first NUL (or the end of the slice).
///
/// Unpaired surrogates are replaced with U+FFFD rather than failing.
pub fn from_wide(units: &[u16]) -> String {
    let len = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..len])
}

/// Decode a null-terminated UTF-16 buffer. A null pointer yields `""`.
///
/// # Safety
///
/// `ptr` must be null or point to a readable, null-terminated UTF-16
/// buffer that stays valid for the duration of the call.
pub unsafe fn from_wide_ptr(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }

    let mut len = 0;
    // SAFETY: the caller guarantees a terminator exists, so every offset
    // up to and including it is in bounds.
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }

    // SAFETY: `len` units starting at `ptr` were just read above.
    let units = unsafe { std::slice::from_raw_parts(ptr, len) };
    String::from_utf16_lossy(units)
}

#[cfg(windows)]
pub use task_mem::TaskMemWString;

#[cfg(windows)]
mod task_mem {
    use windows::Win32::System::Com::CoTaskMemFree;
    use windows::core::PWSTR;

    /// A wide string the **callee allocated and the caller frees**.
    ///
    /// Owns a buffer returned by a shell call such as
    /// `IShellItem::GetDisplayName` and releases it with `CoTaskMemFree`
    /// exactly once, on drop.
    #[repr(transparent)]
    #[derive(Debug)]
    pub struct TaskMemWString {
        ptr: PWSTR,
    }

    impl TaskMemWString {
        /// Take ownership of a shell-allocated buffer.
        ///
        /// # Safety
        ///
        /// `ptr` must be null or a null-terminated buffer allocated with
        /// the COM task allocator that nobody else will free.
        pub unsafe fn from_raw(ptr: PWSTR) -> Self {
            Self { ptr }
        }

        /// Decode the buffer. A null buffer yields `""`.
        pub fn to_string_lossy(&self) -> String {
            // SAFETY: `from_raw` requires a null or null-terminated buffer,
            // and it stays allocated until `self` is dropped.
            unsafe { super::from_wide_ptr(self.ptr.as_ptr()) }
        }
    }

    impl Drop for TaskMemWString {
        fn drop(&mut self) {
            if !self.ptr.is_null() {
                // SAFETY: the buffer came from the COM task allocator (see
                // `from_raw`) and is owned solely by this wrapper.
                unsafe {
                    CoTaskMemFree(Some(self.ptr.as_ptr().cast_const().cast()));
                }
                self.ptr = PWSTR::null();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_wide_appends_terminator() {
        let wide = to_wide("abc");
        assert_eq!(wide, vec![u16::from(b'a'), u16::from(b'b'), u16::from(b'c'), 0]);
        assert_eq!(to_wide(""), vec![0]);
    }

    #[test]
    fn null_pointer_is_empty_string() {
        // SAFETY: null is explicitly allowed.
        let decoded = unsafe { from_wide_ptr(std::ptr::null()) };
        assert_eq!(decoded, "");
    }

    #[test]
    fn empty_buffer_is_empty_string() {
        let buffer = [0_u16];
        // SAFETY: `buffer` is null-terminated and outlives the call.
        let decoded = unsafe { from_wide_ptr(buffer.as_ptr()) };
        assert_eq!(decoded, "");
    }

    #[test]
    fn decodes_non_ascii_paths() {
        let path = r"C:\Users\Zoë\Pictures\日本.png";
        let wide = to_wide(path);
        // SAFETY: `wide` is null-terminated and outlives the call.
        let decoded = unsafe { from_wide_ptr(wide.as_ptr()) };
        assert_eq!(decoded, path);
        assert_eq!(from_wide(&wide), path);
    }

    #[test]
    fn stops_at_first_terminator() {
        let units = [u16::from(b'a'), 0, u16::from(b'b'), 0];
        assert_eq!(from_wide(&units), "a");
        assert_eq!(from_wide(&units[2..]), "b");
        assert_eq!(from_wide(&[]), "");
    }

    #[test]
    fn unpaired_surrogate_is_replaced() {
        let units = [u16::from(b'x'), 0xD800, 0];
        // SAFETY: `units` is null-terminated and outlives the call.
        let decoded = unsafe { from_wide_ptr(units.as_ptr()) };
        assert_eq!(decoded, "x\u{FFFD}");
    }
}
