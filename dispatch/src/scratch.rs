use std::ffi::{c_char, c_int};

use crate::error::{DispatchError, Result};

/// Default capacity of the error-message buffer, in bytes.
pub const DEFAULT_ERROR_MESSAGE_LEN: usize = 128;

/// Error-message buffer and error flag handed to one foreign call.
///
/// A fresh scratch is allocated per call, so concurrent calls never observe
/// each other's errors. The buffer starts space-filled, as a blank Fortran
/// character variable would be.
///
/// # Examples
///
/// ```
/// use ccpp_dispatch::ErrorScratch;
///
/// let mut scratch = ErrorScratch::new(16);
/// assert!(scratch.check("foo_run").is_ok());
///
/// scratch.report(1, "bad column");
/// let err = scratch.check("foo_run").unwrap_err();
/// assert_eq!(err.to_string(), "foo_run: bad column");
/// ```
#[derive(Debug, Clone)]
pub struct ErrorScratch {
    message: Vec<u8>,
    flag: c_int,
}

impl Default for ErrorScratch {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_MESSAGE_LEN)
    }
}

impl ErrorScratch {
    pub fn new(capacity: usize) -> Self {
        Self {
            message: vec![b' '; capacity],
            flag: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.message.len()
    }

    pub fn flag(&self) -> c_int {
        self.flag
    }

    /// Decoded message with trailing blanks and NULs removed.
    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.message)
            .trim_end_matches([' ', '\0'])
            .to_string()
    }

    pub fn message_ptr(&mut self) -> *mut c_char {
        self.message.as_mut_ptr().cast()
    }

    pub fn flag_ptr(&mut self) -> *mut c_int {
        &mut self.flag
    }

    /// Sets the flag and message the way a foreign routine would.
    ///
    /// The message is truncated to the buffer capacity.
    pub fn report(&mut self, flag: c_int, message: &str) {
        self.message.fill(b' ');
        let len = message.len().min(self.message.len());
        self.message[..len].copy_from_slice(&message.as_bytes()[..len]);
        self.flag = flag;
    }

    /// Converts a non-zero flag into [`DispatchError::Routine`].
    pub fn check(&self, routine: &str) -> Result<()> {
        if self.flag == 0 {
            return Ok(());
        }
        Err(DispatchError::Routine {
            routine: routine.to_string(),
            message: self.message(),
        })
    }
}
