#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// The run completed. Excluded trials do not change this.
    Success = 0,

    /// Invalid CLI/config (bad flag values, unreadable or invalid plan file, bad base url).
    InvalidInput = 30,

    /// Internal/runtime error (client setup failures, output errors).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
