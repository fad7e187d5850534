//! Exit code constants and error mapping for stackforge.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `GENERATION_FAILED` | At least one component failed or the batch was rolled back |
//! | 4 | `CACHE_ERROR` | Tool cache import/export/persistence failed |
//! | 130 | `CANCELED` | Run canceled (Ctrl+C or deadline) |

use crate::error::{ErrorCategory, StackforgeError};

/// Process exit code.
///
/// ```rust
/// use stackforge_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(3), ExitCode::GENERATION_FAILED);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments or configuration error
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Generation failed - a component failed with no fallback, or the batch rolled back
    pub const GENERATION_FAILED: ExitCode = ExitCode(3);

    /// Tool cache error
    pub const CACHE_ERROR: ExitCode = ExitCode(4);

    /// Canceled by the user or a deadline
    pub const CANCELED: ExitCode = ExitCode(130);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl StackforgeError {
    /// Map this error to the documented exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Cache(_) => ExitCode::CACHE_ERROR,
            Self::Generation(e) if e.category == ErrorCategory::Canceled => ExitCode::CANCELED,
            Self::Generation(e) if e.category == ErrorCategory::Validation => ExitCode::CLI_ARGS,
            Self::Generation(_) => ExitCode::GENERATION_FAILED,
            Self::Runner(e) if e.is_canceled() => ExitCode::CANCELED,
            Self::Runner(_) | Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}
