//! Process execution for external scaffolding tools
//!
//! Every external tool invocation goes through [`CommandSpec`] so arguments
//! cross the process boundary as discrete argv elements, never as shell strings.
//! [`NativeRunner`] enforces a per-invocation timeout and honours a shared
//! [`CancellationToken`] so a single cancel propagates to every in-flight tool.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use native::NativeRunner;
pub use process::{OutputStream, ProcessOutput, ProcessRunner, StreamLine};
pub use tokio_util::sync::CancellationToken;
