use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

// ============================================================================
// CommandSpec - argv-style process specification
// ============================================================================

/// Specification for an external tool invocation.
///
/// Arguments are stored as discrete `OsString` elements and handed to
/// `Command::args`, so shell metacharacters in component names or option
/// values are never interpreted.
///
/// # Example
///
/// ```rust
/// use stackforge_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("npx")
///     .arg("create-next-app@latest")
///     .arg("web")
///     .cwd("/tmp/staging");
///
/// assert_eq!(cmd.program, OsString::from("npx"));
/// assert_eq!(cmd.args.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    /// Create a new `CommandSpec` for `program`.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set one environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Program name as a lossy UTF-8 string, for logs and error messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Build a `std::process::Command` using argv-style APIs only.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_new() {
        let cmd = CommandSpec::new("go");
        assert_eq!(cmd.program, OsString::from("go"));
        assert!(cmd.args.is_empty());
        assert!(cmd.cwd.is_none());
        assert!(cmd.env.is_none());
    }

    #[test]
    fn test_command_spec_args() {
        let cmd = CommandSpec::new("go")
            .arg("mod")
            .args(["init", "example.com/api"]);
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.args[0], OsString::from("mod"));
        assert_eq!(cmd.args[2], OsString::from("example.com/api"));
    }

    #[test]
    fn test_command_spec_cwd_and_env() {
        let cmd = CommandSpec::new("npx")
            .cwd("/tmp/staging")
            .env("CI", "1")
            .env("NEXT_TELEMETRY_DISABLED", "1");
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp/staging")));
        let env = cmd.env.as_ref().unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env.get(&OsString::from("CI")), Some(&OsString::from("1")));
    }

    #[test]
    fn test_display_joins_argv() {
        let cmd = CommandSpec::new("swift").args(["package", "init"]);
        assert_eq!(cmd.to_string(), "swift package init");
        assert_eq!(cmd.program_name(), "swift");
    }

    #[test]
    fn test_metacharacters_stay_single_argument() {
        let cmd = CommandSpec::new("echo").arg("a; rm -rf /");
        assert_eq!(cmd.args.len(), 1);
        assert_eq!(cmd.args[0], OsString::from("a; rm -rf /"));
    }
}
