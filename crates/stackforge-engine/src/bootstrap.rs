//! Bootstrap executors that drive each platform's own scaffolding tool.

use camino::Utf8PathBuf;
use std::sync::Arc;

use stackforge_config::{ComponentOptions, ComponentSpec, PackageManager};
use stackforge_runner::{CommandSpec, OutputStream, ProcessOutput, ProcessRunner, StreamLine};
use stackforge_utils::error::GenerationError;
use stackforge_utils::paths;
use stackforge_utils::types::ComponentType;

use crate::generator::{BootstrapExecutor, BootstrapOutcome, GenerationContext};

/// Lines of stderr kept in a tool failure message
const STDERR_TAIL_LINES: usize = 20;

/// Runs the catalogue command for one component type through a
/// [`ProcessRunner`].
pub struct ToolBootstrapper {
    component_type: ComponentType,
    runner: Arc<dyn ProcessRunner>,
}

impl ToolBootstrapper {
    #[must_use]
    pub fn new(component_type: ComponentType, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            component_type,
            runner,
        }
    }

    /// The command to run and the directory it runs in.
    ///
    /// `create-next-app` creates `<name>/` itself and so runs in the staging
    /// root; every other tool initialises the current directory.
    pub fn command_for(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
    ) -> (CommandSpec, Utf8PathBuf) {
        let component_dir = ctx.component_dir(spec);
        let cmd = match &spec.options {
            ComponentOptions::Nextjs(opts) => {
                let mut cmd = CommandSpec::new("npx")
                    .args(self.default_flags())
                    .arg(&spec.name)
                    .arg("--yes")
                    .arg(if opts.typescript { "--ts" } else { "--js" })
                    .arg(if opts.tailwind { "--tailwind" } else { "--no-tailwind" })
                    .arg(if opts.app_router { "--app" } else { "--no-app" });
                cmd = cmd.arg(match opts.package_manager {
                    PackageManager::Npm => "--use-npm",
                    PackageManager::Yarn => "--use-yarn",
                    PackageManager::Pnpm => "--use-pnpm",
                    PackageManager::Bun => "--use-bun",
                });
                cmd.cwd(ctx.staging_dir.as_std_path())
            }
            ComponentOptions::GoBackend(opts) => CommandSpec::new("go")
                .args(self.default_flags())
                .arg(&opts.module_path)
                .cwd(component_dir.as_std_path()),
            ComponentOptions::Android(opts) => CommandSpec::new("gradle")
                .args(self.default_flags())
                .arg("--type")
                .arg(if opts.kotlin {
                    "kotlin-application"
                } else {
                    "java-application"
                })
                .arg("--dsl")
                .arg("kotlin")
                .arg("--project-name")
                .arg(&spec.name)
                .arg("--package")
                .arg(&opts.package_name)
                .cwd(component_dir.as_std_path()),
            ComponentOptions::Ios(_) => CommandSpec::new("swift")
                .args(self.default_flags())
                .arg("--name")
                .arg(&spec.name)
                .cwd(component_dir.as_std_path()),
        };
        (cmd, component_dir)
    }

    fn prepare(&self, spec: &ComponentSpec, ctx: &GenerationContext) -> Result<(), GenerationError> {
        let dir = if self.component_type == ComponentType::Nextjs {
            ctx.staging_dir.clone()
        } else {
            ctx.component_dir(spec)
        };
        paths::ensure_dir_all(&dir).map_err(|e| {
            GenerationError::tool_execution(format!("could not create {dir}"))
                .with_component(&spec.name)
                .with_cause(e)
        })
    }

    fn finish(
        &self,
        spec: &ComponentSpec,
        program: &str,
        output: &ProcessOutput,
        output_dir: Utf8PathBuf,
    ) -> Result<BootstrapOutcome, GenerationError> {
        if !output.success() {
            let code = output
                .exit_code
                .map_or_else(|| "a signal".to_string(), |c| c.to_string());
            let mut err = GenerationError::tool_execution(format!("{program} exited with {code}"))
                .with_component(&spec.name);
            let tail = output.stderr_tail(STDERR_TAIL_LINES);
            if !tail.is_empty() {
                err = err.with_cause(tail);
            }
            return Err(err);
        }
        Ok(BootstrapOutcome {
            success: true,
            exit_code: output.exit_code,
            output_dir,
            tool: program.to_string(),
            manual_steps: manual_steps_after_bootstrap(&spec.options),
        })
    }
}

impl BootstrapExecutor for ToolBootstrapper {
    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    fn default_flags(&self) -> Vec<String> {
        let flags: &[&str] = match self.component_type {
            ComponentType::Nextjs => &["create-next-app@latest"],
            ComponentType::GoBackend => &["mod", "init"],
            ComponentType::Android => &["init", "--use-defaults", "--no-split-project"],
            ComponentType::Ios => &["package", "init", "--type", "executable"],
        };
        flags.iter().map(|f| (*f).to_string()).collect()
    }

    fn validate_config(&self, spec: &ComponentSpec) -> Result<(), GenerationError> {
        if spec.component_type != self.component_type {
            return Err(GenerationError::validation(format!(
                "{} bootstrapper cannot generate a {} component",
                self.component_type, spec.component_type
            ))
            .with_component(&spec.name));
        }
        spec.validate()
            .map_err(|e| GenerationError::from_config(&spec.name, &e))
    }

    fn execute(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
    ) -> Result<BootstrapOutcome, GenerationError> {
        self.prepare(spec, ctx)?;
        let (cmd, output_dir) = self.command_for(spec, ctx);
        let program = cmd.program_name();
        tracing::debug!(component = %spec.name, program = %program, "Running bootstrap tool");
        let output = self
            .runner
            .run(&cmd, spec.timeout, &ctx.cancel)
            .map_err(|e| GenerationError::from(e).with_component(&spec.name))?;
        self.finish(spec, &program, &output, output_dir)
    }

    fn execute_streaming(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
        sink: &mut dyn FnMut(StreamLine),
    ) -> Result<BootstrapOutcome, GenerationError> {
        self.prepare(spec, ctx)?;
        let (cmd, output_dir) = self.command_for(spec, ctx);
        let program = cmd.program_name();
        let output = self
            .runner
            .run_streaming(&cmd, spec.timeout, &ctx.cancel, sink)
            .map_err(|e| GenerationError::from(e).with_component(&spec.name))?;
        self.finish(spec, &program, &output, output_dir)
    }

    fn expected_files(&self, spec: &ComponentSpec) -> Vec<String> {
        expected_files_for(spec)
    }
}

/// Key files a finished component of this type contains.
#[must_use]
pub fn expected_files_for(spec: &ComponentSpec) -> Vec<String> {
    match &spec.options {
        ComponentOptions::Nextjs(opts) => {
            let mut files = vec!["package.json".to_string()];
            let ext = if opts.typescript { "tsx" } else { "jsx" };
            if opts.app_router {
                files.push(format!("app/page.{ext}"));
            } else {
                files.push(format!("pages/index.{ext}"));
            }
            files
        }
        ComponentOptions::GoBackend(_) => vec!["go.mod".to_string(), "main.go".to_string()],
        ComponentOptions::Android(_) => vec![
            "settings.gradle.kts".to_string(),
            "app/build.gradle.kts".to_string(),
        ],
        ComponentOptions::Ios(_) => vec![
            "Package.swift".to_string(),
            format!("Sources/{}/main.swift", spec.name),
        ],
    }
}

fn manual_steps_after_bootstrap(options: &ComponentOptions) -> Vec<String> {
    match options {
        ComponentOptions::GoBackend(_) => {
            vec!["Add an entry point (main.go or cmd/<name>/main.go)".to_string()]
        }
        _ => Vec::new(),
    }
}

/// Forward one tool output line as a structured event.
pub(crate) fn log_stream_line(component: &str, line: &StreamLine) {
    let stream = match line.stream {
        OutputStream::Stdout => "stdout",
        OutputStream::Stderr => "stderr",
    };
    tracing::debug!(component = %component, stream = stream, "{}", line.line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackforge_runner::{CancellationToken, RunnerError};
    use std::sync::Mutex;
    use std::time::Duration;
    use stackforge_utils::error::ErrorCategory;
    use tempfile::TempDir;

    struct RecordingRunner {
        result: Result<ProcessOutput, RunnerError>,
        commands: Mutex<Vec<CommandSpec>>,
    }

    impl RecordingRunner {
        fn exiting(code: i32, stderr: &str) -> Self {
            Self {
                result: Ok(ProcessOutput::new(Vec::new(), stderr.as_bytes().to_vec(), Some(code))),
                commands: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProcessRunner for RecordingRunner {
        fn run(
            &self,
            cmd: &CommandSpec,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> Result<ProcessOutput, RunnerError> {
            self.commands.lock().unwrap().push(cmd.clone());
            self.result.clone()
        }
    }

    fn argv(cmd: &CommandSpec) -> Vec<String> {
        std::iter::once(cmd.program_name())
            .chain(cmd.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect()
    }

    fn ctx(temp: &TempDir) -> GenerationContext {
        GenerationContext::new(
            Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap(),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_nextjs_command_runs_in_staging_root() {
        let temp = TempDir::new().unwrap();
        let ctx = ctx(&temp);
        let runner = Arc::new(RecordingRunner::exiting(0, ""));
        let bootstrapper = ToolBootstrapper::new(ComponentType::Nextjs, runner);
        let spec = ComponentSpec::new(ComponentType::Nextjs, "web");

        let (cmd, output_dir) = bootstrapper.command_for(&spec, &ctx);
        assert_eq!(
            argv(&cmd),
            ["npx", "create-next-app@latest", "web", "--yes", "--ts", "--tailwind", "--app", "--use-npm"]
        );
        assert_eq!(cmd.cwd.as_deref(), Some(temp.path()));
        assert_eq!(output_dir, ctx.component_dir(&spec));
    }

    #[test]
    fn test_go_command_uses_module_path() {
        let temp = TempDir::new().unwrap();
        let ctx = ctx(&temp);
        let bootstrapper =
            ToolBootstrapper::new(ComponentType::GoBackend, Arc::new(RecordingRunner::exiting(0, "")));
        let spec = ComponentSpec::new(ComponentType::GoBackend, "api");
        let (cmd, _) = bootstrapper.command_for(&spec, &ctx);
        assert_eq!(argv(&cmd), ["go", "mod", "init", "example.com/api"]);
        assert_eq!(cmd.cwd.as_deref(), Some(temp.path().join("api").as_path()));
    }

    #[test]
    fn test_nonzero_exit_is_tool_execution_error() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::exiting(1, "go: cannot determine module path"));
        let bootstrapper = ToolBootstrapper::new(ComponentType::GoBackend, runner);
        let spec = ComponentSpec::new(ComponentType::GoBackend, "api");

        let err = bootstrapper.execute(&spec, &ctx(&temp)).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ToolExecution);
        assert_eq!(err.component.as_deref(), Some("api"));
        assert!(err.cause.unwrap().contains("module path"));
    }

    #[test]
    fn test_missing_program_is_tool_not_found() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner {
            result: Err(RunnerError::ProgramNotFound {
                program: "swift".to_string(),
            }),
            commands: Mutex::new(Vec::new()),
        });
        let bootstrapper = ToolBootstrapper::new(ComponentType::Ios, runner);
        let spec = ComponentSpec::new(ComponentType::Ios, "app");
        let err = bootstrapper.execute(&spec, &ctx(&temp)).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ToolNotFound);
    }

    #[test]
    fn test_success_reports_tool() {
        let temp = TempDir::new().unwrap();
        let bootstrapper =
            ToolBootstrapper::new(ComponentType::Android, Arc::new(RecordingRunner::exiting(0, "")));
        let spec = ComponentSpec::new(ComponentType::Android, "mobile");
        let outcome = bootstrapper.execute(&spec, &ctx(&temp)).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.tool, "gradle");
        assert!(outcome.output_dir.ends_with("mobile"));
    }

    #[test]
    fn test_validate_config_rejects_wrong_type() {
        let bootstrapper =
            ToolBootstrapper::new(ComponentType::Ios, Arc::new(RecordingRunner::exiting(0, "")));
        let spec = ComponentSpec::new(ComponentType::Android, "mobile");
        let err = bootstrapper.validate_config(&spec).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Validation);
    }

    #[test]
    fn test_expected_files_follow_options() {
        let spec = ComponentSpec::new(ComponentType::Ios, "App");
        assert_eq!(
            expected_files_for(&spec),
            vec!["Package.swift".to_string(), "Sources/App/main.swift".to_string()]
        );
    }
}
