//! Description of the managed process and its launch templates.

use std::path::{Path, PathBuf};

use warden_core::LaunchSpec;

/// Substring every managed-process command line contains (the interpreter).
pub const DEFAULT_INTERPRETER_MARKER: &str = "python";

/// Default module run by the interpreter.
pub const DEFAULT_MODULE: &str = "heroku";

/// Default launch flag of the managed process.
pub const DEFAULT_LAUNCH_FLAG: &str = "--no-web";

/// Default location of the proxy relay binary.
pub const DEFAULT_RELAY: &str = "/usr/bin/proxychains";

/// Default PATH handed to the managed process.
pub const DEFAULT_PATH_OVERRIDE: &str = "/usr/bin:/bin:/usr/local/bin";

/// Package upgraded by the self-update command.
pub const DEFAULT_PACKAGE: &str = "heroku-tl-new";

/// Configuration of the managed process.
///
/// Use the builder methods to customise a default target rooted at a
/// working directory.
///
/// # Example
///
/// ```
/// use warden_runtime::TargetConfig;
///
/// let target = TargetConfig::new("/srv/bot")
///     .with_python("/srv/venv/bin/python")
///     .with_relay("/opt/proxychains");
/// assert!(target.primary_command().ends_with("-m heroku --no-web"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// Working directory of the managed process.
    pub workdir: PathBuf,
    /// Interpreter used by both launch templates.
    pub python: PathBuf,
    /// Module run by the interpreter (`-m <module>`).
    pub module: String,
    /// Flag passed to the module.
    pub launch_flag: String,
    /// Substring identifying the interpreter in command lines.
    pub interpreter_marker: String,
    /// Proxy relay binary prefixed by the alternate launch template.
    pub relay: PathBuf,
    /// PATH override for the managed process.
    pub path_override: String,
    /// Static log file used for level-filtered export.
    pub log_file: PathBuf,
    /// Output file streamed to observers.
    pub tail_file: PathBuf,
    /// Package upgraded by the self-update command.
    pub package: String,
}

impl TargetConfig {
    /// Create a target rooted at `workdir` with default templates and files.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        Self {
            log_file: workdir.join("heroku.log"),
            tail_file: workdir.join("userbot_output.log"),
            workdir,
            python: PathBuf::from("python3"),
            module: DEFAULT_MODULE.to_string(),
            launch_flag: DEFAULT_LAUNCH_FLAG.to_string(),
            interpreter_marker: DEFAULT_INTERPRETER_MARKER.to_string(),
            relay: PathBuf::from(DEFAULT_RELAY),
            path_override: DEFAULT_PATH_OVERRIDE.to_string(),
            package: DEFAULT_PACKAGE.to_string(),
        }
    }

    /// Set the interpreter. Its directory is appended to the PATH override.
    #[must_use]
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        if let Some(bin_dir) = self.python.parent().filter(|p| !p.as_os_str().is_empty()) {
            let bin_dir = bin_dir.display().to_string();
            if !self.path_override.split(':').any(|entry| entry == bin_dir) {
                self.path_override = format!("{}:{bin_dir}", self.path_override);
            }
        }
        self
    }

    /// Set the module run by the interpreter.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Set the launch flag.
    #[must_use]
    pub fn with_launch_flag(mut self, flag: impl Into<String>) -> Self {
        self.launch_flag = flag.into();
        self
    }

    /// Set the proxy relay binary.
    #[must_use]
    pub fn with_relay(mut self, relay: impl Into<PathBuf>) -> Self {
        self.relay = relay.into();
        self
    }

    /// Replace the PATH override.
    #[must_use]
    pub fn with_path_override(mut self, path: impl Into<String>) -> Self {
        self.path_override = path.into();
        self
    }

    /// Set the static log file.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    /// Set the streamed output file.
    #[must_use]
    pub fn with_tail_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tail_file = path.into();
        self
    }

    /// Set the package upgraded by self-update.
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Direct launch template.
    pub fn primary_command(&self) -> String {
        format!(
            "{} -m {} {}",
            self.python.display(),
            self.module,
            self.launch_flag
        )
    }

    /// Launch template routed through the proxy relay.
    pub fn alternate_command(&self) -> String {
        format!("{} {}", self.relay.display(), self.primary_command())
    }

    /// The three substrings a managed-process command line must contain.
    pub fn markers(&self) -> Vec<String> {
        vec![
            self.interpreter_marker.clone(),
            self.module.clone(),
            self.launch_flag.clone(),
        ]
    }

    /// Build the launch spec for one of the two templates.
    pub fn launch_spec(&self, alternate_route: bool) -> LaunchSpec {
        let command = if alternate_route {
            self.alternate_command()
        } else {
            self.primary_command()
        };
        LaunchSpec::new(command, &self.workdir)
            .with_env("GIT_PYTHON_REFRESH", "quiet")
            .with_env("PATH", &self.path_override)
            .with_output(&self.tail_file)
    }

    /// Whether the relay binary exists.
    pub fn relay_available(&self) -> bool {
        self.relay.exists()
    }

    /// Working directory as a path.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_differ_only_by_relay_prefix() {
        let target = TargetConfig::new("/srv/bot")
            .with_python("/srv/venv/bin/python")
            .with_relay("/usr/bin/proxychains");
        assert_eq!(
            target.primary_command(),
            "/srv/venv/bin/python -m heroku --no-web"
        );
        assert_eq!(
            target.alternate_command(),
            "/usr/bin/proxychains /srv/venv/bin/python -m heroku --no-web"
        );
    }

    #[test]
    fn test_python_dir_appended_to_path_once() {
        let target = TargetConfig::new("/srv/bot")
            .with_python("/srv/venv/bin/python")
            .with_python("/srv/venv/bin/python3");
        assert_eq!(
            target.path_override,
            "/usr/bin:/bin:/usr/local/bin:/srv/venv/bin"
        );
    }

    #[test]
    fn test_default_files_live_in_workdir() {
        let target = TargetConfig::new("/srv/bot");
        assert_eq!(target.log_file, PathBuf::from("/srv/bot/heroku.log"));
        assert_eq!(target.tail_file, PathBuf::from("/srv/bot/userbot_output.log"));
    }

    #[test]
    fn test_launch_spec_carries_env_and_workdir() {
        let target = TargetConfig::new("/srv/bot");
        let spec = target.launch_spec(true);
        assert!(spec.command.starts_with("/usr/bin/proxychains "));
        assert_eq!(spec.workdir, PathBuf::from("/srv/bot"));
        assert!(spec.env.iter().any(|(k, v)| k == "PATH" && v == DEFAULT_PATH_OVERRIDE));
        assert!(spec.env.iter().any(|(k, _)| k == "GIT_PYTHON_REFRESH"));
        assert_eq!(spec.output, Some(PathBuf::from("/srv/bot/userbot_output.log")));
    }

    #[test]
    fn test_markers() {
        let target = TargetConfig::new("/srv/bot");
        assert_eq!(target.markers(), vec!["python", "heroku", "--no-web"]);
    }
}
