//! Staging and running generated scripts
//!
//! A script is written to a local file, copied to the host with `scp` and run
//! there with `ssh`, using the system OpenSSH client and the same private key
//! as the session.

use crate::state::ShellState;
use crate::target::SshTarget;
use sshelper_error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Where scripts are staged, locally and on the host
pub const DEFAULT_SCRIPT_PATH: &str = "/tmp/remote_script.sh";

const SHELLS: &[&str] = &["sh", "bash", "zsh", "dash", "ksh"];

/// The program a script's shebang asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpreter {
    Shell(String),
    Other(String),
}

impl Interpreter {
    /// Read the shebang on the first line; no shebang means bash
    pub fn detect(lines: &[String]) -> Self {
        let Some(shebang) = lines
            .first()
            .and_then(|line| line.trim_start().strip_prefix("#!"))
        else {
            return Interpreter::Shell("bash".into());
        };

        let mut words = shebang.split_whitespace();
        let mut program = words.next().unwrap_or("bash");
        if program.rsplit('/').next() == Some("env") {
            program = words.find(|w| !w.starts_with('-')).unwrap_or("bash");
        }
        let name = program.rsplit('/').next().unwrap_or(program).to_string();

        if SHELLS.contains(&name.as_str()) {
            Interpreter::Shell(name)
        } else {
            Interpreter::Other(name)
        }
    }

    pub fn program(&self) -> &str {
        match self {
            Interpreter::Shell(name) | Interpreter::Other(name) => name,
        }
    }

    pub fn is_shell(&self) -> bool {
        matches!(self, Interpreter::Shell(_))
    }
}

/// A script written locally and ready to be copied and run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedScript {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub interpreter: Interpreter,
    /// Command line run on the host
    pub launch: String,
}

/// Render `lines` against `state`, write them to `local_path` (mode 0755)
/// and work out how the host should launch them.
pub fn stage_script(
    lines: &[String],
    state: &ShellState,
    local_path: &Path,
    remote_path: &str,
) -> Result<StagedScript> {
    let interpreter = Interpreter::detect(lines);
    let content = state.render(lines);

    std::fs::write(local_path, content)
        .map_err(|e| Error::from(e).with_operation("script::stage").with_context("path", local_path.display().to_string()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(local_path, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| Error::from(e).with_operation("script::stage"))?;
    }

    let launch = match &interpreter {
        Interpreter::Shell(shell) => format!("{} {}", shell, shell_quote(remote_path)),
        Interpreter::Other(program) => {
            let env = state.env_assignments();
            let env = if env.is_empty() { env } else { format!("{} ", env) };
            format!(
                "cd {} && {}{} {}",
                shell_quote(state.cwd()),
                env,
                program,
                shell_quote(remote_path)
            )
        }
    };
    debug!(path = %local_path.display(), %launch, "staged script");

    Ok(StagedScript {
        local_path: local_path.to_path_buf(),
        remote_path: remote_path.to_string(),
        interpreter,
        launch,
    })
}

/// Runs a staged script somewhere and returns what it printed
#[allow(async_fn_in_trait)]
pub trait ScriptExecutor {
    async fn execute(&self, script: &StagedScript) -> Result<String>;
}

/// Copies with `scp`, runs with `ssh`
#[derive(Debug, Clone)]
pub struct OpenSshExecutor {
    target: SshTarget,
    scp_program: String,
    ssh_program: String,
}

impl OpenSshExecutor {
    pub fn new(target: SshTarget) -> Self {
        Self {
            target,
            scp_program: "scp".into(),
            ssh_program: "ssh".into(),
        }
    }

    /// Use different binaries in place of `scp` and `ssh`
    pub fn with_programs(mut self, scp: impl Into<String>, ssh: impl Into<String>) -> Self {
        self.scp_program = scp.into();
        self.ssh_program = ssh.into();
        self
    }

    pub fn scp_args(&self, script: &StagedScript) -> Vec<String> {
        vec![
            "-i".into(),
            self.target.key_path.display().to_string(),
            "-P".into(),
            self.target.port.to_string(),
            "-o".into(),
            "BatchMode=yes".into(),
            script.local_path.display().to_string(),
            format!("{}:{}", self.target.destination(), script.remote_path),
        ]
    }

    pub fn ssh_args(&self, script: &StagedScript) -> Vec<String> {
        vec![
            "-i".into(),
            self.target.key_path.display().to_string(),
            "-p".into(),
            self.target.port.to_string(),
            "-o".into(),
            "BatchMode=yes".into(),
            self.target.destination(),
            script.launch.clone(),
        ]
    }

    async fn run(&self, step: &'static str, program: &str, args: &[String]) -> Result<String> {
        debug!(step, program, ?args, "spawning");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                Error::script_failed(step, format!("cannot run {}: {}", program, e))
                    .with_operation("script::execute")
                    .set_source(e)
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::script_failed(
                step,
                format!("{} ({}), output: {}", step, output.status, combined.trim_end()),
            )
            .with_operation("script::execute"));
        }
        Ok(combined)
    }
}

impl ScriptExecutor for OpenSshExecutor {
    async fn execute(&self, script: &StagedScript) -> Result<String> {
        self.run("scp", &self.scp_program, &self.scp_args(script)).await?;
        let output = self.run("ssh", &self.ssh_program, &self.ssh_args(script)).await?;
        info!(remote = %self.target, path = %script.remote_path, "script executed");
        Ok(output)
    }
}

/// Single-quote `value` for a POSIX shell
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sshelper_error::ErrorKind;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    fn target() -> SshTarget {
        SshTarget::new("10.0.0.7", 2200, "ubuntu", "/keys/id_rsa")
    }

    #[test]
    fn test_detect_interpreter() {
        assert_eq!(Interpreter::detect(&lines("ls")), Interpreter::Shell("bash".into()));
        assert_eq!(Interpreter::detect(&lines("#!/bin/sh\nls")), Interpreter::Shell("sh".into()));
        assert_eq!(
            Interpreter::detect(&lines("#!/usr/bin/env bash")),
            Interpreter::Shell("bash".into())
        );
        assert_eq!(
            Interpreter::detect(&lines("#!/usr/bin/env -S python3 -u")),
            Interpreter::Other("python3".into())
        );
        assert_eq!(Interpreter::detect(&[]), Interpreter::Shell("bash".into()));
        assert!(!Interpreter::detect(&lines("#!/usr/bin/python3")).is_shell());
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/tmp/remote_script.sh"), "'/tmp/remote_script.sh'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_stage_shell_script() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("remote_script.sh");
        let state = ShellState::new("/home/ubuntu");

        let staged = stage_script(&lines("#!/bin/bash\nuptime"), &state, &local, DEFAULT_SCRIPT_PATH).unwrap();

        assert_eq!(staged.launch, "bash '/tmp/remote_script.sh'");
        assert_eq!(
            std::fs::read_to_string(&local).unwrap(),
            "#!/bin/bash\ncd '/home/ubuntu'\nuptime\n"
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&local).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_stage_python_script_launch() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("s.py");
        let mut state = ShellState::new("/home/ubuntu");
        state.apply(&lines("cd /srv\nexport MODE=fast"));

        let staged = stage_script(&lines("#!/usr/bin/env python3\nprint(1)"), &state, &local, "/tmp/s.py").unwrap();
        assert_eq!(staged.launch, "cd '/srv' && MODE=\"fast\" python3 '/tmp/s.py'");
    }

    #[test]
    fn test_stage_into_missing_dir_fails() {
        let state = ShellState::new("/home/ubuntu");
        let err = stage_script(&lines("ls"), &state, Path::new("/nonexistent/dir/x.sh"), "/tmp/x.sh").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.operation(), "script::stage");
    }

    #[test]
    fn test_openssh_args() {
        let executor = OpenSshExecutor::new(target());
        let script = StagedScript {
            local_path: PathBuf::from("/tmp/remote_script.sh"),
            remote_path: "/tmp/remote_script.sh".into(),
            interpreter: Interpreter::Shell("bash".into()),
            launch: "bash '/tmp/remote_script.sh'".into(),
        };

        assert_eq!(
            executor.scp_args(&script),
            vec![
                "-i", "/keys/id_rsa", "-P", "2200", "-o", "BatchMode=yes",
                "/tmp/remote_script.sh", "ubuntu@10.0.0.7:/tmp/remote_script.sh",
            ]
        );
        assert_eq!(
            executor.ssh_args(&script),
            vec![
                "-i", "/keys/id_rsa", "-p", "2200", "-o", "BatchMode=yes",
                "ubuntu@10.0.0.7", "bash '/tmp/remote_script.sh'",
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_returns_ssh_output() {
        let executor = OpenSshExecutor::new(target()).with_programs("true", "echo");
        let script = StagedScript {
            local_path: PathBuf::from("/tmp/x.sh"),
            remote_path: "/tmp/x.sh".into(),
            interpreter: Interpreter::Shell("bash".into()),
            launch: "bash '/tmp/x.sh'".into(),
        };

        let output = executor.execute(&script).await.unwrap();
        assert_eq!(output.trim_end(), "-i /keys/id_rsa -p 2200 -o BatchMode=yes ubuntu@10.0.0.7 bash '/tmp/x.sh'");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_copy_failure_skips_run() {
        let executor = OpenSshExecutor::new(target()).with_programs("false", "echo");
        let script = StagedScript {
            local_path: PathBuf::from("/tmp/x.sh"),
            remote_path: "/tmp/x.sh".into(),
            interpreter: Interpreter::Shell("bash".into()),
            launch: "bash '/tmp/x.sh'".into(),
        };

        let err = executor.execute(&script).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScriptFailed);
        assert_eq!(err.context()[0], ("step", "scp".to_string()));
    }

    #[tokio::test]
    async fn test_execute_missing_program() {
        let executor = OpenSshExecutor::new(target()).with_programs("sshelper-no-such-scp", "ssh");
        let script = StagedScript {
            local_path: PathBuf::from("/tmp/x.sh"),
            remote_path: "/tmp/x.sh".into(),
            interpreter: Interpreter::Shell("bash".into()),
            launch: "bash '/tmp/x.sh'".into(),
        };

        let err = executor.execute(&script).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScriptFailed);
        assert!(err.source_ref().is_some());
    }
}
