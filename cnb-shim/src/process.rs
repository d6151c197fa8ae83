use std::ffi::{OsStr, OsString};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// A description of an external process to run.
///
/// ```
/// use cnb_shim::Invocation;
///
/// let invocation = Invocation::new("/tmp/lifecycle/detector")
///     .flag("-app", "/home/vcap/app")
///     .env("CNB_STACK_ID", "org.cloudfoundry.stacks.cflinuxfs3");
///
/// assert_eq!(invocation.args, ["-app", "/home/vcap/app"]);
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Variables added to the environment inherited from the current process.
    pub env: Vec<(OsString, OsString)>,
}

impl Invocation {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Adds a flag followed by its value, as two separate arguments.
    #[must_use]
    pub fn flag(self, name: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(name).arg(value)
    }

    #[must_use]
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("Could not spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not exit successfully: {status}")]
    UnsuccessfulExit { program: String, status: ExitStatus },
}

/// Runs external processes to completion.
pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ProcessError>;
}

/// Runs processes with the standard streams of the current process, so that their output
/// becomes part of the buildpack output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        let program = invocation.program.to_string_lossy().into_owned();

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(key, value)| (key, value)))
            .status()
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::UnsuccessfulExit { program, status })
        }
    }
}
