use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder printed instead of a secret argument.
pub const REDACTED: &str = "********";

// ─── Invocation ───────────────────────────────────────────────────────────

/// A single `accurev <command> <args…>` call.
///
/// Arguments are kept as a vector and handed to the OS one by one; they are
/// never concatenated into a shell string. The quoted form produced by
/// [`Invocation::display_line`] exists for logs and error messages only.
#[derive(Debug, Clone)]
pub struct Invocation {
    command: String,
    args: Vec<Arg>,
    working_dir: Option<PathBuf>,
}

#[derive(Clone)]
struct Arg {
    value: OsString,
    secret: bool,
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secret {
            f.write_str(REDACTED)
        } else {
            write!(f, "{:?}", self.value)
        }
    }
}

impl Invocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, value: impl AsRef<OsStr>) -> Self {
        self.args.push(Arg {
            value: value.as_ref().to_os_string(),
            secret: false,
        });
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for v in values {
            self = self.arg(v);
        }
        self
    }

    /// Add an argument that must never appear in logs (e.g. a password).
    pub fn secret_arg(mut self, value: impl AsRef<OsStr>) -> Self {
        self.args.push(Arg {
            value: value.as_ref().to_os_string(),
            secret: true,
        });
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Raw argument values (command name excluded), in order.
    pub fn arg_values(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(|a| a.value.as_os_str())
    }

    /// `command "arg1" "arg2" …` with secrets replaced by [`REDACTED`].
    pub fn display_line(&self) -> String {
        let mut line = self.command.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.secret {
                line.push_str(&quote_arg(REDACTED));
            } else {
                line.push_str(&quote_arg(&arg.value.to_string_lossy()));
            }
        }
        line
    }
}

// ─── Quoting ──────────────────────────────────────────────────────────────

/// Quote a single argument the way the accurev client expects on its
/// command line.
///
/// A trailing backslash is doubled so it is not read as an escape of the
/// closing quote (`\.\` becomes `"\.\\"`). Embedded quotes are escaped.
pub fn quote_arg(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 3);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    if arg.ends_with('\\') {
        quoted.push('\\');
    }
    quoted.push('"');
    quoted
}
