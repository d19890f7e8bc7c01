use std::path::{Path, PathBuf};

use accurev_process::{Invocation, ProcessError, ToolRunner};
use tracing::debug;

use crate::config::Config;
use crate::error::{AccuRevError, Result};
use crate::xml::Document;

/// An accurev executable plus the credentials used to log in before each
/// operation.
#[derive(Debug, Clone)]
pub struct AccuRev {
    runner: ToolRunner,
    username: String,
    password: String,
    scratch_dir: PathBuf,
}

impl AccuRev {
    pub fn new(config: &Config) -> Self {
        Self {
            runner: ToolRunner::new(&config.executable).with_timeout(config.timeout()),
            username: config.username.clone(),
            password: config.password.clone(),
            scratch_dir: config.scratch_dir(),
        }
    }

    pub fn runner(&self) -> &ToolRunner {
        &self.runner
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Parent of the temporary files created around accurev calls.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn is_available(&self) -> bool {
        self.runner.is_available()
    }

    /// `accurev login <user> <password>`. Idempotent on the accurev side, so
    /// it is simply repeated before every operation.
    pub async fn login(&self) -> Result<()> {
        let invocation = Invocation::new("login")
            .arg(&self.username)
            .secret_arg(&self.password);
        match self.runner.run(&invocation).await {
            Ok(_) => {
                debug!(user = %self.username, "accurev login ok");
                Ok(())
            }
            Err(ProcessError::ExternalTool { output, .. }) => {
                Err(AccuRevError::AuthenticationFailed {
                    user: self.username.clone(),
                    output,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn run(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        Ok(self.runner.run(invocation).await?)
    }

    /// Run `invocation` and parse what it prints.
    pub async fn run_xml(&self, invocation: &Invocation) -> Result<Document> {
        let output = self.run(invocation).await?;
        Document::parse(&output)
    }
}
