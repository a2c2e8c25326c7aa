//! Environment queries and mutation on the debugger side.

use crate::command::MiCommand;
use crate::error::{MiError, Result};
use crate::session::MiSession;
use crate::value::{lookup, Value};

impl MiSession {
    /// Change the debugger's working directory.
    pub async fn environment_cd(&self, directory: &str) -> Result<()> {
        self.execute(MiCommand::new("environment-cd").param(directory))
            .await?;
        Ok(())
    }

    /// Adjust the source search path; returns the resulting
    /// `source-path`.
    pub async fn environment_directory(
        &self,
        reset: bool,
        directories: &[String],
    ) -> Result<String> {
        let command = with_directories(
            MiCommand::new("environment-directory").opt_when(reset, "-r"),
            directories,
        );
        self.string_payload(command, "source-path").await
    }

    /// Adjust the object search path; returns the resulting `path`.
    pub async fn environment_path(&self, reset: bool, directories: &[String]) -> Result<String> {
        let command = with_directories(
            MiCommand::new("environment-path").opt_when(reset, "-r"),
            directories,
        );
        self.string_payload(command, "path").await
    }

    /// The debugger's current working directory (`cwd`).
    pub async fn environment_pwd(&self) -> Result<String> {
        self.string_payload(MiCommand::new("environment-pwd"), "cwd")
            .await
    }

    async fn string_payload(&self, command: MiCommand, key: &'static str) -> Result<String> {
        let outcome = self.execute(command).await?;
        let fields = outcome.fields()?;
        lookup(&fields, key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(MiError::MissingPayload(key))
    }
}

fn with_directories(mut command: MiCommand, directories: &[String]) -> MiCommand {
    for directory in directories {
        command = command.param(directory);
    }
    command
}
