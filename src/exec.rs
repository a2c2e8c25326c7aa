//! Execution control: run, step, continue, interrupt, exit.

use crate::command::{mi_quote, MiCommand};
use crate::error::{MiError, Result};
use crate::record::Outcome;
use crate::session::MiSession;
use crate::value::{lookup, Value};

fn reversible(operation: &str, reverse: bool) -> MiCommand {
    MiCommand::new(operation).opt_when(reverse, "--reverse")
}

impl MiSession {
    pub async fn exec_run(&self, all: bool, thread_group: Option<u32>) -> Result<Outcome> {
        self.execute(
            MiCommand::new("exec-run")
                .opt_when(all, "--all")
                .opt_int("--thread-group", thread_group.map(i64::from)),
        )
        .await
    }

    pub async fn exec_continue(&self, reverse: bool) -> Result<Outcome> {
        self.execute(reversible("exec-continue", reverse)).await
    }

    pub async fn exec_next(&self, reverse: bool) -> Result<Outcome> {
        self.execute(reversible("exec-next", reverse)).await
    }

    pub async fn exec_next_instruction(&self, reverse: bool) -> Result<Outcome> {
        self.execute(reversible("exec-next-instruction", reverse))
            .await
    }

    pub async fn exec_step(&self, reverse: bool) -> Result<Outcome> {
        self.execute(reversible("exec-step", reverse)).await
    }

    pub async fn exec_step_instruction(&self, reverse: bool) -> Result<Outcome> {
        self.execute(reversible("exec-step-instruction", reverse))
            .await
    }

    pub async fn exec_finish(&self, reverse: bool) -> Result<Outcome> {
        self.execute(reversible("exec-finish", reverse)).await
    }

    pub async fn exec_interrupt(&self, all: bool) -> Result<Outcome> {
        self.execute(MiCommand::new("exec-interrupt").opt_when(all, "--all"))
            .await
    }

    /// Set the argument vector the inferior starts with.
    pub async fn exec_arguments(&self, arguments: &[String]) -> Result<Outcome> {
        let mut command = MiCommand::new("exec-arguments");
        for argument in arguments {
            command = command.param(argument);
        }
        self.execute(command).await
    }

    pub async fn gdb_exit(&self) -> Result<Outcome> {
        self.execute(MiCommand::new("gdb-exit")).await
    }

    /// Evaluate an expression in the current frame; the expression is
    /// quoted for the wire.
    pub async fn data_evaluate_expression(&self, expression: &str) -> Result<String> {
        let outcome = self
            .execute(MiCommand::new("data-evaluate-expression").param(mi_quote(expression)))
            .await?;
        let fields = outcome.fields()?;
        match lookup(&fields, "value").and_then(Value::as_str) {
            Some(value) => Ok(value.to_string()),
            None => Err(MiError::MissingPayload("value")),
        }
    }

    /// The feature names gdb advertises for this MI session.
    pub async fn list_features(&self) -> Result<Vec<String>> {
        let outcome = self.execute(MiCommand::new("list-features")).await?;
        let fields = outcome.fields()?;
        match lookup(&fields, "features") {
            Some(features) => Ok(features
                .items()
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()),
            None => Err(MiError::MissingPayload("features")),
        }
    }
}
