//! Breakpoint, watchpoint and catchpoint operations.

use crate::command::{mi_quote, MiCommand};
use crate::error::{MiError, Result};
use crate::models::Breakpoint;
use crate::record::Outcome;
use crate::session::MiSession;
use crate::value::{lookup, Value};

/// Options for `-break-insert`. Start from [`BreakInsert::at`] and set
/// what you need.
#[derive(Debug, Clone, Default)]
pub struct BreakInsert {
    pub location: String,
    pub temporary: bool,
    pub hardware: bool,
    /// Create pending if the location cannot be resolved yet.
    pub allow_pending: bool,
    pub disabled: bool,
    pub tracepoint: bool,
    pub condition: Option<String>,
    pub ignore_count: Option<u32>,
    pub thread: Option<u32>,
}

impl BreakInsert {
    pub fn at(location: impl Into<String>) -> Self {
        BreakInsert {
            location: location.into(),
            ..Default::default()
        }
    }
}

/// What a watchpoint triggers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Write,
    Read,
    Access,
}

impl MiSession {
    pub async fn break_insert(&self, insert: &BreakInsert) -> Result<Breakpoint> {
        let command = MiCommand::new("break-insert")
            .opt_when(insert.temporary, "-t")
            .opt_when(insert.hardware, "-h")
            .opt_when(insert.allow_pending, "-f")
            .opt_when(insert.disabled, "-d")
            .opt_when(insert.tracepoint, "-a")
            .opt_str("-c", insert.condition.as_deref())
            .opt_int("-i", insert.ignore_count.map(i64::from))
            .opt_int("-p", insert.thread.map(i64::from))
            .param(&insert.location);
        let outcome = self.execute(command).await?;
        let fields = outcome.fields()?;
        match lookup(&fields, "bkpt") {
            Some(value) => Breakpoint::from_value(value),
            None => Err(MiError::MissingPayload("bkpt")),
        }
    }

    /// All breakpoints gdb reports, whether wrapped in a table or not.
    pub async fn break_list(&self) -> Result<Vec<Breakpoint>> {
        let outcome = self.execute(MiCommand::new("break-list")).await?;
        collect_breakpoints(&outcome)
    }

    pub async fn break_info(&self, number: &str) -> Result<Option<Breakpoint>> {
        let outcome = self
            .execute(MiCommand::new("break-info").param(number))
            .await?;
        Ok(collect_breakpoints(&outcome)?.into_iter().next())
    }

    pub async fn break_after(&self, number: &str, count: u32) -> Result<Outcome> {
        self.execute(
            MiCommand::new("break-after")
                .param(number)
                .param(count.to_string()),
        )
        .await
    }

    pub async fn break_commands(&self, number: &str, commands: &[String]) -> Result<Outcome> {
        let mut command = MiCommand::new("break-commands").param(number);
        for script_line in commands {
            command = command.param(mi_quote(script_line));
        }
        self.execute(command).await
    }

    pub async fn break_condition(&self, number: &str, condition: &str) -> Result<Outcome> {
        self.execute(
            MiCommand::new("break-condition")
                .param(number)
                .param(condition),
        )
        .await
    }

    pub async fn break_delete(&self, numbers: &[String]) -> Result<Outcome> {
        self.execute(with_numbers(MiCommand::new("break-delete"), numbers))
            .await
    }

    pub async fn break_disable(&self, numbers: &[String]) -> Result<Outcome> {
        self.execute(with_numbers(MiCommand::new("break-disable"), numbers))
            .await
    }

    pub async fn break_enable(&self, numbers: &[String]) -> Result<Outcome> {
        self.execute(with_numbers(MiCommand::new("break-enable"), numbers))
            .await
    }

    pub async fn break_passcount(&self, number: &str, count: u32) -> Result<Outcome> {
        self.execute(
            MiCommand::new("break-passcount")
                .param(number)
                .param(count.to_string()),
        )
        .await
    }

    pub async fn break_watch(&self, expression: &str, kind: WatchKind) -> Result<Outcome> {
        let command = match kind {
            WatchKind::Write => MiCommand::new("break-watch"),
            WatchKind::Read => MiCommand::new("break-watch").opt("-r"),
            WatchKind::Access => MiCommand::new("break-watch").opt("-a"),
        };
        self.execute(command.param(expression)).await
    }

    pub async fn catch_load(
        &self,
        pattern: &str,
        temporary: bool,
        disabled: bool,
    ) -> Result<Outcome> {
        self.execute(
            MiCommand::new("catch-load")
                .opt_when(temporary, "-t")
                .opt_when(disabled, "-d")
                .param(pattern),
        )
        .await
    }

    pub async fn catch_unload(
        &self,
        pattern: &str,
        temporary: bool,
        disabled: bool,
    ) -> Result<Outcome> {
        self.execute(
            MiCommand::new("catch-unload")
                .opt_when(temporary, "-t")
                .opt_when(disabled, "-d")
                .param(pattern),
        )
        .await
    }
}

fn with_numbers(mut command: MiCommand, numbers: &[String]) -> MiCommand {
    for number in numbers {
        command = command.param(number);
    }
    command
}

/// Walk the payload for `bkpt={...}` tuples. `-break-list` nests them in
/// `BreakpointTable={...,body=[...]}`; `-break-info` may not. Zero
/// matches is a valid answer.
fn collect_breakpoints(outcome: &Outcome) -> Result<Vec<Breakpoint>> {
    fn walk(key: &str, value: &Value, found: &mut Vec<Breakpoint>) -> Result<()> {
        if key == "bkpt" {
            found.push(Breakpoint::from_value(value)?);
            return Ok(());
        }
        match value {
            Value::Tuple(fields) => {
                for (inner_key, inner) in fields {
                    walk(inner_key, inner, found)?;
                }
            }
            Value::List(items) => {
                for item in items {
                    if let Value::Tuple(fields) = item {
                        for (inner_key, inner) in fields {
                            walk(inner_key, inner, found)?;
                        }
                    }
                }
            }
            Value::String(_) => {}
        }
        Ok(())
    }

    let mut found = Vec::new();
    for (key, value) in outcome.fields()? {
        walk(&key, &value, &mut found)?;
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BreakpointDisposition, BreakpointType};
    use crate::session::testing::piped;

    const BKPT: &str = r#"bkpt={number="1",type="breakpoint",disp="keep",enabled="y",addr="0x4214a0",func="main",file="a.s",fullname="/a.s",line="14",thread-groups=["i1"],times="1",original-location="main"}"#;

    #[tokio::test]
    async fn test_break_insert_projects_breakpoint() {
        let (session, mut gdb) = piped(8);
        let insert = BreakInsert::at("main");
        let (breakpoint, line) = tokio::join!(
            session.break_insert(&insert),
            async { gdb.respond(&format!("done,{BKPT}")).await }
        );
        assert!(line.ends_with("-break-insert main"));
        let breakpoint = breakpoint.unwrap();
        assert_eq!(breakpoint.number, "1");
        assert_eq!(breakpoint.kind, BreakpointType::Breakpoint);
        assert_eq!(breakpoint.disposition, BreakpointDisposition::Keep);
        assert!(breakpoint.enabled);
        assert_eq!(breakpoint.line, 14);
        assert_eq!(breakpoint.times, 1);
        assert_eq!(breakpoint.original_location, "main");
    }

    #[tokio::test]
    async fn test_break_insert_options_reach_the_wire() {
        let (session, mut gdb) = piped(8);
        let insert = BreakInsert {
            temporary: true,
            condition: Some("x > 3".into()),
            ignore_count: Some(2),
            ..BreakInsert::at("main.go:14")
        };
        let (_, line) = tokio::join!(session.break_insert(&insert), async {
            gdb.respond(&format!("done,{BKPT}")).await
        });
        assert!(line.ends_with("-break-insert -t -c x > 3 -i 2 main.go:14"));
    }

    #[tokio::test]
    async fn test_break_insert_without_payload_is_missing() {
        let (session, mut gdb) = piped(8);
        let insert = BreakInsert::at("main");
        let (result, _) = tokio::join!(
            session.break_insert(&insert),
            async { gdb.respond("done").await }
        );
        assert!(matches!(result, Err(MiError::MissingPayload("bkpt"))));
    }

    #[tokio::test]
    async fn test_break_list_reads_table_body() {
        let (session, mut gdb) = piped(8);
        let body = r#"done,BreakpointTable={nr_rows="2",nr_cols="6",body=[bkpt={number="1",type="breakpoint",disp="keep",enabled="y",line="14"},bkpt={number="2",type="breakpoint",disp="del",enabled="n",line="30"}]}"#;
        let (list, _) = tokio::join!(session.break_list(), async { gdb.respond(body).await });
        let list = list.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].number, "1");
        assert_eq!(list[1].disposition, BreakpointDisposition::Delete);
    }

    #[tokio::test]
    async fn test_break_list_tolerates_empty_table() {
        let (session, mut gdb) = piped(8);
        let (list, _) = tokio::join!(session.break_list(), async {
            gdb.respond(r#"done,BreakpointTable={nr_rows="0",body=[]}"#).await
        });
        assert!(list.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_break_info_returns_first_match_or_none() {
        let (session, mut gdb) = piped(8);
        let (info, _) = tokio::join!(session.break_info("1"), async {
            gdb.respond(&format!("done,{BKPT}")).await
        });
        assert_eq!(info.unwrap().unwrap().number, "1");

        let (missing, _) = tokio::join!(session.break_info("7"), async {
            gdb.respond("done").await
        });
        assert!(missing.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watch_kinds_map_to_flags() {
        let (session, mut gdb) = piped(8);
        let (_, line) = tokio::join!(session.break_watch("x", WatchKind::Access), async {
            gdb.respond("done").await
        });
        assert!(line.ends_with("-break-watch -a x"));

        let (_, line) = tokio::join!(session.break_watch("x", WatchKind::Write), async {
            gdb.respond("done").await
        });
        assert!(line.ends_with("-break-watch x"));
    }

    #[tokio::test]
    async fn test_break_commands_quotes_scripts() {
        let (session, mut gdb) = piped(8);
        let commands = ["continue".to_string(), "print x".to_string()];
        let (_, line) = tokio::join!(
            session.break_commands("1", &commands),
            async { gdb.respond("done").await }
        );
        assert!(line.ends_with("-break-commands 1 \"continue\" \"print x\""));
    }
}
