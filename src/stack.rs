//! Stack inspection: frames, depth, arguments, variables.

use crate::command::MiCommand;
use crate::error::{MiError, Result};
use crate::models::{FrameArguments, StackFrame, Variable};
use crate::session::MiSession;
use crate::value::{lookup, Value};

/// How much value detail list commands should fetch, mirroring the
/// protocol's 0/1/2 selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintValues {
    NoValues,
    AllValues,
    SimpleValues,
}

impl PrintValues {
    fn code(self) -> &'static str {
        match self {
            PrintValues::NoValues => "0",
            PrintValues::AllValues => "1",
            PrintValues::SimpleValues => "2",
        }
    }
}

impl MiSession {
    pub async fn stack_info_frame(&self) -> Result<StackFrame> {
        let outcome = self.execute(MiCommand::new("stack-info-frame")).await?;
        let fields = outcome.fields()?;
        match lookup(&fields, "frame") {
            Some(frame) => Ok(StackFrame::from_value(frame)),
            None => Err(MiError::MissingPayload("frame")),
        }
    }

    pub async fn stack_info_depth(&self, max_depth: Option<u32>) -> Result<u32> {
        let mut command = MiCommand::new("stack-info-depth");
        if let Some(max_depth) = max_depth {
            command = command.param(max_depth.to_string());
        }
        let outcome = self.execute(command).await?;
        let fields = outcome.fields()?;
        lookup(&fields, "depth")
            .and_then(Value::as_str)
            .and_then(|depth| depth.parse().ok())
            .ok_or(MiError::MissingPayload("depth"))
    }

    pub async fn stack_list_frames(
        &self,
        low_frame: Option<u32>,
        high_frame: Option<u32>,
    ) -> Result<Vec<StackFrame>> {
        let mut command = MiCommand::new("stack-list-frames");
        if let (Some(low), Some(high)) = (low_frame, high_frame) {
            command = command.param(low.to_string()).param(high.to_string());
        }
        let outcome = self.execute(command).await?;
        let fields = outcome.fields()?;
        let stack = lookup(&fields, "stack").ok_or(MiError::MissingPayload("stack"))?;
        Ok(stack.items().iter().map(frame_entry).collect())
    }

    pub async fn stack_list_arguments(
        &self,
        values: PrintValues,
        low_frame: Option<u32>,
        high_frame: Option<u32>,
    ) -> Result<Vec<FrameArguments>> {
        let mut command = MiCommand::new("stack-list-arguments").param(values.code());
        if let (Some(low), Some(high)) = (low_frame, high_frame) {
            command = command.param(low.to_string()).param(high.to_string());
        }
        let outcome = self.execute(command).await?;
        let fields = outcome.fields()?;
        let stack_args =
            lookup(&fields, "stack-args").ok_or(MiError::MissingPayload("stack-args"))?;
        Ok(stack_args
            .items()
            .iter()
            .map(|entry| match entry.get("frame") {
                Some(frame) => FrameArguments::from_value(frame),
                None => FrameArguments::from_value(entry),
            })
            .collect())
    }

    pub async fn stack_list_variables(&self, values: PrintValues) -> Result<Vec<Variable>> {
        let outcome = self
            .execute(MiCommand::new("stack-list-variables").param(values.code()))
            .await?;
        let fields = outcome.fields()?;
        let variables =
            lookup(&fields, "variables").ok_or(MiError::MissingPayload("variables"))?;
        Ok(variables.items().iter().map(Variable::from_value).collect())
    }
}

/// Frames arrive as `frame={...}` pairs; tolerate bare tuples too.
fn frame_entry(entry: &Value) -> StackFrame {
    match entry.get("frame") {
        Some(frame) => StackFrame::from_value(frame),
        None => StackFrame::from_value(entry),
    }
}
