//! Domain records projected out of MI value trees. Missing keys fall
//! back to empty strings, zero, or false so partial debugger output
//! still yields usable records.

use crate::error::{MiError, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointType {
    Breakpoint,
    HwBreakpoint,
    Watchpoint,
    HwWatchpoint,
    ReadWatchpoint,
    AccWatchpoint,
    Catchpoint,
    Tracepoint,
    FastTracepoint,
    StaticTracepoint,
    Dprintf,
}

impl BreakpointType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "breakpoint" => Some(BreakpointType::Breakpoint),
            "hw breakpoint" => Some(BreakpointType::HwBreakpoint),
            "watchpoint" => Some(BreakpointType::Watchpoint),
            "hw watchpoint" => Some(BreakpointType::HwWatchpoint),
            "read watchpoint" => Some(BreakpointType::ReadWatchpoint),
            "acc watchpoint" => Some(BreakpointType::AccWatchpoint),
            "catchpoint" => Some(BreakpointType::Catchpoint),
            "tracepoint" => Some(BreakpointType::Tracepoint),
            "fast tracepoint" => Some(BreakpointType::FastTracepoint),
            "static tracepoint" => Some(BreakpointType::StaticTracepoint),
            "dprintf" => Some(BreakpointType::Dprintf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointDisposition {
    Keep,
    Delete,
}

impl BreakpointDisposition {
    /// `del` marks temporaries; anything else gdb emits means keep.
    fn from_name(name: &str) -> Self {
        match name {
            "del" | "delete" => BreakpointDisposition::Delete,
            _ => BreakpointDisposition::Keep,
        }
    }
}

/// One breakpoint as reported in a `bkpt={...}` tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// Breakpoint numbers stay strings; sub-breakpoints look like "1.2".
    pub number: String,
    pub kind: BreakpointType,
    pub disposition: BreakpointDisposition,
    pub enabled: bool,
    pub address: String,
    pub function: String,
    pub file: String,
    pub fullname: String,
    pub line: u32,
    pub at: String,
    pub pending: String,
    pub thread: String,
    pub thread_groups: Vec<String>,
    pub condition: String,
    pub ignore: u32,
    pub enable_count: u32,
    pub mask: String,
    pub pass_count: u32,
    pub original_location: String,
    pub times: u32,
    pub installed: bool,
}

impl Breakpoint {
    pub fn from_value(value: &Value) -> Result<Self> {
        let kind_name = value.string_field("type", "breakpoint");
        let kind = BreakpointType::from_name(&kind_name)
            .ok_or(MiError::UnknownBreakpointType(kind_name))?;
        Ok(Breakpoint {
            number: value.string_field("number", ""),
            kind,
            disposition: BreakpointDisposition::from_name(&value.string_field("disp", "keep")),
            enabled: value.flag_field("enabled"),
            address: value.string_field("addr", ""),
            function: value.string_field("func", ""),
            file: value.string_field("file", ""),
            fullname: value.string_field("fullname", ""),
            line: value.u32_field("line"),
            at: value.string_field("at", ""),
            pending: value.string_field("pending", ""),
            thread: value.string_field("thread", ""),
            thread_groups: value.string_list_field("thread-groups"),
            condition: value.string_field("cond", ""),
            ignore: value.u32_field("ignore"),
            enable_count: value.u32_field("enable"),
            mask: value.string_field("mask", ""),
            pass_count: value.u32_field("pass"),
            original_location: value.string_field("original-location", ""),
            times: value.u32_field("times"),
            installed: value.flag_field("installed"),
        })
    }
}

/// One frame as reported in `frame={...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub level: u32,
    pub address: String,
    pub function: String,
    pub file: String,
    pub fullname: String,
    pub from: String,
    pub line: u32,
}

impl StackFrame {
    pub fn from_value(value: &Value) -> Self {
        StackFrame {
            level: value.u32_field("level"),
            address: value.string_field("addr", ""),
            function: value.string_field("func", ""),
            file: value.string_field("file", ""),
            fullname: value.string_field("fullname", ""),
            from: value.string_field("from", ""),
            line: value.u32_field("line"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameArgument {
    pub name: String,
    pub type_name: String,
    pub value: String,
}

/// Arguments of one frame, from `stack-args=[frame={level=...,args=[...]},...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameArguments {
    pub level: u32,
    pub arguments: Vec<FrameArgument>,
}

impl FrameArguments {
    pub fn from_value(value: &Value) -> Self {
        let arguments = value
            .get("args")
            .map(Value::items)
            .unwrap_or(&[])
            .iter()
            .map(|arg| FrameArgument {
                name: arg.string_field("name", ""),
                type_name: arg.string_field("type", ""),
                value: arg.string_field("value", ""),
            })
            .collect();
        FrameArguments {
            level: value.u32_field("level"),
            arguments,
        }
    }
}

/// A local or argument from `stack-list-variables`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub type_name: String,
    pub value: String,
    pub is_argument: bool,
}

impl Variable {
    pub fn from_value(value: &Value) -> Self {
        Variable {
            name: value.string_field("name", ""),
            type_name: value.string_field("type", ""),
            value: value.string_field("value", ""),
            is_argument: value.string_field("arg", "") == "1",
        }
    }
}
