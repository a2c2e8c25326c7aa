//! Typed events decoded from async records.

use crate::error::{MiError, Result};
use crate::value::{parse_fields, parse_u64, Value};

/// Why the inferior stopped. Closed set; gdb values outside it fail
/// decoding with `UnknownStopReason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BreakpointHit,
    WatchpointTrigger,
    ReadWatchpointTrigger,
    AccessWatchpointTrigger,
    FunctionFinished,
    LocationReached,
    WatchpointScope,
    EndSteppingRange,
    ExitedSignalled,
    Exited,
    ExitedNormally,
    SignalReceived,
    SolibEvent,
    Fork,
    Vfork,
    SyscallEntry,
    Exec,
}

impl StopReason {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "breakpoint-hit" => Some(StopReason::BreakpointHit),
            "watchpoint-trigger" => Some(StopReason::WatchpointTrigger),
            "read-watchpoint-trigger" => Some(StopReason::ReadWatchpointTrigger),
            "access-watchpoint-trigger" => Some(StopReason::AccessWatchpointTrigger),
            "function-finished" => Some(StopReason::FunctionFinished),
            "location-reached" => Some(StopReason::LocationReached),
            "watchpoint-scope" => Some(StopReason::WatchpointScope),
            "end-stepping-range" => Some(StopReason::EndSteppingRange),
            "exited-signalled" => Some(StopReason::ExitedSignalled),
            "exited" => Some(StopReason::Exited),
            "exited-normally" => Some(StopReason::ExitedNormally),
            "signal-received" => Some(StopReason::SignalReceived),
            "solib-event" => Some(StopReason::SolibEvent),
            "fork" => Some(StopReason::Fork),
            "vfork" => Some(StopReason::Vfork),
            "syscall-entry" => Some(StopReason::SyscallEntry),
            "exec" => Some(StopReason::Exec),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StopReason::BreakpointHit => "breakpoint-hit",
            StopReason::WatchpointTrigger => "watchpoint-trigger",
            StopReason::ReadWatchpointTrigger => "read-watchpoint-trigger",
            StopReason::AccessWatchpointTrigger => "access-watchpoint-trigger",
            StopReason::FunctionFinished => "function-finished",
            StopReason::LocationReached => "location-reached",
            StopReason::WatchpointScope => "watchpoint-scope",
            StopReason::EndSteppingRange => "end-stepping-range",
            StopReason::ExitedSignalled => "exited-signalled",
            StopReason::Exited => "exited",
            StopReason::ExitedNormally => "exited-normally",
            StopReason::SignalReceived => "signal-received",
            StopReason::SolibEvent => "solib-event",
            StopReason::Fork => "fork",
            StopReason::Vfork => "vfork",
            StopReason::SyscallEntry => "syscall-entry",
            StopReason::Exec => "exec",
        }
    }
}

/// One asynchronous notification from the debugger. Classes the decoder
/// does not know land in `Unknown` with their payload intact; an async
/// record is never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Running {
        thread_id: String,
    },
    Stopped {
        reason: Option<StopReason>,
        thread_id: String,
        stopped_threads: String,
        core: String,
    },
    ThreadGroupAdded {
        id: String,
    },
    ThreadGroupRemoved {
        id: String,
    },
    ThreadGroupStarted {
        id: String,
        pid: u32,
    },
    ThreadGroupExited {
        id: String,
        exit_code: i32,
    },
    ThreadCreated {
        id: String,
        group_id: String,
    },
    ThreadExited {
        id: String,
        group_id: String,
    },
    ThreadSelected {
        id: String,
        group_id: String,
    },
    /// Payload left opaque; gdb's shape here is still settling.
    LibraryLoaded {
        raw: String,
    },
    LibraryUnloaded {
        raw: String,
    },
    /// `frame`/`tracepoint` are -1 when replay mode ends (`,end`).
    TraceframeChanged {
        frame: i64,
        tracepoint: i64,
    },
    TsvCreated {
        name: String,
        initial: String,
    },
    TsvDeleted {
        name: String,
    },
    TsvModified {
        name: String,
        initial: String,
        value: String,
    },
    RecordStarted {
        thread_group: String,
    },
    RecordStopped {
        thread_group: String,
    },
    CmdParamChanged {
        param: String,
        value: String,
    },
    MemoryChanged {
        thread_group: String,
        address: u64,
        length: u64,
        code: bool,
    },
    BreakpointCreated {
        number: String,
    },
    BreakpointModified {
        number: String,
    },
    BreakpointDeleted {
        number: String,
    },
    Unknown {
        class: String,
        raw: String,
    },
}

/// Decode one async record. The payload always goes through the value
/// parser; splitting on commas would tear quoted strings and nested
/// structures apart.
pub fn decode_async(class: &str, rest: &str) -> Result<Event> {
    match class {
        "running" => {
            let fields = named(rest)?;
            Ok(Event::Running {
                thread_id: fields.string_field("thread-id", ""),
            })
        }
        "stopped" => {
            let fields = named(rest)?;
            let reason = match fields.get("reason").and_then(Value::as_str) {
                Some(name) => Some(
                    StopReason::from_name(name)
                        .ok_or_else(|| MiError::UnknownStopReason(name.to_string()))?,
                ),
                // gdb omits the reason after e.g. an attach.
                None => None,
            };
            Ok(Event::Stopped {
                reason,
                thread_id: fields.string_field("thread-id", ""),
                stopped_threads: fields.string_field("stopped-threads", ""),
                core: fields.string_field("core", ""),
            })
        }
        "thread-group-added" => Ok(Event::ThreadGroupAdded {
            id: named(rest)?.string_field("id", ""),
        }),
        "thread-group-removed" => Ok(Event::ThreadGroupRemoved {
            id: named(rest)?.string_field("id", ""),
        }),
        "thread-group-started" => {
            let fields = named(rest)?;
            Ok(Event::ThreadGroupStarted {
                id: fields.string_field("id", ""),
                pid: fields.u32_field("pid"),
            })
        }
        "thread-group-exited" => {
            let fields = named(rest)?;
            let exit_code = fields
                .get("exit-code")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            Ok(Event::ThreadGroupExited {
                id: fields.string_field("id", ""),
                exit_code,
            })
        }
        "thread-created" => {
            let fields = named(rest)?;
            Ok(Event::ThreadCreated {
                id: fields.string_field("id", ""),
                group_id: group_id(&fields),
            })
        }
        "thread-exited" => {
            let fields = named(rest)?;
            Ok(Event::ThreadExited {
                id: fields.string_field("id", ""),
                group_id: group_id(&fields),
            })
        }
        "thread-selected" => {
            let fields = named(rest)?;
            Ok(Event::ThreadSelected {
                id: fields.string_field("id", ""),
                group_id: group_id(&fields),
            })
        }
        "library-loaded" => Ok(Event::LibraryLoaded {
            raw: rest.to_string(),
        }),
        "library-unloaded" => Ok(Event::LibraryUnloaded {
            raw: rest.to_string(),
        }),
        "traceframe-changed" => {
            if rest.trim() == "end" {
                return Ok(Event::TraceframeChanged {
                    frame: -1,
                    tracepoint: -1,
                });
            }
            let fields = named(rest)?;
            Ok(Event::TraceframeChanged {
                frame: i64::from(fields.u32_field("num")),
                tracepoint: i64::from(fields.u32_field("tracepoint")),
            })
        }
        "tsv-created" => {
            let fields = named(rest)?;
            Ok(Event::TsvCreated {
                name: fields.string_field("name", ""),
                initial: fields.string_field("initial", ""),
            })
        }
        "tsv-deleted" => Ok(Event::TsvDeleted {
            name: named(rest)?.string_field("name", ""),
        }),
        "tsv-modified" => {
            let fields = named(rest)?;
            Ok(Event::TsvModified {
                name: fields.string_field("name", ""),
                initial: fields.string_field("initial", ""),
                value: fields.string_field("value", ""),
            })
        }
        "record-started" => Ok(Event::RecordStarted {
            thread_group: named(rest)?.string_field("thread-group", ""),
        }),
        "record-stopped" => Ok(Event::RecordStopped {
            thread_group: named(rest)?.string_field("thread-group", ""),
        }),
        "cmd-param-changed" => {
            let fields = named(rest)?;
            Ok(Event::CmdParamChanged {
                param: fields.string_field("param", ""),
                value: fields.string_field("value", ""),
            })
        }
        "memory-changed" => {
            let fields = named(rest)?;
            Ok(Event::MemoryChanged {
                thread_group: fields.string_field("thread-group", ""),
                address: fields
                    .get("addr")
                    .and_then(Value::as_str)
                    .and_then(parse_u64)
                    .unwrap_or(0),
                length: fields
                    .get("len")
                    .and_then(Value::as_str)
                    .and_then(parse_u64)
                    .unwrap_or(0),
                code: fields.get("type").and_then(Value::as_str) == Some("code"),
            })
        }
        "breakpoint-created" => Ok(Event::BreakpointCreated {
            number: breakpoint_number(rest)?,
        }),
        "breakpoint-modified" => Ok(Event::BreakpointModified {
            number: breakpoint_number(rest)?,
        }),
        "breakpoint-deleted" => Ok(Event::BreakpointDeleted {
            number: named(rest)?.string_field("id", ""),
        }),
        _ => Ok(Event::Unknown {
            class: class.to_string(),
            raw: rest.to_string(),
        }),
    }
}

fn named(rest: &str) -> Result<Value> {
    Ok(Value::Tuple(parse_fields(rest)?))
}

/// gdb labels the owning group `group-id`; older emitters used `gid`.
fn group_id(fields: &Value) -> String {
    match fields.get("group-id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => fields.string_field("gid", ""),
    }
}

/// Created/modified notifications wrap the breakpoint in `bkpt={...}`.
fn breakpoint_number(rest: &str) -> Result<String> {
    let fields = named(rest)?;
    Ok(fields
        .get("bkpt")
        .map(|bkpt| bkpt.string_field("number", ""))
        .unwrap_or_default())
}
