//! Drive a GDB-family debugger through its machine interface (MI).
//!
//! The crate spawns `gdb -q -i mi <executable>`, feeds it numbered
//! commands, correlates each result record with its awaiting caller and
//! publishes asynchronous notifications (stop events, thread and
//! breakpoint changes, console/target/log output) on bounded ordered
//! channels. Typed wrappers cover breakpoints, execution control, stack
//! inspection and environment queries.
//!
//! ```no_run
//! use gdbmi::{BreakInsert, MiSessionBuilder};
//!
//! # async fn demo() -> Result<(), gdbmi::MiError> {
//! let mut session = MiSessionBuilder::from_env()
//!     .start("./target/debug/app", &[])
//!     .await?;
//! let mut events = session.take_events().expect("first subscriber");
//!
//! session.break_insert(&BreakInsert::at("main")).await?;
//! session.exec_run(false, None).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod event;
pub mod models;
pub mod record;
pub mod session;
pub mod value;

mod breakpoint;
mod environment;
mod exec;
mod stack;

pub use breakpoint::{BreakInsert, WatchKind};
pub use command::{mi_quote, MiCommand, TokenSequence};
pub use error::MiError;
pub use event::{decode_async, Event, StopReason};
pub use models::{
    Breakpoint, BreakpointDisposition, BreakpointType, FrameArgument, FrameArguments, StackFrame,
    Variable,
};
pub use record::{classify, decode_result, Outcome, Record, ResultClass};
pub use session::{Diagnostic, MiSession, MiSessionBuilder, StreamKind, StreamRecord};
pub use stack::PrintValues;
pub use value::{parse_fields, parse_value, Value};
