//! End-to-end checks of the protocol layers through the public surface:
//! real MI transcripts in, typed records out.

use anyhow::Result;
use gdbmi::{
    classify, decode_async, decode_result, parse_value, Breakpoint, BreakpointDisposition,
    BreakpointType, Event, Record, ResultClass, StopReason, Value,
};

fn result_parts(line: &str) -> (Option<u64>, String, String) {
    match classify(line) {
        Record::Result { token, class, rest } => (token, class, rest),
        other => panic!("expected a result record, got {other:?}"),
    }
}

#[test]
fn break_insert_transcript_projects_a_breakpoint() -> Result<()> {
    let line = r#"7^done,bkpt={number="1",type="breakpoint",disp="keep",enabled="y",addr="0x4214a0",func="main",file="a.s",fullname="/a.s",line="14",thread-groups=["i1"],times="1",original-location="main"}"#;
    let (token, class, rest) = result_parts(line);
    assert_eq!(token, Some(7));

    let outcome = decode_result(&class, &rest)?;
    assert_eq!(outcome.class, ResultClass::Done);

    let fields = outcome.fields()?;
    let (key, bkpt) = &fields[0];
    assert_eq!(key, "bkpt");
    let breakpoint = Breakpoint::from_value(bkpt)?;
    assert_eq!(breakpoint.number, "1");
    assert_eq!(breakpoint.kind, BreakpointType::Breakpoint);
    assert_eq!(breakpoint.disposition, BreakpointDisposition::Keep);
    assert!(breakpoint.enabled);
    assert_eq!(breakpoint.line, 14);
    assert_eq!(breakpoint.times, 1);
    assert_eq!(breakpoint.original_location, "main");
    Ok(())
}

#[test]
fn stopped_transcript_becomes_a_typed_event() -> Result<()> {
    let line = r#"*stopped,reason="breakpoint-hit",disp="keep",bkptno="1",frame={addr="0x400d10",func="main.sub",file="m.go",line="14"},thread-id="1",stopped-threads="all",core="0""#;
    let Record::ExecAsync { class, rest, .. } = classify(line) else {
        panic!("expected an exec-async record");
    };
    assert_eq!(
        decode_async(&class, &rest)?,
        Event::Stopped {
            reason: Some(StopReason::BreakpointHit),
            thread_id: "1".into(),
            stopped_threads: "all".into(),
            core: "0".into(),
        }
    );
    Ok(())
}

#[test]
fn thread_group_started_transcript() -> Result<()> {
    let Record::NotifyAsync { class, rest, .. } =
        classify(r#"=thread-group-started,id="i1",pid="4242""#)
    else {
        panic!("expected a notify-async record");
    };
    assert_eq!(
        decode_async(&class, &rest)?,
        Event::ThreadGroupStarted {
            id: "i1".into(),
            pid: 4242,
        }
    );
    Ok(())
}

#[test]
fn console_stream_payload_is_unescaped() {
    assert_eq!(
        classify(r#"~"hello\n""#),
        Record::ConsoleStream("hello\n".into())
    );
}

#[test]
fn error_transcript_carries_the_message() -> Result<()> {
    let (_, class, rest) = result_parts(r#"^error,msg="No symbol \"x\" in current context.""#);
    let outcome = decode_result(&class, &rest)?;
    assert_eq!(outcome.class, ResultClass::Error);
    assert_eq!(outcome.error_message(), r#"No symbol "x" in current context."#);
    Ok(())
}

#[test]
fn deep_nesting_survives_a_reserialisation_cycle() -> Result<()> {
    let input = r#"{threads=[{id="1",frame={level="0",args=[{name="argc",value="1"}]}},{id="2",frame={level="0",args=[]}}],current-thread-id="1"}"#;
    let first = parse_value(input)?;
    let second = parse_value(&first.to_string())?;
    assert_eq!(first, second);

    let threads = first.get("threads").expect("threads field");
    assert!(matches!(threads, Value::List(items) if items.len() == 2));
    Ok(())
}
