//! End-to-end tests for the streaming record reader, driving real child
//! processes that emit the CLI's blank-line framing over stdout.

use std::time::Duration;

use bondlink::{CliCommandBuilder, CliError, StreamingReader};
use serde_json::{json, Value};

fn sh_reader(script: &str) -> StreamingReader {
    // RUST_LOG=bondlink=warn surfaces the reader's skipped-record diagnostics
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    StreamingReader::new(CliCommandBuilder::new("sh").args(["-c", script]).build())
}

async fn run_collect(script: &str) -> Vec<Value> {
    let mut records = Vec::new();
    let mut push = |record: Value| -> anyhow::Result<()> {
        records.push(record);
        Ok(())
    };
    sh_reader(script).run(&mut push).await.unwrap();
    records
}

#[tokio::test]
async fn delivers_records_in_order_then_exits_at_eof() {
    let records = run_collect(r#"printf '{"a":1}\n\n{"b":2}\n\n'"#).await;
    assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
}

#[tokio::test]
async fn ordering_holds_across_many_records() {
    let records = run_collect(
        r#"for i in 0 1 2 3 4 5 6 7 8 9; do printf '{"n":%s}\n\n' "$i"; done"#,
    )
    .await;
    assert_eq!(records.len(), 10);
    for (n, record) in records.iter().enumerate() {
        assert_eq!(record, &json!({"n": n}));
    }
}

#[tokio::test]
async fn survives_arbitrary_chunking_of_the_byte_stream() {
    // records split mid-line and mid-token across separate writes
    let script = r#"
        printf '{"a":'
        sleep 0.1
        printf '1}\n'
        printf '\n{"b"'
        sleep 0.1
        printf ':2}\n\n'
    "#;
    let records = run_collect(script).await;
    assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
}

#[tokio::test]
async fn record_spanning_multiple_lines_is_reassembled() {
    let records = run_collect(r#"printf '{\n"a": 1\n}\n\n'"#).await;
    assert_eq!(records, vec![json!({"a": 1})]);
}

#[tokio::test]
async fn malformed_record_is_skipped_without_ending_the_session() {
    let records = run_collect(r#"printf '{"a":1}\n\n{bad json}\n\n{"c":3}\n\n'"#).await;
    assert_eq!(records, vec![json!({"a": 1}), json!({"c": 3})]);
}

#[tokio::test]
async fn unterminated_final_record_is_flushed_at_eof() {
    let records = run_collect(r#"printf '{"a":1}'"#).await;
    assert_eq!(records, vec![json!({"a": 1})]);
}

#[tokio::test]
async fn unterminated_garbage_at_eof_is_dropped_silently() {
    let records = run_collect(r#"printf '{"a":1}\n\n{"half":'"#).await;
    assert_eq!(records, vec![json!({"a": 1})]);
}

#[tokio::test]
async fn blank_lines_never_produce_spurious_records() {
    let records = run_collect(r#"printf '\n\n\n{"a":1}\n\n\n\n{"b":2}'"#).await;
    assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
}

#[tokio::test]
async fn handler_failure_does_not_end_the_session() {
    let mut seen = Vec::new();
    let mut handler = |record: Value| -> anyhow::Result<()> {
        seen.push(record.clone());
        if record == json!({"a": 1}) {
            anyhow::bail!("handler rejected record");
        }
        Ok(())
    };
    sh_reader(r#"printf '{"a":1}\n\n{"b":2}\n\n{"c":3}\n\n'"#)
        .run(&mut handler)
        .await
        .unwrap();
    assert_eq!(seen, vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})]);
}

#[tokio::test]
async fn launch_failure_surfaces_before_any_delivery() {
    let mut invoked = false;
    let mut handler = |_record: Value| -> anyhow::Result<()> {
        invoked = true;
        Ok(())
    };
    let reader = StreamingReader::new(
        CliCommandBuilder::new("/nonexistent/tool")
            .args(["stats", "0"])
            .build(),
    );
    let err = reader.run(&mut handler).await.unwrap_err();
    assert!(matches!(err, CliError::Launch { .. }));
    assert!(!invoked);
}

#[tokio::test]
async fn nonzero_exit_mid_stream_keeps_delivered_records() {
    let mut records = Vec::new();
    let mut push = |record: Value| -> anyhow::Result<()> {
        records.push(record);
        Ok(())
    };
    sh_reader(r#"printf '{"a":1}\n\n'; exit 3"#)
        .run(&mut push)
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"a": 1})]);
}

#[tokio::test]
async fn cancel_ends_an_unbounded_session() {
    // one record, then the child would run for ten minutes
    let reader = sh_reader(r#"printf '{"tick":1}\n\n'; exec sleep 600"#);
    let cancel = reader.cancel_handle();

    let mut seen = 0u32;
    let mut handler = |_record: Value| -> anyhow::Result<()> {
        seen += 1;
        cancel.cancel();
        Ok(())
    };
    tokio::time::timeout(Duration::from_secs(10), reader.run(&mut handler))
        .await
        .expect("cancelled session must unwind promptly")
        .unwrap();
    assert_eq!(seen, 1);
}
