mod common;

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use common::{read_csv_rows, ScriptedTransport};
use diary_agents::clients::TransportError;
use diary_agents::error::{AppError, LlmError};
use diary_agents::orchestrator::AnnotationPipeline;
use diary_agents::services::{AnnotationClient, AnnotationSink, BatchPromptBuilder};
use diary_agents::workflow::BatchProcessor;

fn pipeline(transport: Arc<ScriptedTransport>, batch_size: usize) -> AnnotationPipeline {
    let processor = BatchProcessor::new(
        AnnotationClient::new(transport),
        BatchPromptBuilder::default(),
    );
    AnnotationPipeline::new(processor, batch_size, Duration::ZERO)
}

fn blank_row(record: &str) -> Vec<String> {
    std::iter::once(record.to_string())
        .chain(std::iter::repeat(String::new()).take(7))
        .collect()
}

#[tokio::test]
async fn test_three_records_in_batches_of_two() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("processed_diary.csv");
    let transport = ScriptedTransport::new(vec![
        Ok("```json\n{\"積極行為\": \"1\"}\n```\n-----\n{}"),
        Ok("{\"情感負向\": \"1\", \"反思\": \"1\"}"),
    ]);
    let records = ["I ran 5km today.", "", "Felt anxious about work."];

    let stats = pipeline(transport.clone(), 2)
        .run(&records, AnnotationSink::create(&output).unwrap(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.batches, 2);
    assert_eq!(stats.written, 3);
    assert_eq!(stats.blank_rows, 1);
    assert!(!stats.cancelled);

    let rows = read_csv_rows(&output);
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows[0],
        vec!["日記", "情感正向", "情感負向", "情感中立", "積極行為", "消極行為", "反思", "目標設置"]
    );
    assert_eq!(rows[1], vec!["I ran 5km today.", "", "", "", "1", "", "", ""]);
    assert_eq!(rows[2], blank_row(""));
    assert_eq!(rows[3], vec!["Felt anxious about work.", "", "1", "", "", "", "1", ""]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].last_content().ends_with("I ran 5km today.\n-----\n"));
    assert!(requests[1].last_content().ends_with("Felt anxious about work."));
}

#[tokio::test]
async fn test_transient_failure_fills_defaults_and_continues() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::ServiceUnavailable("503 overloaded".into())),
        Ok("{\"目標設置\": \"1\"}"),
    ]);
    let records = ["第一篇", "第二篇", "第三篇"];

    let stats = assert_ok!(
        pipeline(transport, 2)
            .run(&records, AnnotationSink::create(&output).unwrap(), &CancellationToken::new())
            .await
    );

    assert_eq!(stats.default_filled, 1);
    assert_eq!(stats.blank_rows, 2);
    let rows = read_csv_rows(&output);
    assert_eq!(rows[1], blank_row("第一篇"));
    assert_eq!(rows[2], blank_row("第二篇"));
    assert_eq!(rows[3][7], "1");
}

#[tokio::test]
async fn test_timeout_is_treated_as_transient() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let transport =
        ScriptedTransport::new(vec![Err(TransportError::Timeout(Duration::from_secs(120)))]);

    let stats = pipeline(transport, 5)
        .run(&["一篇"], AnnotationSink::create(&output).unwrap(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.default_filled, 1);
    assert_eq!(read_csv_rows(&output)[1], blank_row("一篇"));
}

#[tokio::test]
async fn test_rejected_call_aborts_after_persisted_batches() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let transport = ScriptedTransport::new(vec![
        Ok("{\"情感正向\": \"1\"}\n-----\n{\"情感中立\": \"1\"}"),
        Err(TransportError::Rejected("API key not valid".into())),
    ]);
    let records = ["a", "b", "c", "d"];

    let err = assert_err!(
        pipeline(transport, 2)
            .run(&records, AnnotationSink::create(&output).unwrap(), &CancellationToken::new())
            .await
    );
    assert!(matches!(err, AppError::Llm(LlmError::Rejected { .. })));

    // 第一批已经落盘
    let rows = read_csv_rows(&output);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][0], "a");
    assert_eq!(rows[1][1], "1");
    assert_eq!(rows[2][0], "b");
    assert_eq!(rows[2][3], "1");
}

#[tokio::test]
async fn test_fragment_shortfall_is_padded() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let transport = ScriptedTransport::new(vec![Ok("{\"反思\": \"1\"}")]);

    let stats = pipeline(transport, 3)
        .run(&["x", "y", "z"], AnnotationSink::create(&output).unwrap(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.realigned, 1);
    assert_eq!(stats.written, 3);
    let rows = read_csv_rows(&output);
    assert_eq!(rows[1][6], "1");
    assert_eq!(rows[3], blank_row("z"));
}

#[tokio::test]
async fn test_cancelled_run_writes_only_header() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let transport = ScriptedTransport::new(vec![Ok("{}")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = pipeline(transport.clone(), 2)
        .run(&["a", "b"], AnnotationSink::create(&output).unwrap(), &cancel)
        .await
        .unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.written, 0);
    assert!(transport.requests().is_empty());
    assert_eq!(read_csv_rows(&output).len(), 1);
}

#[tokio::test]
async fn test_existing_output_is_replaced() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    std::fs::write(&output, "old,content\n").unwrap();
    let transport = ScriptedTransport::new(vec![Ok("{}")]);

    pipeline(transport, 5)
        .run(&["new"], AnnotationSink::create(&output).unwrap(), &CancellationToken::new())
        .await
        .unwrap();

    let rows = read_csv_rows(&output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][0], "new");
}
