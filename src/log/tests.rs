use super::*;

#[test]
fn mock_records_messages_in_order() {
    let log = Log::mock();
    log.info("test", "first");
    log.warn("test", "second");
    log.error("other", 3);

    let messages = log.get_messages().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].level, LogLevel::Info);
    assert_eq!(messages[0].message, "first");
    assert_eq!(messages[1].level, LogLevel::Warning);
    assert_eq!(messages[2].scope, "other");
    assert_eq!(messages[2].message, "3");
}

#[test]
fn on_error_helpers_pass_results_through() {
    let log = Log::mock();
    let ok: Result<u32, &str> = Ok(42);
    let err: Result<u32, &str> = Err("fail");

    assert_eq!(log.info_on_error("test", ok), Ok(42));
    assert_eq!(log.warn_on_error("test", err), Err("fail"));
    assert!(log.error_on_error("test", Err::<(), _>("boom")).is_err());

    let messages = log.get_messages().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].level, LogLevel::Warning);
    assert_eq!(messages[1].level, LogLevel::Error);
}

#[tokio::test]
async fn actual_logger_writes_latest_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = crate::ArcPath::from(dir.path());
    let fs = Fs::spawn();

    let log = Log::spawn(fs.clone(), LogLevel::Error, 0, log_dir.clone())
        .await
        .unwrap();
    log.info("test", "hello from the logger");
    // `info` hands the line to a detached task
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    log.collect_garbage().await;
    log.flush().await.unwrap();

    let latest = fs
        .read_to_string(crate::ArcPath::from(dir.path().join("latest.log").as_path()))
        .await
        .unwrap();
    assert!(latest.contains("[INFO] [test] hello from the logger"));

    let files = fs.read_dir(log_dir).await.unwrap();
    assert!(files.iter().any(|p| {
        p.file_name()
            .is_some_and(|f| f.to_string_lossy().starts_with("framefeed_"))
    }));
}
