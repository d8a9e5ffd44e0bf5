use chrono::{TimeZone, Utc};
use quotesync_core::{
    export_to_dir, import_file, ImportError, KvRepository, MemoryKvRepository, Namespace,
    QuoteBook,
};

fn book_from(raw: &str) -> QuoteBook<MemoryKvRepository> {
    let repo = MemoryKvRepository::new();
    repo.put(Namespace::Durable, "dqg_quotes_v2", raw).unwrap();
    QuoteBook::load(repo)
}

#[test]
fn exported_file_imports_into_another_book() {
    let dir = tempfile::tempdir().unwrap();
    let source = book_from(
        r#"[{"text":"a","category":"x"},{"text":"b","category":"y"}]"#,
    );
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    let path = export_to_dir(&source, dir.path(), now).unwrap();
    assert_eq!(
        path.file_name().and_then(|name| name.to_str()),
        Some("quotes-2026-01-02-03-04-05.json")
    );

    let mut target = book_from(r#"[{"text":"a","category":"x"}]"#);
    let summary = import_file(&mut target, &path).unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(target.quotes(), source.quotes());
}

#[test]
fn missing_import_file_reports_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = book_from("[]");
    let err = import_file(&mut book, dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ImportError::Io(_)));
    assert!(err.to_string().starts_with("Failed to read file"));
}
