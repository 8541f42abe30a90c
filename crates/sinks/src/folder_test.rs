use super::*;
use flate2::read::GzDecoder;
use std::io::Read;
use tempfile::TempDir;

fn batch(n: usize) -> Vec<CanonicalLog> {
    (0..n)
        .map(|i| CanonicalLog::new(1_700_000_000 + i as u64, &format!("record {i}"), "S1"))
        .collect()
}

fn list_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn writes_one_file_per_batch() {
    let dir = TempDir::new().expect("tempdir");
    let sink = FolderSink::new(dir.path().to_path_buf(), Compression::None, "S1");

    sink.deliver(&batch(3)).await.expect("deliver");
    sink.deliver(&batch(2)).await.expect("deliver");

    let files = list_files(dir.path());
    assert_eq!(files.len(), 2);
    for name in &files {
        assert!(name.starts_with("S1_"), "bad name: {name}");
        assert!(name.ends_with(".json"), "bad name: {name}");
        assert!(!name.ends_with(".tmp"), "tmp file left behind: {name}");
    }
}

#[tokio::test]
async fn output_reparses_in_order() {
    let dir = TempDir::new().expect("tempdir");
    let sink = FolderSink::new(dir.path().to_path_buf(), Compression::None, "S1");

    let records = batch(5);
    let bytes = sink.deliver(&records).await.expect("deliver");
    assert!(bytes > 0);

    let name = &list_files(dir.path())[0];
    let content = std::fs::read_to_string(dir.path().join(name)).unwrap();

    let parsed: Vec<CanonicalLog> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid canonical log"))
        .collect();
    assert_eq!(parsed, records);
}

#[tokio::test]
async fn gzip_decompresses_to_identical_content() {
    let dir = TempDir::new().expect("tempdir");
    let records = batch(4);

    let plain = FolderSink::new(dir.path().join("plain"), Compression::None, "S1");
    let gzipped = FolderSink::new(
        dir.path().join("gz"),
        Compression::Gzip { level: 6 },
        "S1",
    );

    plain.deliver(&records).await.expect("deliver plain");
    gzipped.deliver(&records).await.expect("deliver gz");

    let plain_name = &list_files(&dir.path().join("plain"))[0];
    let plain_bytes = std::fs::read(dir.path().join("plain").join(plain_name)).unwrap();

    let gz_name = &list_files(&dir.path().join("gz"))[0];
    assert!(gz_name.ends_with(".json.gz"), "bad name: {gz_name}");
    let gz_bytes = std::fs::read(dir.path().join("gz").join(gz_name)).unwrap();

    let mut decompressed = Vec::new();
    GzDecoder::new(gz_bytes.as_slice())
        .read_to_end(&mut decompressed)
        .expect("valid gzip container");

    assert_eq!(decompressed, plain_bytes);
}

#[tokio::test]
async fn creates_missing_directory() {
    let dir = TempDir::new().expect("tempdir");
    let nested = dir.path().join("a").join("b");
    let sink = FolderSink::new(nested.clone(), Compression::None, "S1");

    sink.deliver(&batch(1)).await.expect("deliver");
    assert_eq!(list_files(&nested).len(), 1);
}

#[tokio::test]
async fn empty_batch_writes_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let sink = FolderSink::new(dir.path().to_path_buf(), Compression::None, "S1");

    let bytes = sink.deliver(&[]).await.expect("deliver");
    assert_eq!(bytes, 0);
    assert!(list_files(dir.path()).is_empty());
}

#[tokio::test]
async fn sequence_numbers_increase() {
    let dir = TempDir::new().expect("tempdir");
    let sink = FolderSink::new(dir.path().to_path_buf(), Compression::None, "S1");

    for _ in 0..3 {
        sink.deliver(&batch(1)).await.expect("deliver");
    }

    let mut sequences: Vec<u64> = list_files(dir.path())
        .iter()
        .map(|name| {
            // S1_<millis>_<seq>.json
            name.trim_end_matches(".json")
                .rsplit('_')
                .next()
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, vec![0, 1, 2]);
}
