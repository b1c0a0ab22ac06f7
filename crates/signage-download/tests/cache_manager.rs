use bytes::Bytes;
use md5::{Digest, Md5};
use signage_blobstore::FsBlobStore;
use signage_download::{CacheManager, CacheManagerConfig};
use signage_model::{FileId, FileSource, RequiredFileDescriptor};
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

async fn manager(base_dir: &std::path::Path, device_memory_bytes: u64) -> CacheManager {
    let store = Arc::new(FsBlobStore::new(base_dir).await.unwrap());
    CacheManager::new(
        store,
        reqwest::Client::new(),
        CacheManagerConfig {
            concurrency_limit: 4,
            device_memory_bytes,
        },
    )
}

// S1: small file round-trip.
#[tokio::test]
async fn small_file_is_stored_whole_and_verified() {
    let server = MockServer::start().await;
    let body = vec![7u8; 41_500];
    let digest = md5_hex(&body);

    Mock::given(method("GET"))
        .and(path("/media/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cm = manager(dir.path(), 4 * 1024 * 1024 * 1024).await;

    let descriptor = RequiredFileDescriptor {
        file_id: FileId::media(1),
        md5: Some(digest),
        size: 41_500,
        source: FileSource::Http {
            url: format!("{}/media/1", server.uri()),
        },
        priority_hint: None,
    };

    cm.fetch(descriptor).await.unwrap();
    assert!(cm.exists(&FileId::media(1)).await.unwrap());
    let whole = cm.read_whole(&FileId::media(1)).await.unwrap().unwrap();
    assert_eq!(whole.len(), 41_500);
}

// S2 (scaled down): chunked large file, range read materialises only the
// chunks intersecting the requested range.
#[tokio::test]
async fn large_file_is_chunked_and_ranges_are_served_correctly() {
    let server = MockServer::start().await;
    // 1 GB device memory -> 20 MB chunk size, 50 MB threshold.
    let chunk_size = 20 * 1024 * 1024u64;
    let total_size = chunk_size * 3; // exactly 3 chunks
    let body: Vec<u8> = (0..total_size).map(|i| (i % 251) as u8).collect();
    let digest = md5_hex(&body);

    for index in 0..3u64 {
        let start = index * chunk_size;
        let end = start + chunk_size - 1;
        let slice = body[start as usize..=end as usize].to_vec();
        Mock::given(method("GET"))
            .and(path("/media/6"))
            .and(header("range", format!("bytes={start}-{end}").as_str()))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(slice))
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let cm = manager(dir.path(), 1024 * 1024 * 1024).await;

    let descriptor = RequiredFileDescriptor {
        file_id: FileId::media(6),
        md5: Some(digest),
        size: total_size,
        source: FileSource::Http {
            url: format!("{}/media/6", server.uri()),
        },
        priority_hint: None,
    };

    cm.fetch(descriptor).await.unwrap();
    assert!(cm.exists(&FileId::media(6)).await.unwrap());

    let start = chunk_size + 100;
    let end = chunk_size * 2 + 500;
    let ranged = cm.read_range(&FileId::media(6), start, end).await.unwrap().unwrap();
    assert_eq!(ranged, Bytes::copy_from_slice(&body[start as usize..end as usize]));
}

// S7 / §8 property 7: a 202 response must never be cached.
#[tokio::test]
async fn deferred_202_response_is_never_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/2"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cm = manager(dir.path(), 4 * 1024 * 1024 * 1024).await;

    let descriptor = RequiredFileDescriptor {
        file_id: FileId::media(2),
        md5: None,
        size: 1_000,
        source: FileSource::Http {
            url: format!("{}/media/2", server.uri()),
        },
        priority_hint: None,
    };

    let err = cm.fetch(descriptor).await.unwrap_err();
    assert!(matches!(err.as_ref(), signage_download::Error::Deferred { .. }));
    assert!(!cm.exists(&FileId::media(2)).await.unwrap());
}

#[tokio::test]
async fn md5_mismatch_fails_the_task_and_leaves_no_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 200]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cm = manager(dir.path(), 4 * 1024 * 1024 * 1024).await;

    let descriptor = RequiredFileDescriptor {
        file_id: FileId::media(3),
        md5: Some("0000000000000000000000000000000".to_string()),
        size: 200,
        source: FileSource::Http {
            url: format!("{}/media/3", server.uri()),
        },
        priority_hint: None,
    };

    let err = cm.fetch(descriptor).await.unwrap_err();
    assert!(matches!(err.as_ref(), signage_download::Error::Md5Mismatch { .. }));
    assert!(!cm.exists(&FileId::media(3)).await.unwrap());
}
