use bytes::Bytes;
use futures_util::StreamExt;
use relay_blob::{
    ByteRange, ByteStream, ChunkRules, FsManifestStore, ListQuery, MemoryPartStore, RelayAdapter,
    RelayConfig, RelayError,
};

fn body_in_fragments(data: &[u8], fragment: usize) -> ByteStream {
    let pieces: Vec<Result<Bytes, std::io::Error>> = data
        .chunks(fragment)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(futures_util::stream::iter(pieces))
}

async fn read_all(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(item) = stream.next().await {
        out.extend_from_slice(&item.expect("body fragment"));
    }
    out
}

fn config() -> RelayConfig {
    RelayConfig::new()
        .with_chunk_rules(ChunkRules::new().with_chunk_size(1000))
        .with_range_window(1500)
        .with_download_buffer(2)
}

#[tokio::test]
async fn manifests_survive_a_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let parts = MemoryPartStore::new().with_fragment_size(128);
    let data: Vec<u8> = (0..3017u32).map(|i| (i % 199) as u8).collect();

    let file_id = {
        let relay = RelayAdapter::new(parts.clone(), FsManifestStore::open(dir.path()).await.unwrap(), config());
        let manifest = relay.put("report.pdf", body_in_fragments(&data, 7)).await.unwrap();
        assert_eq!(manifest.parts.len(), 4);
        manifest.file_id
    };

    let relay = RelayAdapter::new(parts, FsManifestStore::open(dir.path()).await.unwrap(), config());

    let whole = relay.open(&file_id, None).await.unwrap();
    assert_eq!(whole.manifest.file_name, "report.pdf");
    assert_eq!(read_all(whole.content).await, data);

    let tail = relay.open(&file_id, Some(ByteRange::from_start(2000))).await.unwrap();
    assert_eq!(tail.range.content_range(), "bytes 2000-3016/3017");
    assert_eq!(read_all(tail.content).await, &data[2000..]);

    let page = relay
        .list(&ListQuery {
            file_name: Some("report.pdf".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].file_id, file_id);
}

#[tokio::test]
async fn range_past_the_end_is_not_satisfiable() {
    let dir = tempfile::tempdir().unwrap();
    let relay = RelayAdapter::new(
        MemoryPartStore::new(),
        FsManifestStore::open(dir.path()).await.unwrap(),
        config(),
    );
    let manifest = relay.put("small.txt", body_in_fragments(b"tiny", 4)).await.unwrap();

    let err = relay
        .open(&manifest.file_id, Some(ByteRange::from_start(4)))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::RangeNotSatisfiable { file_size: 4 }));
}

#[tokio::test]
async fn empty_uploads_store_an_empty_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let relay = RelayAdapter::new(
        MemoryPartStore::new(),
        FsManifestStore::open(dir.path()).await.unwrap(),
        config(),
    );
    let manifest = relay.put("empty.bin", body_in_fragments(&[], 1)).await.unwrap();
    assert_eq!((manifest.file_size, manifest.parts.len()), (0, 0));

    let opened = relay.open(&manifest.file_id, None).await.unwrap();
    assert_eq!(opened.content_length(), 0);
    assert!(read_all(opened.content).await.is_empty());
}
