//! End-to-end properties of ingest, rebuild and search.

use super::*;
use crate::extract::TextExtractor;
use crate::flat_index::IndexSnapshot;
use crate::ingest::{IngestOptions, Ingestor, SearchMirror};
use crate::metadata::MetadataStore;
use crate::queue::{RebuildQueue, RebuildStatus};
use crate::search::VectorSearchEngine;
use crate::types::{DocumentRecord, RebuildOutcome};
use docsim_core::config::ExtractionConfig;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

const LONG: Duration = Duration::from_secs(10);

fn setup() -> (TempDir, StoreLayout, MetadataStore) {
    let temp = TempDir::new().unwrap();
    let layout = StoreLayout::new(temp.path().join(".docsim"));
    let store = MetadataStore::new(layout.metadata_path());
    (temp, layout, store)
}

fn seed(store: &MetadataStore, records: &[(&str, &str)]) {
    for (source, text) in records {
        store
            .upsert(DocumentRecord::new(*source, *text, "text/plain", text.len() as u64))
            .unwrap();
    }
}

fn rebuilt(outcome: RebuildOutcome) -> crate::types::RebuildReport {
    match outcome {
        RebuildOutcome::Rebuilt(report) => report,
        other => panic!("expected a rebuild, got {:?}", other),
    }
}

fn no_ocr_extractor() -> TextExtractor {
    TextExtractor::new(&ExtractionConfig {
        ocr_enabled: false,
        ..Default::default()
    })
}

#[tokio::test]
async fn test_rows_match_vectors_after_rebuild() {
    let (_temp, layout, store) = setup();
    let topics = ["budgets", "hiring", "security", "roadmap", "vendors"];
    for topic in topics {
        seed(&store, &[(format!("{}.txt", topic).as_str(), body(topic).as_str())]);
    }

    let provider = Arc::new(text_vector_provider());
    rebuilt(builder(&layout, provider, LONG).run().await.unwrap());

    let (snapshot, records) = IndexSnapshot::read_pair(&layout).unwrap().unwrap();
    assert_eq!(records.len(), 5);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(snapshot.index.row(i).unwrap(), text_vector(&record.text).as_slice());
    }
}

#[tokio::test]
async fn test_unindexable_records_never_persist() {
    let (_temp, layout, store) = setup();
    seed(
        &store,
        &[
            ("keep.txt", body("procurement").as_str()),
            ("empty.txt", ""),
            ("short.txt", "   tiny note   "),
            ("link.txt", "  HTTPS://intranet.example.com/some/long/path"),
            ("link2.txt", "http://example.com/another/long/enough/link"),
            ("also-keep.txt", body("quarterly planning").as_str()),
        ],
    );

    let provider = Arc::new(text_vector_provider());
    let report = rebuilt(builder(&layout, provider.clone(), LONG).run().await.unwrap());

    assert_eq!(report.indexed, 2);
    assert_eq!(report.excluded.len(), 4);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    let sources: Vec<_> = store.load().unwrap().into_iter().map(|r| r.source).collect();
    assert_eq!(sources, vec!["keep.txt", "also-keep.txt"]);
}

#[tokio::test]
async fn test_one_failed_embedding_drops_one_record() {
    let (_temp, layout, store) = setup();
    seed(
        &store,
        &[
            ("a.txt", body("alpha").as_str()),
            ("b.txt", body("beta").as_str()),
            ("c.txt", body("gamma EMBED-FAIL").as_str()),
            ("d.txt", body("delta").as_str()),
            ("e.txt", body("epsilon").as_str()),
        ],
    );

    let provider = Arc::new(text_vector_provider());
    let report = rebuilt(builder(&layout, provider, LONG).run().await.unwrap());

    assert_eq!(report.indexed, 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].source, "c.txt");

    let (snapshot, records) = IndexSnapshot::read_pair(&layout).unwrap().unwrap();
    assert_eq!(snapshot.index.len(), 4);
    let sources: Vec<_> = records.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["a.txt", "b.txt", "d.txt", "e.txt"]);
}

#[tokio::test]
async fn test_no_survivors_leaves_files_byte_identical() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("good.txt", body("retention policy").as_str())]);

    let provider = Arc::new(text_vector_provider());
    let builder = builder(&layout, provider.clone(), LONG);
    rebuilt(builder.run().await.unwrap());

    // Only unindexable records from here on
    store
        .replace_all(&[
            DocumentRecord::new("empty.txt", "", "text/plain", 0),
            DocumentRecord::new("url.txt", "https://example.com/landing/page/x", "text/plain", 34),
        ])
        .unwrap();

    let index_before = fs::read(layout.index_path()).unwrap();
    let rows_before = fs::read(layout.index_metadata_path()).unwrap();
    let meta_before = fs::read(layout.metadata_path()).unwrap();

    let outcome = builder.run().await.unwrap();
    assert!(matches!(
        outcome,
        RebuildOutcome::NothingToIndex {
            total_records: 2,
            excluded: 2,
            failed: 0
        }
    ));

    assert_eq!(fs::read(layout.index_path()).unwrap(), index_before);
    assert_eq!(fs::read(layout.index_metadata_path()).unwrap(), rows_before);
    assert_eq!(fs::read(layout.metadata_path()).unwrap(), meta_before);

    // The previous index keeps serving
    let engine = VectorSearchEngine::open(layout.clone(), generator(provider)).unwrap();
    assert_eq!(engine.snapshot_info().unwrap().vectors, 1);
    let hits = engine.search(body("retention policy").as_str(), 3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_name, "good.txt");
}

#[tokio::test]
async fn test_index_still_loads_after_upload_and_lock_timeout() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str())]);

    let provider = Arc::new(text_vector_provider());
    rebuilt(builder(&layout, provider.clone(), LONG).run().await.unwrap());

    seed(&store, &[("b.txt", body("beta").as_str())]);
    let lock = RebuildLock::new(layout.lock_path(), LONG, Duration::from_millis(10));
    let held = lock.try_acquire().unwrap().unwrap();
    let outcome = builder(&layout, provider.clone(), Duration::from_millis(100))
        .run()
        .await
        .unwrap();
    assert!(matches!(outcome, RebuildOutcome::LockTimedOut { .. }));
    drop(held);

    let engine = VectorSearchEngine::open(layout.clone(), generator(provider.clone())).unwrap();
    assert_eq!(engine.snapshot_info().unwrap().vectors, 1);
    assert_eq!(engine.search(body("alpha").as_str(), 5).await.unwrap()[0].document_name, "a.txt");

    // The upload is still waiting in the store and the next run indexes it
    assert_eq!(store.len().unwrap(), 2);
    rebuilt(builder(&layout, provider, LONG).run().await.unwrap());
    engine.reload().unwrap();
    assert_eq!(engine.snapshot_info().unwrap().vectors, 2);
}

#[tokio::test]
async fn test_all_embeddings_failing_is_a_no_op() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("x.txt", body("EMBED-FAIL one").as_str()), ("y.txt", body("EMBED-FAIL two").as_str())]);

    let provider = Arc::new(text_vector_provider());
    let outcome = builder(&layout, provider, LONG).run().await.unwrap();

    assert!(matches!(outcome, RebuildOutcome::NothingToIndex { failed: 2, .. }));
    assert!(!layout.index_path().exists());
    assert_eq!(store.len().unwrap(), 2);
}

#[tokio::test]
async fn test_lock_timeout_touches_nothing() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str())]);
    let meta_before = fs::read(layout.metadata_path()).unwrap();

    let lock = RebuildLock::new(layout.lock_path(), LONG, Duration::from_millis(10));
    let _held = lock.try_acquire().unwrap().unwrap();

    let provider = Arc::new(text_vector_provider());
    let outcome = builder(&layout, provider.clone(), Duration::from_millis(100))
        .run()
        .await
        .unwrap();

    assert!(matches!(outcome, RebuildOutcome::LockTimedOut { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(!layout.index_path().exists());
    assert_eq!(fs::read(layout.metadata_path()).unwrap(), meta_before);
}

#[tokio::test]
async fn test_concurrent_rebuilds_never_overlap() {
    let (_temp, layout, store) = setup();
    seed(
        &store,
        &[("a.txt", body("alpha").as_str()), ("b.txt", body("beta").as_str()), ("c.txt", body("gamma").as_str())],
    );

    let provider =
        Arc::new(text_vector_provider().with_delay(Duration::from_millis(20)));
    let first = builder(&layout, provider.clone(), LONG);
    let second = builder(&layout, provider.clone(), LONG);

    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.run().await }),
        tokio::spawn(async move { second.run().await })
    );
    let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());

    assert!(a.is_rebuilt());
    assert!(b.is_rebuilt());
    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 6);
    assert!(IndexSnapshot::read_pair(&layout).unwrap().is_some());
}

#[tokio::test]
async fn test_contended_rebuild_with_short_timeout_abandons() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str()), ("b.txt", body("beta").as_str())]);

    let provider =
        Arc::new(text_vector_provider().with_delay(Duration::from_millis(200)));
    let slow = builder(&layout, provider.clone(), LONG);
    let impatient = builder(&layout, provider.clone(), Duration::from_millis(50));

    let slow_run = tokio::spawn(async move { slow.run().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = impatient.run().await.unwrap();

    assert!(matches!(second, RebuildOutcome::LockTimedOut { .. }));
    assert!(slow_run.await.unwrap().unwrap().is_rebuilt());
}

#[tokio::test]
async fn test_upsert_during_rebuild_gets_another_pass() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str())]);

    let sneaky_store = store.clone();
    let fired = Arc::new(Mutex::new(false));
    let fired_in = Arc::clone(&fired);
    let provider = Arc::new(FnProvider::new(3, move |text| {
        let mut fired = fired_in.lock().unwrap();
        if !*fired {
            *fired = true;
            sneaky_store
                .upsert(DocumentRecord::new("late.txt", body("late arrival"), "text/plain", 1))
                .unwrap();
        }
        Ok(text_vector(text))
    }));

    let report = rebuilt(builder(&layout, provider.clone(), LONG).run().await.unwrap());

    assert_eq!(report.passes, 2);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.deferred, 0);
    // a.txt is embedded once and reused by the second pass
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    let (_, rows) = IndexSnapshot::read_pair(&layout).unwrap().unwrap();
    let sources: Vec<_> = rows.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["a.txt", "late.txt"]);
    assert_eq!(store.len().unwrap(), 2);
}

#[tokio::test]
async fn test_lock_holder_indexes_upload_whose_own_rebuild_timed_out() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str())]);

    let provider =
        Arc::new(text_vector_provider().with_delay(Duration::from_millis(300)));
    let holder = builder(&layout, provider.clone(), LONG);
    let holder_run = tokio::spawn(async move { holder.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    seed(&store, &[("b.txt", body("beta").as_str())]);
    let uploads_run = builder(&layout, provider.clone(), Duration::from_millis(100))
        .run()
        .await
        .unwrap();
    assert!(matches!(uploads_run, RebuildOutcome::LockTimedOut { .. }));

    let report = rebuilt(holder_run.await.unwrap().unwrap());
    assert_eq!(report.indexed, 2);

    let (snapshot, rows) = IndexSnapshot::read_pair(&layout).unwrap().unwrap();
    assert_eq!(snapshot.index.len(), 2);
    let sources: Vec<_> = rows.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_store_that_keeps_changing_is_written_after_last_pass() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str())]);

    let sneaky_store = store.clone();
    let counter = Arc::new(Mutex::new(0));
    let counter_in = Arc::clone(&counter);
    let provider = Arc::new(FnProvider::new(3, move |text| {
        let mut n = counter_in.lock().unwrap();
        *n += 1;
        let source = format!("late-{}.txt", *n);
        sneaky_store
            .upsert(DocumentRecord::new(source.as_str(), body(&source), "text/plain", 1))
            .unwrap();
        Ok(text_vector(text))
    }));

    let report = rebuilt(builder(&layout, provider.clone(), LONG).run().await.unwrap());

    assert_eq!(report.passes, crate::builder::MAX_PASSES);
    assert_eq!(report.indexed, 3);
    assert_eq!(report.deferred, 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

    let (_, rows) = IndexSnapshot::read_pair(&layout).unwrap().unwrap();
    let sources: Vec<_> = rows.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["a.txt", "late-1.txt", "late-2.txt"]);

    // The record that landed after the last pass is not lost
    let stored: Vec<_> = store.load().unwrap().into_iter().map(|r| r.source).collect();
    assert_eq!(stored, vec!["a.txt", "late-1.txt", "late-2.txt", "late-3.txt"]);
}

#[tokio::test]
async fn test_toy_ranking_through_engine() {
    let (_temp, layout, store) = setup();
    seed(
        &store,
        &[("A", "document A sits at the origin"), ("B", "document B sits at three-four")],
    );

    let provider = Arc::new(FnProvider::new(2, |text| {
        Ok(if text.contains("three-four") {
            vec![3.0, 4.0]
        } else {
            vec![0.0, 0.0]
        })
    }));

    rebuilt(builder(&layout, provider.clone(), LONG).run().await.unwrap());

    let engine = VectorSearchEngine::open(layout.clone(), generator(provider)).unwrap();
    let hits = engine.search("origin", 2).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document_name, "A");
    assert_eq!(hits[0].similarity, 1.0);
    assert_eq!(hits[1].document_name, "B");
    assert!((hits[1].similarity - 0.0385).abs() < 0.00005);

    // More than stored: padded slots are skipped
    assert_eq!(engine.search("origin", 10).await.unwrap().len(), 2);
    assert!(engine.search("origin", 0).await.is_err());
}

#[tokio::test]
async fn test_query_embedding_failure_is_an_error() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str())]);

    let provider = Arc::new(text_vector_provider());
    rebuilt(builder(&layout, provider.clone(), LONG).run().await.unwrap());

    let engine = VectorSearchEngine::open(layout.clone(), generator(provider)).unwrap();
    assert!(matches!(
        engine.search("EMBED-FAIL query", 3).await,
        Err(AppError::Embedding(_))
    ));
}

#[tokio::test]
async fn test_engine_is_stale_until_reload_and_survives_torn_pair() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str())]);

    let provider = Arc::new(text_vector_provider());
    let builder = builder(&layout, provider.clone(), LONG);
    rebuilt(builder.run().await.unwrap());

    let engine = VectorSearchEngine::open(layout.clone(), generator(provider)).unwrap();
    let loaded_at = engine.snapshot_info().unwrap().loaded_at;
    assert_eq!(engine.snapshot_info().unwrap().vectors, 1);

    seed(&store, &[("b.txt", body("beta").as_str())]);
    rebuilt(builder.run().await.unwrap());

    // Still serving the old snapshot
    assert_eq!(engine.search(body("beta").as_str(), 5).await.unwrap().len(), 1);

    engine.reload().unwrap();
    assert_eq!(engine.snapshot_info().unwrap().vectors, 2);
    assert_eq!(engine.search(body("beta").as_str(), 5).await.unwrap().len(), 2);

    // An upload without a rebuild leaves the pair loadable
    seed(&store, &[("c.txt", body("gamma").as_str())]);
    assert_eq!(engine.reload().unwrap().vectors, 2);

    // Row copy from another build: the pair is torn
    let foreign = MetadataStore::encode(&[DocumentRecord::new("z.txt", body("zeta"), "text/plain", 1)]).unwrap();
    crate::persist::write_atomic(&layout.index_metadata_path(), &foreign).unwrap();
    assert!(matches!(engine.reload(), Err(AppError::Index(_))));
    let info = engine.snapshot_info().unwrap();
    assert_eq!(info.vectors, 2);
    assert!(info.loaded_at >= loaded_at);
    assert_eq!(engine.search(body("beta").as_str(), 5).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_engine_without_index_refuses_to_load() {
    let (_temp, layout, _store) = setup();
    let provider = Arc::new(text_vector_provider());

    assert!(matches!(
        VectorSearchEngine::open(layout, generator(provider)),
        Err(AppError::Index(_))
    ));
}

#[derive(Default)]
struct RecordingMirror {
    fail: bool,
    seen: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl SearchMirror for RecordingMirror {
    fn name(&self) -> &str {
        "recording"
    }

    async fn mirror(&self, record: &DocumentRecord) -> AppResult<()> {
        self.seen.lock().unwrap().push(record.source.clone());
        if self.fail {
            Err(AppError::Other("search service unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn ingestor(layout: &StoreLayout, provider: Arc<FnProvider>) -> Ingestor {
    let queue = Arc::new(RebuildQueue::new(builder(layout, provider, LONG)));
    Ingestor::new(
        MetadataStore::new(layout.metadata_path()),
        no_ocr_extractor(),
        queue,
    )
}

#[tokio::test]
async fn test_ingest_then_search() {
    let (_temp, layout, store) = setup();
    let provider = Arc::new(text_vector_provider());
    let ingestor = ingestor(&layout, provider.clone());

    let text = body("supplier onboarding");
    let receipt = ingestor
        .ingest("onboarding.txt", text.clone().into_bytes(), None, &IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(receipt.content_type, "text/plain");
    assert_eq!(receipt.size, text.len() as u64);

    let ticket = receipt.rebuild.unwrap();
    match ticket.wait().await {
        RebuildStatus::Finished { outcome } => assert!(outcome.is_rebuilt()),
        other => panic!("unexpected status: {:?}", other),
    }
    assert!(ticket.status().is_terminal());

    let stored = store.get("onboarding.txt").unwrap().unwrap();
    assert_eq!(stored.text, text);

    let engine = VectorSearchEngine::open(layout.clone(), generator(provider)).unwrap();
    let hits = engine.search(&text, 1).await.unwrap();
    assert_eq!(hits[0].document_name, "onboarding.txt");
    assert_eq!(hits[0].similarity, 1.0);
}

#[tokio::test]
async fn test_ingest_conflict_without_overwrite() {
    let (_temp, layout, store) = setup();
    let ingestor = ingestor(&layout, Arc::new(text_vector_provider()));
    let no_rebuild = IngestOptions {
        overwrite: false,
        trigger_rebuild: false,
    };

    ingestor
        .ingest("memo.txt", body("first").into_bytes(), None, &no_rebuild)
        .await
        .unwrap();
    let before = fs::read(layout.metadata_path()).unwrap();

    let err = ingestor
        .ingest("memo.txt", body("second").into_bytes(), None, &no_rebuild)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(fs::read(layout.metadata_path()).unwrap(), before);

    let overwrite = IngestOptions {
        overwrite: true,
        trigger_rebuild: false,
    };
    let receipt = ingestor
        .ingest("memo.txt", body("second").into_bytes(), None, &overwrite)
        .await
        .unwrap();
    assert!(receipt.rebuild.is_none());
    assert_eq!(store.get("memo.txt").unwrap().unwrap().text, body("second"));
    assert_eq!(store.len().unwrap(), 1);
}

#[tokio::test]
async fn test_mirror_failure_does_not_block_upsert() {
    let (_temp, layout, store) = setup();
    let mirror = Arc::new(RecordingMirror {
        fail: true,
        ..Default::default()
    });
    let ingestor = ingestor(&layout, Arc::new(text_vector_provider())).with_mirror(mirror.clone());

    ingestor
        .ingest(
            "policy.txt",
            body("travel policy").into_bytes(),
            None,
            &IngestOptions {
                overwrite: false,
                trigger_rebuild: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(mirror.seen.lock().unwrap().as_slice(), ["policy.txt"]);
    assert!(store.get("policy.txt").unwrap().is_some());
}

#[tokio::test]
async fn test_ingest_docx_and_unknown_format() {
    let (_temp, layout, store) = setup();
    let ingestor = ingestor(&layout, Arc::new(text_vector_provider()));
    let options = IngestOptions {
        overwrite: false,
        trigger_rebuild: false,
    };

    let docx = crate::extract::docx::tests::docx_with_body(
        "<w:p><w:r><w:t>Meeting minutes</w:t></w:r></w:p><w:p><w:r><w:t>Action items follow</w:t></w:r></w:p>",
    );
    ingestor.ingest("minutes.DOCX", docx, None, &options).await.unwrap();

    let receipt = ingestor
        .ingest("data.xlsx", b"PK\x03\x04binary".to_vec(), None, &options)
        .await
        .unwrap();
    assert_eq!(receipt.text_chars, 0);

    assert_eq!(
        store.get("minutes.DOCX").unwrap().unwrap().text,
        "Meeting minutes\nAction items follow"
    );
    assert_eq!(store.get("data.xlsx").unwrap().unwrap().text, "");
}

#[tokio::test]
async fn test_ingest_pdf_text() {
    let (_temp, layout, store) = setup();
    let ingestor = ingestor(&layout, Arc::new(text_vector_provider()));

    let pdf = crate::extract::pdf::tests::single_page_pdf("Quarterly requirements review");
    let receipt = ingestor
        .ingest(
            "review.pdf",
            pdf,
            None,
            &IngestOptions {
                overwrite: false,
                trigger_rebuild: false,
            },
        )
        .await
        .unwrap();

    assert!(receipt.text_chars > 0);
    assert_eq!(receipt.content_type, "application/pdf");
    assert!(store.get("review.pdf").unwrap().unwrap().text.contains("Quarterly"));
}

#[tokio::test]
async fn test_queue_drain_and_fire_and_forget() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str()), ("b.txt", body("beta").as_str())]);

    let provider = Arc::new(text_vector_provider());
    let queue = RebuildQueue::new(builder(&layout, provider, LONG));

    // Tickets dropped immediately
    let _ = queue.submit();
    let _ = queue.submit();
    assert_eq!(queue.drain().await, 2);

    let (snapshot, records) = IndexSnapshot::read_pair(&layout).unwrap().unwrap();
    assert_eq!(snapshot.index.len(), 2);
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_stats_reflect_pair() {
    let (_temp, layout, store) = setup();
    seed(&store, &[("a.txt", body("alpha").as_str()), ("tiny.txt", "x")]);

    let before = crate::stats::collect_stats(&layout).unwrap();
    assert_eq!(before.records, 2);
    assert_eq!(before.indexed_vectors, None);
    assert_eq!(before.index_bytes, 0);

    rebuilt(builder(&layout, Arc::new(text_vector_provider()), LONG).run().await.unwrap());

    let after = crate::stats::collect_stats(&layout).unwrap();
    assert_eq!(after.records, 1);
    assert_eq!(after.indexed_vectors, Some(1));
    assert_eq!(after.dimensions, Some(3));
    assert_eq!(after.model.as_deref(), Some("test-model"));
    assert!(after.index_bytes > 0);
}
