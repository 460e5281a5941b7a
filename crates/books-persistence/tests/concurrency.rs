//! Concurrent access against one WAL database file.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use books_domain::fixtures::sample_books;
use books_domain::{NewApiLog, PageRequest};
use books_persistence::{
    BookRepository, Database, DatabaseConfig, RetryPolicy, SqliteBookRepository, queries,
};
use futures::future::join_all;

const WRITERS: usize = 8;
const WRITES_PER_WRITER: usize = 25;

async fn setup() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::connect(
        DatabaseConfig::new(dir.path().join("books.db").to_string_lossy()).max_connections(16),
    )
    .await
    .unwrap();

    let mut session = db.acquire_session().await.unwrap();
    queries::books::insert_batch(&mut session, &sample_books(100))
        .await
        .unwrap();
    session.commit().await.unwrap();
    (dir, db)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reader_never_busy_while_writers_run() {
    let (_dir, db) = setup().await;
    let done = Arc::new(AtomicBool::new(false));

    let writers = (0..WRITERS).map(|w| {
        let db = db.clone();
        tokio::spawn(async move {
            for i in 0..WRITES_PER_WRITER {
                let db = &db;
                RetryPolicy::default()
                    .run("write_api_log", move || async move {
                        let mut session = db.acquire_session().await?;
                        let record =
                            NewApiLog::new(format!("/writer/{w}/{i}"), "POST", 201, 1.0);
                        let written = queries::api_logs::insert(&mut session, &record).await;
                        session.finish(written).await
                    })
                    .await
                    .unwrap();
            }
        })
    });
    let writers: Vec<_> = writers.collect();

    // No retries for the reader: a single busy error fails the test.
    let reader_repo = SqliteBookRepository::new(db.clone(), RetryPolicy::none());
    let reader_done = Arc::clone(&done);
    let reader = tokio::spawn(async move {
        let mut reads = 0_u32;
        while !reader_done.load(Ordering::SeqCst) || reads == 0 {
            let page = reader_repo.list(PageRequest::default()).await.unwrap();
            assert_eq!(page.total, 100);
            reads += 1;
            tokio::task::yield_now().await;
        }
        reads
    });

    for result in join_all(writers).await {
        result.unwrap();
    }
    done.store(true, Ordering::SeqCst);
    let reads = reader.await.unwrap();
    assert!(reads > 0);

    let mut session = db.acquire_session().await.unwrap();
    let logged = queries::api_logs::count(&mut session).await.unwrap();
    assert_eq!(logged, i64::try_from(WRITERS * WRITES_PER_WRITER).unwrap());
}
