/*!
 * Tests for the local record store
 */

use resumeflow::persistence::{NewRecord, PageQuery, RecordStore, SqliteRecordStore};

use crate::common;

fn record(n: usize, user: &str) -> NewRecord {
    NewRecord::completed(
        format!("original {}", n),
        format!("modified {}", n),
        format!("requirements {}", n),
        user,
    )
}

#[tokio::test]
async fn test_list_shouldReturnNewestFirstWithPaging() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    for n in 1..=12 {
        store.create(record(n, "user123")).await.unwrap();
    }

    let first = store.list(PageQuery::new(1, 5, None)).await.unwrap();
    assert_eq!(first.total, 12);
    assert_eq!(first.pages, 3);
    assert_eq!(first.records.len(), 5);
    assert_eq!(first.records[0].modified_content, "modified 12");

    let last = store.list(PageQuery::new(3, 5, None)).await.unwrap();
    assert_eq!(last.records.len(), 2);
    assert_eq!(last.records[1].modified_content, "modified 1");
}

#[tokio::test]
async fn test_list_withUserFilter_shouldOnlyReturnThatUser() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    store.create(record(1, "alice")).await.unwrap();
    store.create(record(2, "bob")).await.unwrap();
    store.create(record(3, "alice")).await.unwrap();

    let page = store
        .list(PageQuery::new(1, 10, Some("alice".to_string())))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.records.iter().all(|r| r.user_id.as_deref() == Some("alice")));
}

#[tokio::test]
async fn test_list_withOversizedPage_shouldUseDefaultSize() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    for n in 1..=15 {
        store.create(record(n, "user123")).await.unwrap();
    }
    let page = store.list(PageQuery::new(0, 1000, None)).await.unwrap();
    assert_eq!(page.current, 1);
    assert_eq!(page.size, 10);
    assert_eq!(page.records.len(), 10);
}

#[tokio::test]
async fn test_delete_shouldRemoveRecord() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let id = store.create(record(1, "user123")).await.unwrap();

    assert!(store.delete(id).await.unwrap());
    assert!(store.get(id).await.unwrap().is_none());
    assert!(!store.delete(id).await.unwrap());
}

#[tokio::test]
async fn test_open_withFilePath_shouldPersistAcrossReopen() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("history.db");

    let id = {
        let store = SqliteRecordStore::open(&path).unwrap();
        store.create(record(1, "user123")).await.unwrap()
    };

    let reopened = SqliteRecordStore::open(&path).unwrap();
    assert_eq!(reopened.path(), path.as_path());
    let stored = reopened.get(id).await.unwrap().expect("record should survive reopen");
    assert_eq!(stored.original_content, "original 1");
}

#[tokio::test]
async fn test_list_withPageFarBeyondEnd_shouldReturnEmptyPage() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    store.create(record(1, "user123")).await.unwrap();

    let page = store.list(PageQuery::new(u64::MAX, 10, None)).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.total, 1);
    assert_eq!(page.current, u64::MAX);
}
