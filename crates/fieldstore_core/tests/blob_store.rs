use fieldstore_core::db::{open_db_in_memory, share};
use fieldstore_core::{short_id, BlobStore, SqliteBlobStore};
use std::io::Cursor;
use uuid::Uuid;

fn store() -> SqliteBlobStore {
    SqliteBlobStore::try_new(share(open_db_in_memory().unwrap())).unwrap()
}

#[test]
fn write_read_exists_roundtrip() {
    let store = store();
    let blob_id = Uuid::new_v4();
    assert!(!store.blob_exists(blob_id).unwrap());
    assert!(store.read_blob(blob_id).unwrap().is_none());

    let metadata = store
        .write_blob(blob_id, &mut Cursor::new(b"hello".to_vec()))
        .unwrap();

    assert_eq!(metadata.blob_key, short_id(blob_id));
    assert_eq!(metadata.size, 5);
    assert_eq!(
        metadata.content_hash,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert!(store.blob_exists(blob_id).unwrap());
    assert_eq!(store.read_blob(blob_id).unwrap().unwrap(), b"hello");
    assert_eq!(store.metadata(blob_id).unwrap().unwrap(), metadata);
}

#[test]
fn rewriting_blob_replaces_bytes_and_hash() {
    let store = store();
    let blob_id = Uuid::new_v4();
    let first = store
        .write_blob(blob_id, &mut Cursor::new(b"first".to_vec()))
        .unwrap();
    let second = store
        .write_blob(blob_id, &mut Cursor::new(b"second payload".to_vec()))
        .unwrap();

    assert_ne!(first.content_hash, second.content_hash);
    assert_eq!(store.read_blob(blob_id).unwrap().unwrap(), b"second payload");
    assert_eq!(store.metadata(blob_id).unwrap().unwrap().size, 14);
}

#[test]
fn empty_blob_is_stored() {
    let store = store();
    let blob_id = Uuid::new_v4();

    let metadata = store.write_blob(blob_id, &mut std::io::empty()).unwrap();

    assert_eq!(metadata.size, 0);
    assert!(store.blob_exists(blob_id).unwrap());
    assert_eq!(store.read_blob(blob_id).unwrap().unwrap(), Vec::<u8>::new());
}
