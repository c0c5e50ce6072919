use super::helpers::{count_files_with_ext, open_engine, test_config};
use crate::*;
use anyhow::Result;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

// --------------------- Basic put / get / delete ---------------------

#[test]
fn put_and_get() -> Result<()> {
    let dir = tempdir()?;
    let engine = open_engine(dir.path());

    engine.put(b"foo".to_vec(), b"bar".to_vec())?;
    assert_eq!(engine.get(b"foo")?, b"bar");
    assert_eq!(engine.key_count(), 1);
    Ok(())
}

#[test]
fn get_missing_key_is_not_found() {
    let dir = tempdir().unwrap();
    let engine = open_engine(dir.path());

    assert!(matches!(engine.get(b"nope"), Err(EngineError::NotFound)));
}

#[test]
fn overwrite_returns_the_latest_value() -> Result<()> {
    let dir = tempdir()?;
    let engine = open_engine(dir.path());

    for i in 0..10u32 {
        engine.put(b"k".to_vec(), format!("v{}", i).into_bytes())?;
    }
    assert_eq!(engine.get(b"k")?, b"v9");
    assert_eq!(engine.key_count(), 1);
    Ok(())
}

#[test]
fn delete_removes_key_and_is_not_idempotent() -> Result<()> {
    let dir = tempdir()?;
    let engine = open_engine(dir.path());

    engine.put(b"k".to_vec(), b"v1".to_vec())?;
    engine.put(b"k".to_vec(), b"v2".to_vec())?;
    engine.delete(b"k")?;

    assert!(matches!(engine.get(b"k"), Err(EngineError::NotFound)));
    // a second delete reports the key as already gone
    assert!(matches!(engine.delete(b"k"), Err(EngineError::NotFound)));
    Ok(())
}

#[test]
fn put_after_delete_resurrects() -> Result<()> {
    let dir = tempdir()?;
    let engine = open_engine(dir.path());

    engine.put(b"k".to_vec(), b"v1".to_vec())?;
    engine.delete(b"k")?;
    engine.put(b"k".to_vec(), b"v2".to_vec())?;
    assert_eq!(engine.get(b"k")?, b"v2");
    Ok(())
}

#[test]
fn empty_value_roundtrip() -> Result<()> {
    let dir = tempdir()?;
    let engine = open_engine(dir.path());

    engine.put(b"k".to_vec(), Vec::new())?;
    assert_eq!(engine.get(b"k")?, b"");
    Ok(())
}

// --------------------- Input validation ---------------------

#[test]
fn put_rejects_oversized_value() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.value_max_size = 64;
    let engine = Engine::open(config).unwrap();

    // exactly at the cap is fine
    engine.put(b"ok".to_vec(), vec![b'x'; 64]).unwrap();

    let result = engine.put(b"big".to_vec(), vec![b'x'; 65]);
    assert!(matches!(
        result,
        Err(EngineError::ValueTooLarge { size: 65, max: 64 })
    ));
    assert!(matches!(engine.get(b"big"), Err(EngineError::NotFound)));
}

#[test]
fn empty_keys_are_rejected() {
    let dir = tempdir().unwrap();
    let engine = open_engine(dir.path());

    assert!(matches!(
        engine.put(Vec::new(), b"v".to_vec()),
        Err(EngineError::EmptyKey)
    ));
    assert!(matches!(engine.delete(b""), Err(EngineError::EmptyKey)));
}

// --------------------- Read-only mode ---------------------

#[test]
fn read_only_engine_refuses_mutations() -> Result<()> {
    let dir = tempdir()?;
    {
        let engine = open_engine(dir.path());
        engine.put(b"k".to_vec(), b"v".to_vec())?;
        engine.close()?;
    }

    let mut config = test_config(dir.path());
    config.read_write = false;
    let engine = Engine::open(config)?;

    assert_eq!(engine.get(b"k")?, b"v");
    assert!(engine.active_file_id().is_none());
    assert!(matches!(
        engine.put(b"k".to_vec(), b"v2".to_vec()),
        Err(EngineError::NotWritable)
    ));
    assert!(matches!(engine.delete(b"k"), Err(EngineError::NotWritable)));
    Ok(())
}

// --------------------- Rollover ---------------------

#[test]
fn rollover_opens_a_new_segment_pair() -> Result<()> {
    let dir = tempdir()?;
    let mut config = test_config(dir.path());
    config.max_file_size = 1;
    let engine = Engine::open(config)?;

    engine.put(b"a".to_vec(), b"1".to_vec())?;
    let first = engine.active_file_id().unwrap();

    // the id collision guard refuses a rollover within the creation second
    thread::sleep(Duration::from_millis(1100));
    engine.put(b"b".to_vec(), b"2".to_vec())?;

    let second = engine.active_file_id().unwrap();
    assert!(second > first, "expected a fresh, larger file id");
    assert_eq!(count_files_with_ext(dir.path(), "bsm"), 2);
    assert_eq!(count_files_with_ext(dir.path(), "idx"), 2);

    // the retired segment stays readable alongside the new one
    assert_eq!(engine.get(b"a")?, b"1");
    assert_eq!(engine.get(b"b")?, b"2");
    Ok(())
}

#[test]
fn rollover_restamps_the_lock_file() -> Result<()> {
    let dir = tempdir()?;
    let mut config = test_config(dir.path());
    config.max_file_size = 1;
    let engine = Engine::open(config)?;

    engine.put(b"a".to_vec(), b"1".to_vec())?;
    thread::sleep(Duration::from_millis(1100));
    engine.put(b"b".to_vec(), b"2".to_vec())?;

    let active = engine.active_file_id().unwrap();
    let stamp = std::fs::read_to_string(dir.path().join(LOCK_FILE))?;
    assert!(stamp.ends_with(&format!("{}.bsm", active)), "stamp was {:?}", stamp);
    Ok(())
}

// --------------------- Concurrency ---------------------

#[test]
fn concurrent_readers_during_writes() -> Result<()> {
    let dir = tempdir()?;
    let engine = Arc::new(open_engine(dir.path()));

    for i in 0..100u32 {
        engine.put(format!("key{}", i).into_bytes(), format!("val{}", i).into_bytes())?;
    }

    let mut readers = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        readers.push(thread::spawn(move || {
            for _ in 0..50 {
                for i in 0..100u32 {
                    let value = engine.get(format!("key{}", i).as_bytes()).unwrap();
                    assert_eq!(value, format!("val{}", i).into_bytes());
                }
            }
        }));
    }

    // keep writing fresh keys while the readers hammer the stable ones
    for i in 100..200u32 {
        engine.put(format!("key{}", i).into_bytes(), format!("val{}", i).into_bytes())?;
    }

    for handle in readers {
        handle.join().unwrap();
    }
    for i in 0..200u32 {
        assert_eq!(
            engine.get(format!("key{}", i).as_bytes())?,
            format!("val{}", i).into_bytes()
        );
    }
    Ok(())
}
