//! Both backends behave like a plain byte vector.

use metakv_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
use proptest::prelude::*;
use tempfile::tempdir;

#[derive(Debug, Clone)]
enum Op {
    Append(Vec<u8>),
    Truncate(u64),
    Read(u64, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(any::<u8>(), 0..32).prop_map(Op::Append),
        1 => (0u64..96).prop_map(Op::Truncate),
        2 => (0u64..96, 0usize..16).prop_map(|(o, l)| Op::Read(o, l)),
    ]
}

fn check(backend: &mut dyn StorageBackend, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut model: Vec<u8> = Vec::new();
    for op in ops {
        match op {
            Op::Append(data) => {
                let offset = backend.append(data).unwrap();
                prop_assert_eq!(offset, model.len() as u64);
                model.extend_from_slice(data);
            }
            Op::Truncate(size) => match backend.truncate(*size) {
                Ok(()) => {
                    prop_assert!(*size <= model.len() as u64);
                    model.truncate(*size as usize);
                }
                Err(StorageError::InvalidTruncate { .. }) => {
                    prop_assert!(*size > model.len() as u64);
                }
                Err(other) => return Err(TestCaseError::fail(other.to_string())),
            },
            Op::Read(offset, len) => {
                let end = *offset as usize + len;
                match backend.read_at(*offset, *len) {
                    Ok(bytes) => prop_assert_eq!(&bytes[..], &model[*offset as usize..end]),
                    Err(StorageError::ReadPastEnd { .. }) => prop_assert!(end > model.len()),
                    Err(other) => return Err(TestCaseError::fail(other.to_string())),
                }
            }
        }
        prop_assert_eq!(backend.size().unwrap(), model.len() as u64);
    }
    backend.sync().unwrap();
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn memory_backend_matches_model(ops in prop::collection::vec(op(), 1..40)) {
        let mut backend = InMemoryBackend::new();
        check(&mut backend, &ops)?;
    }

    #[test]
    fn file_backend_matches_model(ops in prop::collection::vec(op(), 1..40)) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.log");
        let mut backend = FileBackend::open(&path).unwrap();
        check(&mut backend, &ops)?;
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        let size = reopened.size().unwrap();
        prop_assert_eq!(reopened.read_at(0, size as usize).unwrap().len() as u64, size);
    }
}
