//! Property-based test generators using proptest.
//!
//! Keys are drawn from a small alphabet so that generated operations
//! collide often enough to exercise overwrites, tombstones and conflicts.

use metakv_core::Mutation;
use metakv_dentry::{Dentry, DentryFlags, FileType};
use proptest::prelude::*;

/// Strategy for short keys over `a..=h`.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(b'a'..=b'h', 1..4)
}

/// Strategy for values, including the empty value.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// A single store operation.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Put a value
    Put {
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Delete a key
    Delete {
        /// Key
        key: Vec<u8>,
    },
    /// Compare-and-swap a key
    CompareAndSwap {
        /// Key
        key: Vec<u8>,
        /// Expected current value, `None` for absent
        expected: Option<Vec<u8>>,
        /// Replacement
        new: Vec<u8>,
    },
    /// Read a key
    Get {
        /// Key
        key: Vec<u8>,
    },
}

/// Strategy for generating store operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| StoreOperation::Put { key, value }),
        1 => key_strategy().prop_map(|key| StoreOperation::Delete { key }),
        2 => (key_strategy(), prop::option::of(value_strategy()), value_strategy())
            .prop_map(|(key, expected, new)| StoreOperation::CompareAndSwap { key, expected, new }),
        2 => key_strategy().prop_map(|key| StoreOperation::Get { key }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Strategy for a step of a coordinated transaction.
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => (key_strategy(), value_strategy()).prop_map(|(k, v)| Mutation::put(k, v)),
        1 => key_strategy().prop_map(Mutation::delete),
        1 => key_strategy().prop_map(Mutation::delete_existing),
        1 => (key_strategy(), prop::option::of(value_strategy()), value_strategy())
            .prop_map(|(key, expected, new)| Mutation::CompareAndSwap { key, expected, new }),
    ]
}

/// Strategy for a non-empty transaction.
pub fn transaction_strategy(max_steps: usize) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(mutation_strategy(), 1..max_steps.max(2))
}

/// Strategy for dentry names.
pub fn dentry_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_.]{0,11}").expect("Invalid regex")
}

/// Strategy for unflagged dentries in directory `parent` of filesystem 1.
pub fn dentry_strategy(parent: u64) -> impl Strategy<Value = Dentry> {
    (
        dentry_name_strategy(),
        1u64..1_000,
        0u64..4,
        prop_oneof![
            Just(FileType::File),
            Just(FileType::Directory),
            Just(FileType::SymLink)
        ],
    )
        .prop_map(move |(name, inode, tx_id, file_type)| {
            Dentry::new(1, parent, name, inode, tx_id, file_type)
        })
}

/// A request against one directory. Names come from a tiny alphabet so
/// that creates and deletes keep hitting the same entries.
#[derive(Debug, Clone)]
pub enum DentryOperation {
    /// Create `name` pointing at `inode`
    Create {
        /// Entry name
        name: String,
        /// Target inode
        inode: u64,
    },
    /// Delete `name`
    Delete {
        /// Entry name
        name: String,
    },
}

/// Strategy for dentry requests over names `[a-e]{1,3}` and inodes `1..4`.
pub fn dentry_operation_strategy() -> impl Strategy<Value = DentryOperation> {
    prop_oneof![
        ("[a-e]{1,3}", 1u64..4).prop_map(|(name, inode)| DentryOperation::Create { name, inode }),
        "[a-e]{1,3}".prop_map(|name| DentryOperation::Delete { name }),
    ]
}

/// Strategy for flag combinations.
pub fn dentry_flags_strategy() -> impl Strategy<Value = DentryFlags> {
    (any::<bool>(), any::<bool>()).prop_map(|(delete, prepare)| {
        let mut flags = DentryFlags::NONE;
        if delete {
            flags = flags | DentryFlags::DELETE_MARK;
        }
        if prepare {
            flags = flags | DentryFlags::TRANSACTION_PREPARE;
        }
        flags
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
