//! Benchmark utilities.

#![warn(missing_docs)]

use rand::seq::SliceRandom;
use rand::Rng;

/// Generate random value bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` distinct keys `key-00000000`.. in shuffled order.
pub fn shuffled_keys(count: usize) -> Vec<Vec<u8>> {
    let mut keys: Vec<Vec<u8>> = (0..count)
        .map(|i| format!("key-{i:08}").into_bytes())
        .collect();
    keys.shuffle(&mut rand::thread_rng());
    keys
}

/// Generate `count` key-value pairs with values of `value_size` bytes.
pub fn generate_pairs(count: usize, value_size: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    shuffled_keys(count)
        .into_iter()
        .map(|key| (key, random_data(value_size)))
        .collect()
}
