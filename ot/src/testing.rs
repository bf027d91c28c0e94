//! Random documents and operations for tests. Enabled for this crate's own tests and, through the
//! `test-utils` feature, for the tests of crates that depend on it.

use rand::Rng;

use crate::TextOperation;

const ALPHABET: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', ' ', '\n', 'é', 'ß',
];

pub fn random_string<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}

/// Builds a random operation that can be applied to `document`.
pub fn random_operation<R: Rng>(rng: &mut R, document: &str) -> TextOperation {
    let doc_len = document.chars().count();
    let mut operation = TextOperation::new();
    loop {
        let left = doc_len - operation.base_len();
        if left == 0 {
            break;
        }
        let len = 1 + rng.gen_range(0..(left - 1).min(20).max(1));
        let r: f64 = rng.gen();
        if r < 0.2 {
            let content = random_string(rng, len);
            operation.insert(&content);
        } else if r < 0.4 {
            operation.delete(len);
        } else {
            operation.retain(len);
        }
    }
    if rng.gen_bool(0.3) {
        let len = 1 + rng.gen_range(0..10);
        let content = random_string(rng, len);
        operation.insert(&content);
    }
    operation
}
