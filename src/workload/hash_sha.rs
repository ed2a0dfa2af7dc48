use super::{StopSignal, Workload};
use sha2::{Digest, Sha512};
use std::hint::black_box;

const INPUT: &[u8] = b"1234";

/// SHA-512 of a short fixed input, rendered as hex like a typical checksum
/// call site would.
#[derive(Debug, Default)]
pub struct HashSha;

impl HashSha {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[must_use]
pub fn hex_digest(input: &[u8]) -> String {
    hex::encode(Sha512::digest(input))
}

impl Workload for HashSha {
    fn run(&mut self, stop: &StopSignal) -> u64 {
        let mut score = 0u64;
        while !stop.is_raised() {
            black_box(hex_digest(black_box(INPUT)));
            score += 1;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_sha512_hex() {
        let digest = hex_digest(INPUT);
        assert_eq!(digest.len(), 128);
        assert!(digest.starts_with("d404559f602eab6f"));
    }
}
