// Copyright 2026 Vocab Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Seeded permutation used for the daily auto-pool.
//!
//! The seed is the first eight bytes of SHA-256 over the seed text, read
//! big-endian. Draws come from SplitMix64 and the permutation is a
//! Fisher-Yates pass from the back, with each index picked by the high half of
//! a 128-bit multiply. Everything here is integer arithmetic, so the output is
//! identical on every platform.

use sha2::Digest;
use sha2::Sha256;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

pub fn seed_from(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform-ish draw in `0..bound`. `bound` must be non-zero.
    fn below(&mut self, bound: u64) -> u64 {
        ((u128::from(self.next_u64()) * u128::from(bound)) >> 64) as u64
    }
}

pub fn stable_shuffle<T: Clone>(items: &[T], seed_text: &str) -> Vec<T> {
    let mut out = items.to_vec();
    let mut rng = SplitMix64::new(seed_from(seed_text));
    for i in (1..out.len()).rev() {
        let j = rng.below(i as u64 + 1) as usize;
        out.swap(i, j);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitmix_matches_reference_sequence() {
        let mut rng = SplitMix64::new(0);
        assert_eq!(rng.next_u64(), 0xE220_A839_7B1D_CDAF);
    }

    #[test]
    fn seed_is_sha256_prefix() {
        // sha256("") = e3b0c442 98fc1c14 ...
        assert_eq!(seed_from(""), 0xE3B0_C442_98FC_1C14);
    }

    #[test]
    fn shuffle_is_a_stable_permutation() {
        let items: Vec<u32> = (0..20).collect();
        let a = stable_shuffle(&items, "2026-03-01:en,ja");
        let b = stable_shuffle(&items, "2026-03-01:en,ja");
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, items);

        let other = stable_shuffle(&items, "2026-03-02:en,ja");
        assert_ne!(a, other);
    }

    #[test]
    fn shuffle_handles_tiny_inputs() {
        let empty: Vec<String> = Vec::new();
        assert!(stable_shuffle(&empty, "seed").is_empty());
        assert_eq!(stable_shuffle(&["only"], "seed"), vec!["only"]);
    }
}
