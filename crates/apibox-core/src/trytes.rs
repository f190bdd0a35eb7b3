use std::fmt;

use serde::{Deserialize, Serialize};

/// Symbols of the tangle's native 27-symbol alphabet, in stepping order.
/// Position 0 is `9`, not `A`: the first transition out of `9` jumps
/// straight to `A`, then cycles `A..Z` before `Z` carries back to `9`.
const ALPHABET: &[u8; 27] = b"9ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Width, in trytes, of the nonce field at the tail of a transaction.
pub const NONCE_LEN: usize = 27;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrytesError {
    #[error("invalid tryte symbol {0:?} at byte {1}")]
    InvalidSymbol(char, usize),
}

fn symbol_value(b: u8) -> Option<u8> {
    ALPHABET.iter().position(|&s| s == b).map(|p| p as u8)
}

/// A string over `{9, A..Z}`. Validated once at construction so every other
/// component can treat an existing `Trytes` value as already well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Trytes(String);

impl Trytes {
    pub fn parse(s: &str) -> Result<Self, TrytesError> {
        for (i, c) in s.chars().enumerate() {
            if !c.is_ascii() || symbol_value(c as u8).is_none() {
                return Err(TrytesError::InvalidSymbol(c, i));
            }
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy with the trailing `NONCE_LEN` trytes replaced by
    /// `nonce`, padded with `9` if `nonce` is shorter.
    pub fn with_nonce(&self, nonce: &Trytes) -> Trytes {
        let mut bytes = self.0.clone().into_bytes();
        let tail_start = bytes.len().saturating_sub(NONCE_LEN);
        let mut nonce_bytes = nonce.0.clone().into_bytes();
        nonce_bytes.resize(NONCE_LEN, b'9');
        nonce_bytes.truncate(NONCE_LEN);
        bytes[tail_start..].copy_from_slice(&nonce_bytes);
        Trytes(String::from_utf8(bytes).expect("alphabet is ASCII"))
    }

    /// Increment the trailing `NONCE_LEN` trytes by `k` in place, using the
    /// odometer described in the nonce-space stepper: `9 -> A -> ... -> Z`,
    /// `Z` carries back to `9` and bumps the next position to the left.
    pub fn step(&self, k: u64) -> Trytes {
        let mut bytes = self.0.clone().into_bytes();
        let tail_start = bytes.len().saturating_sub(NONCE_LEN);
        step_in_place(&mut bytes[tail_start..], k);
        Trytes(String::from_utf8(bytes).expect("alphabet is ASCII"))
    }
}

/// Odometer increment over the tail slice, stopping at the first
/// non-carrying position. Bases are 27-ary; carries propagate leftward.
fn step_in_place(tail: &mut [u8], mut k: u64) {
    if tail.is_empty() || k == 0 {
        return;
    }
    let mut i = tail.len();
    while k > 0 && i > 0 {
        i -= 1;
        let cur = symbol_value(tail[i]).expect("tail already validated") as u64;
        let sum = cur + (k % 27);
        k /= 27;
        let (new_val, carry) = if sum >= 27 { (sum - 27, 1) } else { (sum, 0) };
        tail[i] = ALPHABET[new_val as usize];
        k += carry;
    }
}

impl fmt::Display for Trytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Trytes {
    type Error = TrytesError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Trytes::parse(&s)
    }
}

impl From<Trytes> for String {
    fn from(t: Trytes) -> Self {
        t.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Trytes {
        Trytes::parse(s).unwrap()
    }

    #[test]
    fn rejects_non_alphabet_symbols() {
        assert!(Trytes::parse("9A0Z").is_err());
        assert!(Trytes::parse("hello").is_err());
    }

    #[test]
    fn step_increments_last_position() {
        let base = t(&"9".repeat(NONCE_LEN));
        assert_eq!(base.step(1).as_str(), format!("{}A", "9".repeat(NONCE_LEN - 1)));
        assert_eq!(base.step(2).as_str(), format!("{}B", "9".repeat(NONCE_LEN - 1)));
    }

    #[test]
    fn step_carries_on_overflow() {
        let mut tail = "9".repeat(NONCE_LEN - 1);
        tail.push('Z');
        let base = t(&tail);
        // Z -> 9 with carry into the next position (9 -> A).
        let expected = format!("{}A9", "9".repeat(NONCE_LEN - 2));
        assert_eq!(base.step(1).as_str(), expected);
    }

    #[test]
    fn step_is_additive() {
        let base = t(&"9".repeat(NONCE_LEN));
        for (a, b) in [(1u64, 2u64), (5, 30), (26, 1), (100, 200)] {
            assert_eq!(base.step(a).step(b), base.step(a + b));
        }
    }

    #[test]
    fn prefix_outside_nonce_region_is_untouched() {
        let mut s = "A".repeat(10);
        s.push_str(&"9".repeat(NONCE_LEN));
        let base = t(&s);
        let stepped = base.step(1);
        assert!(stepped.as_str().starts_with(&"A".repeat(10)));
    }
}
