//! Fixed-offset transaction layout and the PoW validity/hash predicates.
//!
//! The real curl-P/kerl hash and its trinary transaction layout are out of
//! scope; these are deterministic stand-ins that preserve the contracts the
//! dispatcher and chained-PoW driver depend on (fixed field widths, a pure
//! function from bytes to hash, monotonicity of validity in difficulty).

use apibox_core::trytes::Trytes;

/// Total width, in trytes, of one transaction.
pub const TX_LEN: usize = 2673;
/// Width, in trytes, of the trunk and branch fields.
const LINK_LEN: usize = 81;
/// Offset of the trunk field from the start of the transaction.
pub const TRUNK_OFFSET: usize = 2430;
/// Offset of the branch field from the start of the transaction.
pub const BRANCH_OFFSET: usize = TRUNK_OFFSET + LINK_LEN;

fn pad_trytes(s: &str, len: usize) -> String {
    let mut out = s.to_string();
    while out.len() < len {
        out.push('9');
    }
    out.truncate(len);
    out
}

/// Writes `trunk` and `branch` at their fixed offsets over a base transaction
/// body, returning the resulting transaction trytes. `body` supplies
/// everything outside the trunk/branch/nonce regions (signature, tag,
/// timestamps, ...); for a freshly constructed transaction this is typically
/// all-`9` padding.
pub fn with_links(body: &str, trunk: &Trytes, branch: &Trytes) -> Trytes {
    let mut bytes = pad_trytes(body, TX_LEN).into_bytes();
    let trunk = pad_trytes(trunk.as_str(), LINK_LEN);
    let branch = pad_trytes(branch.as_str(), LINK_LEN);
    bytes[TRUNK_OFFSET..TRUNK_OFFSET + LINK_LEN].copy_from_slice(trunk.as_bytes());
    bytes[BRANCH_OFFSET..BRANCH_OFFSET + LINK_LEN].copy_from_slice(branch.as_bytes());
    Trytes::parse(&String::from_utf8(bytes).expect("alphabet is ASCII")).expect("fixed alphabet")
}

pub fn trunk_of(tx: &Trytes) -> Trytes {
    Trytes::parse(&tx.as_str()[TRUNK_OFFSET..TRUNK_OFFSET + LINK_LEN]).expect("fixed alphabet")
}

pub fn branch_of(tx: &Trytes) -> Trytes {
    Trytes::parse(&tx.as_str()[BRANCH_OFFSET..BRANCH_OFFSET + LINK_LEN]).expect("fixed alphabet")
}

/// Maps a transaction's trytes to its condensed hash trytes. Used by the
/// chained-PoW driver as the next element's trunk. Deterministic and
/// collision-resistant enough for the chaining invariant to hold in
/// practice: this is a simplification of curl-P, not the real thing.
pub fn transaction_hash(tx: &Trytes) -> Trytes {
    let digest = blake3::hash(tx.as_str().as_bytes());
    bytes_to_trytes(digest.as_bytes(), LINK_LEN)
}

/// Opaque nonce-validity predicate: accepts when the transaction's hash has
/// at least `difficulty` trailing zero bits. Monotonic in `difficulty` and
/// a pure function of `tx`, which is all the dispatcher and PoW primitive
/// require of it.
pub fn valid_nonce(tx: &Trytes, difficulty: i64) -> bool {
    if difficulty <= 0 {
        return true;
    }
    let digest = blake3::hash(tx.as_str().as_bytes());
    trailing_zero_bits(digest.as_bytes()) >= difficulty as u32
}

fn trailing_zero_bits(bytes: &[u8]) -> u32 {
    let mut count = 0u32;
    for &b in bytes.iter().rev() {
        if b == 0 {
            count += 8;
            continue;
        }
        count += b.trailing_zeros();
        break;
    }
    count
}

/// Expands raw bytes into a trytes string of the given length over the
/// tangle alphabet, for use where a digest needs to flow back into a
/// trytes field.
fn bytes_to_trytes(bytes: &[u8], len: usize) -> Trytes {
    const ALPHABET: &[u8; 27] = b"9ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut out = String::with_capacity(len);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &b in bytes {
        acc = (acc << 8) | b as u32;
        bits += 8;
        while bits >= 5 && out.len() < len {
            bits -= 5;
            let idx = ((acc >> bits) & 0b11111) % 27;
            out.push(ALPHABET[idx as usize] as char);
        }
        if out.len() >= len {
            break;
        }
    }
    while out.len() < len {
        out.push('9');
    }
    Trytes::parse(&out).expect("fixed alphabet")
}
