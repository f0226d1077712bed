//! BCH(n,k) syndrome-based single-error correction.
//!
//! `Encode` is a bit-serial LFSR division by the generator polynomial,
//! the same technique as a Mode S CRC-24 (`crc24`), just parameterized
//! over a 17-bit generator (`0x16F63`) instead of a 25-bit one. `Correct`
//! looks a computed syndrome up in a table built once at startup,
//! enumerating every weight-`<= ERROR_COUNT` bit-flip pattern.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Generator polynomial (`g = 0x16F63`).
pub const GENERATOR: u32 = 0x16F63;

/// Bit-position of the highest set bit of `GENERATOR` (`16`).
pub const POLY_LEN: u32 = 16;

/// Message length in bytes (`80` bits).
pub const MSG_LEN_BYTES: usize = 10;

/// Message length in bits.
pub const MSG_LEN_BITS: usize = MSG_LEN_BYTES * 8;

/// Number of bit errors the production syndrome table corrects.
pub const ERROR_COUNT: usize = 1;

const SYNDROME_MASK: u32 = (1 << POLY_LEN) - 1;

/// Compute the 16-bit syndrome of an 80-bit message. Pure — never
/// mutates its input. Zero means no detected error.
pub fn encode(message: &[u8]) -> u16 {
    let mut reg: u32 = 0;
    for &byte in message {
        for bit_pos in (0..8).rev() {
            let bit = (byte >> bit_pos) & 1;
            reg = (reg << 1) | bit as u32;
            if (reg >> POLY_LEN) & 1 == 1 {
                reg ^= GENERATOR;
            }
        }
    }
    (reg & SYNDROME_MASK) as u16
}

/// Because the checksum field is exactly `POLY_LEN` bits wide, appending
/// it to a fixed prefix reduces (by linearity of `encode`) to: the
/// correct checksum is simply `encode(prefix ++ zero checksum)`. Used to
/// construct synthetic valid frames for tests and by `scm::ScmRecord`.
pub fn compute_checksum(payload_with_zero_checksum: &[u8; MSG_LEN_BYTES]) -> u16 {
    encode(payload_with_zero_checksum)
}

fn flip_bit(message: &mut [u8], bit: usize) {
    message[bit / 8] ^= 1 << (7 - (bit % 8));
}

/// Recursively enumerate every bit-flip pattern of weight `<= max_weight`
/// over `n_bits` positions, registering the first-seen pattern for each
/// distinct nonzero syndrome.
///
/// For depth `d`, for each bit position `i` not already in the prefix,
/// toggle bit `i`, register `syndrome -> prefix + [i]` if unseen,
/// recurse with `d - 1`, then untoggle. The zero syndrome (weight 0 /
/// no error) is never registered.
///
/// No combinatorial guard is enforced here beyond what callers choose to
/// ask for — `max_weight` above 1 or 2 over `MSG_LEN_BITS = 80` grows
/// combinatorially (`C(80, w)` patterns) and is not exercised by any
/// code path in this crate, which only ever builds the `ERROR_COUNT = 1`
/// table.
fn build_syndrome_table(n_bits: usize, max_weight: usize) -> HashMap<u16, Vec<usize>> {
    let mut table = HashMap::new();
    let mut message = vec![0u8; n_bits / 8];
    let mut prefix = Vec::new();
    recurse(0, max_weight, n_bits, &mut message, &mut prefix, &mut table);
    table
}

fn recurse(
    start: usize,
    depth: usize,
    n_bits: usize,
    message: &mut [u8],
    prefix: &mut Vec<usize>,
    table: &mut HashMap<u16, Vec<usize>>,
) {
    if depth == 0 {
        return;
    }
    for i in start..n_bits {
        flip_bit(message, i);
        prefix.push(i);

        let syndrome = encode(message);
        if syndrome != 0 {
            table.entry(syndrome).or_insert_with(|| prefix.clone());
        }

        recurse(i + 1, depth - 1, n_bits, message, prefix, table);

        prefix.pop();
        flip_bit(message, i);
    }
}

static SYNDROME_TABLE: LazyLock<HashMap<u16, Vec<usize>>> =
    LazyLock::new(|| build_syndrome_table(MSG_LEN_BITS, ERROR_COUNT));

/// Result of a correction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// Syndrome computed before any correction was attempted.
    pub syndrome: u16,
    /// Syndrome remaining after correction was attempted (`0` if fixed,
    /// or if there was nothing to fix).
    pub residual: u16,
    /// True iff the residual syndrome is zero and at least one bit was
    /// flipped.
    pub corrected: bool,
    /// Bit positions flipped, in the 80-bit message, empty if none.
    pub positions: Vec<usize>,
}

/// Compute the syndrome of `message` and, if nonzero, look it up in the
/// precomputed table and flip the indicated bits in place.
pub fn correct(message: &mut [u8; MSG_LEN_BYTES]) -> Correction {
    let syndrome = encode(message);
    if syndrome == 0 {
        return Correction {
            syndrome: 0,
            residual: 0,
            corrected: false,
            positions: Vec::new(),
        };
    }

    let Some(positions) = SYNDROME_TABLE.get(&syndrome) else {
        return Correction {
            syndrome,
            residual: syndrome,
            corrected: false,
            positions: Vec::new(),
        };
    };
    let positions = positions.clone();

    for &bit in &positions {
        flip_bit(message, bit);
    }
    let residual = encode(message);

    Correction {
        syndrome,
        residual,
        corrected: residual == 0,
        positions,
    }
}
