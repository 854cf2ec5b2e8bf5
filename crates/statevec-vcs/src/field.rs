//! Scalar field helpers
//!
//! State, deltas and commitments all live in the Pallas base field.
//! Elements serialize to their canonical 32-byte little-endian representation.

use ff::PrimeField;
use num_bigint::BigUint;

use crate::error::{Result, VcsError};

/// Field element used for account records, deltas and tree nodes
pub type Fr = pasta_curves::Fp;

/// Size in bytes of a serialized field element
pub const ELEMENT_SIZE: usize = 32;

/// Convert a signed integer into the field (negative values map to `-|v|`)
pub fn fr_from_i64(v: i64) -> Fr {
    if v >= 0 {
        Fr::from(v as u64)
    } else {
        -Fr::from(v.unsigned_abs())
    }
}

/// Canonical decimal representation of an element
pub fn fr_to_decimal(fe: &Fr) -> String {
    BigUint::from_bytes_le(fe.to_repr().as_ref()).to_str_radix(10)
}

pub fn fr_to_bytes(fe: &Fr) -> [u8; ELEMENT_SIZE] {
    fe.to_repr()
}

/// Parse a canonical encoding; rejects wrong lengths and values >= modulus
pub fn fr_from_bytes(bytes: &[u8]) -> Result<Fr> {
    let repr: [u8; ELEMENT_SIZE] = bytes.try_into().map_err(|_| {
        VcsError::InvalidElement(format!(
            "expected {} bytes, got {}",
            ELEMENT_SIZE,
            bytes.len()
        ))
    })?;

    Option::from(Fr::from_repr(repr)).ok_or_else(|| {
        VcsError::InvalidElement(format!("non-canonical encoding {}", hex::encode(repr)))
    })
}
