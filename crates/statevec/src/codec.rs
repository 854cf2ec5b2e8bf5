//! Account record packing
//!
//! One account occupies the low 64 bits of a field element:
//!
//! ```text
//!  63        43 42        22 21         1  0
//! ┌────────────┬────────────┬────────────┬───┐
//! │  address   │   nonce    │   value    │ 0 │
//! └────────────┴────────────┴────────────┴───┘
//!     21 bits      21 bits      21 bits   padding
//! ```

use statevec_vcs::{fr_to_decimal, Fr};

use crate::error::CodecError;

/// Width of each packed field
pub const FIELD_BITS: u32 = 21;
pub const FIELD_MASK: u64 = (1 << FIELD_BITS) - 1;

pub const PADDING: u64 = 0x0;
pub const VALUE_OFFSET: u32 = 1;
pub const NONCE_OFFSET: u32 = 22;
pub const ADDRESS_OFFSET: u32 = 43;

/// The three packed fields of an account
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountField {
    Address,
    Nonce,
    Value,
}

impl AccountField {
    pub const ALL: [AccountField; 3] = [
        AccountField::Address,
        AccountField::Nonce,
        AccountField::Value,
    ];

    pub fn offset(self) -> u32 {
        match self {
            AccountField::Address => ADDRESS_OFFSET,
            AccountField::Nonce => NONCE_OFFSET,
            AccountField::Value => VALUE_OFFSET,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccountField::Address => "Address",
            AccountField::Nonce => "Nonce",
            AccountField::Value => "Value",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub address: u64,
    pub nonce: u64,
    pub value: u64,
}

impl Account {
    /// Every account starts here
    pub const GENESIS: Account = Account { address: 0, nonce: 0, value: 1 };

    pub fn new(address: u64, nonce: u64, value: u64) -> Result<Self, CodecError> {
        for (field, v) in [
            (AccountField::Address, address),
            (AccountField::Nonce, nonce),
            (AccountField::Value, value),
        ] {
            if v > FIELD_MASK {
                return Err(CodecError::FieldOverflow { field: field.name(), value: v });
            }
        }
        Ok(Self { address, nonce, value })
    }

    /// Packed 64-bit word
    pub fn pack(&self) -> u64 {
        (self.address << ADDRESS_OFFSET)
            | (self.nonce << NONCE_OFFSET)
            | (self.value << VALUE_OFFSET)
            | PADDING
    }

    pub fn encode(&self) -> Fr {
        Fr::from(self.pack())
    }

    pub fn decode(fe: &Fr) -> Result<Self, CodecError> {
        Ok(Self {
            address: extract_field(fe, ADDRESS_OFFSET)?,
            nonce: extract_field(fe, NONCE_OFFSET)?,
            value: extract_field(fe, VALUE_OFFSET)?,
        })
    }
}

/// Pack three 21-bit fields into a field element
pub fn encode(address: u64, nonce: u64, value: u64) -> Result<Fr, CodecError> {
    Ok(Account::new(address, nonce, value)?.encode())
}

/// Read one 21-bit field starting at `offset`
///
/// Goes through the element's decimal form, so anything that does not fit in a
/// 64-bit word (a wrapped negative, an overflowed sum) is reported, not masked.
pub fn extract_field(fe: &Fr, offset: u32) -> Result<u64, CodecError> {
    let decimal = fr_to_decimal(fe);
    let word: u64 = decimal
        .parse()
        .map_err(|source| CodecError::NotAWord { decimal: decimal.clone(), source })?;

    let mask = FIELD_MASK << offset;
    Ok((word & mask) >> offset)
}

/// Delta encoding an account change as disjoint per-field increments
///
/// Each change must fit in its 21-bit field. The fields never overlap, so the
/// packed change word adds to an account field by field.
pub fn account_delta(
    address_change: u64,
    nonce_increment: u64,
    value_change: u64,
) -> Result<Fr, CodecError> {
    Ok(Account::new(address_change, nonce_increment, value_change)?.encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use proptest::prelude::*;

    #[test]
    fn test_genesis_encoding() {
        let fe = Account::GENESIS.encode();
        assert_eq!(fe, Fr::from(2u64));
        assert_eq!(Account::decode(&fe).unwrap(), Account::GENESIS);
    }

    #[test]
    fn test_extract_each_field() {
        let fe = encode(7, 3, 999).unwrap();
        assert_eq!(extract_field(&fe, ADDRESS_OFFSET).unwrap(), 7);
        assert_eq!(extract_field(&fe, NONCE_OFFSET).unwrap(), 3);
        assert_eq!(extract_field(&fe, VALUE_OFFSET).unwrap(), 999);
    }

    #[test]
    fn test_delta_adds_fieldwise() {
        let start = Account::GENESIS.encode();
        let after = start + account_delta(0, 1, 250).unwrap() + account_delta(0, 1, 5).unwrap();
        assert_eq!(
            Account::decode(&after).unwrap(),
            Account { address: 0, nonce: 2, value: 256 }
        );
    }

    #[test]
    fn test_address_delta_top_bit() {
        let after = Account::GENESIS.encode() + account_delta(1 << 20, 0, 0).unwrap();
        assert_eq!(after, encode(1 << 20, 0, 1).unwrap());
        assert_eq!(
            Account::decode(&after).unwrap(),
            Account { address: 1 << 20, nonce: 0, value: 1 }
        );

        let full = account_delta(FIELD_MASK, FIELD_MASK, FIELD_MASK).unwrap();
        assert_eq!(full, Fr::from(u64::MAX - 1));
    }

    #[test]
    fn test_delta_change_bounded() {
        assert!(matches!(
            account_delta(0, 0, FIELD_MASK + 1),
            Err(CodecError::FieldOverflow { field: "Value", .. })
        ));
        assert!(matches!(
            account_delta(0, 1 << FIELD_BITS, 0),
            Err(CodecError::FieldOverflow { field: "Nonce", .. })
        ));
        assert!(matches!(
            account_delta(1 << 21, 0, 0),
            Err(CodecError::FieldOverflow { field: "Address", .. })
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            Account::new(0, FIELD_MASK + 1, 0),
            Err(CodecError::FieldOverflow { field: "Nonce", .. })
        ));
    }

    #[test]
    fn test_wrapped_element_reported() {
        let wrapped = Fr::ZERO - Fr::ONE;
        assert!(matches!(extract_field(&wrapped, VALUE_OFFSET), Err(CodecError::NotAWord { .. })));
    }

    #[test]
    fn test_top_address_bit() {
        let a = Account::new(FIELD_MASK, FIELD_MASK, FIELD_MASK).unwrap();
        assert_eq!(a.pack(), u64::MAX - 1);
        assert_eq!(Account::decode(&a.encode()).unwrap(), a);
    }

    proptest! {
        #[test]
        fn prop_codec_roundtrip(a in 0..=FIELD_MASK, n in 0..=FIELD_MASK, v in 0..=FIELD_MASK) {
            let fe = encode(a, n, v).unwrap();
            prop_assert_eq!(
                Account::decode(&fe).unwrap(),
                Account { address: a, nonce: n, value: v }
            );
        }
    }
}
