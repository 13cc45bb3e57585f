//! ZigZag mapping between signed and unsigned integers
//!
//! Flat stores integers as naturals; zigzag interleaves negative values
//! into the positive range so small magnitudes stay small.

use num_bigint::{BigInt, BigUint, ToBigInt};

pub trait ZigZag {
    type Zag;
    fn zigzag(self) -> Self::Zag;
}

impl ZigZag for BigInt {
    type Zag = BigUint;

    fn zigzag(self) -> Self::Zag {
        if self >= 0.into() {
            self << 1
        } else {
            let double: BigInt = self << 1;
            -double - <u8 as Into<BigInt>>::into(1)
        }
        .to_biguint()
        .expect("number is positive")
    }
}

impl ZigZag for BigUint {
    type Zag = BigInt;

    fn zigzag(self) -> Self::Zag {
        let i = self.to_bigint().expect("always possible");
        (i.clone() >> 1) ^ -(i & <u8 as Into<BigInt>>::into(1))
    }
}
