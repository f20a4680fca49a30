//! Small fixed-width bit masks.
//!
//! Used for settings masks (4 bits), weekday masks (7 bits, Monday = bit 0),
//! and month masks (12 bits, January = bit 0).  Persisted as arrays of
//! booleans; entries past the mask width are ignored on load.

use core::fmt;
use core::marker::PhantomData;

use heapless::Vec;
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

const MAX_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "Vec<bool, MAX_WIDTH>")]
pub struct Bits<const N: usize>(u16);

impl<const N: usize> Bits<N> {
    const MASK: u16 = if N >= 16 { u16::MAX } else { (1u16 << N) - 1 };

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(Self::MASK)
    }

    /// Build from a raw value; bits past the width are dropped.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw & Self::MASK)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn get(self, index: usize) -> bool {
        index < N && (self.0 >> index) & 1 == 1
    }

    pub fn set(&mut self, index: usize, value: bool) {
        if index >= N {
            return;
        }
        if value {
            self.0 |= 1 << index;
        } else {
            self.0 &= !(1 << index);
        }
    }

    pub fn with(mut self, index: usize) -> Self {
        self.set(index, true);
        self
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Indices of the set bits, lowest first.
    pub fn iter_set(self) -> impl Iterator<Item = usize> {
        (0..N).filter(move |&i| self.get(i))
    }
}

struct FlagsVisitor<const N: usize>(PhantomData<Bits<N>>);

impl<'de, const N: usize> Visitor<'de> for FlagsVisitor<N> {
    type Value = Bits<N>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of booleans")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut bits = Bits::empty();
        let mut index = 0;
        while let Some(on) = seq.next_element::<bool>()? {
            bits.set(index, on);
            index += 1;
        }
        Ok(bits)
    }
}

impl<'de, const N: usize> Deserialize<'de> for Bits<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(FlagsVisitor(PhantomData))
    }
}

impl<const N: usize> From<Bits<N>> for Vec<bool, MAX_WIDTH> {
    fn from(bits: Bits<N>) -> Self {
        (0..N.min(MAX_WIDTH)).map(|i| bits.get(i)).collect()
    }
}
