//! Operand identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a qubit within a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q[{}]", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

impl From<usize> for QubitId {
    fn from(id: usize) -> Self {
        QubitId(u32::try_from(id).expect("QubitId overflow: exceeds u32::MAX"))
    }
}

/// Index of a classical register within a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CregId(pub u32);

impl fmt::Display for CregId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c[{}]", self.0)
    }
}

impl From<u32> for CregId {
    fn from(id: u32) -> Self {
        CregId(id)
    }
}

impl From<usize> for CregId {
    fn from(id: usize) -> Self {
        CregId(u32::try_from(id).expect("CregId overflow: exceeds u32::MAX"))
    }
}

/// Index of a bit register within a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BregId(pub u32);

impl fmt::Display for BregId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b[{}]", self.0)
    }
}

impl From<u32> for BregId {
    fn from(id: u32) -> Self {
        BregId(id)
    }
}

impl From<usize> for BregId {
    fn from(id: usize) -> Self {
        BregId(u32::try_from(id).expect("BregId overflow: exceeds u32::MAX"))
    }
}
