//! Structured results of register exchanges.

use serde::Serialize;

/// A row successfully read from (or written to) the fuse array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterRow {
    pub address: u32,
    pub lsb: u32,
    pub msb: u32,
}

impl RegisterRow {
    /// The full 64-bit row value, `msb` in the upper half.
    #[inline]
    pub fn value(&self) -> u64 {
        (u64::from(self.msb) << 32) | u64::from(self.lsb)
    }
}

/// A device-side rejection carried in an otherwise well-formed response.
///
/// The code is passed through from the service without interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceError {
    pub address: u32,
    pub code: u32,
}

/// Outcome of one register exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RegisterResult {
    Row(RegisterRow),
    Rejected(DeviceError),
}

impl RegisterResult {
    /// Address echoed by the service.
    pub fn address(&self) -> u32 {
        match self {
            RegisterResult::Row(row) => row.address,
            RegisterResult::Rejected(err) => err.address,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RegisterResult::Row(_))
    }

    pub fn row(&self) -> Option<&RegisterRow> {
        match self {
            RegisterResult::Row(row) => Some(row),
            RegisterResult::Rejected(_) => None,
        }
    }

    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            RegisterResult::Row(_) => None,
            RegisterResult::Rejected(err) => Some(err),
        }
    }
}
