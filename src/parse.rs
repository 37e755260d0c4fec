//! Operator input parsing.
//!
//! Addresses and row values are always hexadecimal, with or without a `0x`
//! prefix, matching how fuse maps are usually written down.

use crate::error::{QfpromError, Result};

/// Step between consecutive fuse rows (one 64-bit row).
pub const ROW_STRIDE: u32 = 8;

/// Parse a hexadecimal `u32` such as `0xFC4B80A8`, `0XFF` or `1000`.
pub fn parse_hex_u32(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(QfpromError::InvalidArgument(format!(
            "'{}' is not a hexadecimal value",
            input
        )));
    }

    u32::from_str_radix(digits, 16).map_err(|e| {
        QfpromError::InvalidArgument(format!("'{}' is not a 32-bit hex value: {}", input, e))
    })
}

/// A row write requested on the command line as `ADDR:LSB:MSB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSpec {
    pub address: u32,
    pub lsb: u32,
    pub msb: u32,
}

impl std::str::FromStr for WriteSpec {
    type Err = QfpromError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [address, lsb, msb] = parts.as_slice() else {
            return Err(QfpromError::InvalidArgument(format!(
                "'{}' is not ADDR:LSB:MSB",
                s
            )));
        };

        Ok(Self {
            address: parse_hex_u32(address)?,
            lsb: parse_hex_u32(lsb)?,
            msb: parse_hex_u32(msb)?,
        })
    }
}

/// Rows from `start` to `end` inclusive, `step` bytes apart.
///
/// Addresses are produced on demand, so a range over the whole 32-bit
/// space costs nothing until it is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    next: u64,
    end: u64,
    step: u64,
}

impl AddressRange {
    /// Number of rows not yet produced.
    pub fn row_count(&self) -> u64 {
        if self.next > self.end {
            0
        } else {
            (self.end - self.next) / self.step + 1
        }
    }
}

impl Iterator for AddressRange {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next > self.end {
            return None;
        }
        let address = self.next as u32;
        self.next += self.step;
        Some(address)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.row_count()) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

/// Walk `start..=end` in steps of `step`.
///
/// # Example
///
/// ```
/// use qfprom_client::parse::address_range;
///
/// let rows: Vec<u32> = address_range(0x100, 0x110, 8).unwrap().collect();
/// assert_eq!(rows, vec![0x100, 0x108, 0x110]);
/// ```
pub fn address_range(start: u32, end: u32, step: u32) -> Result<AddressRange> {
    if step == 0 {
        return Err(QfpromError::InvalidArgument(
            "range step must be nonzero".to_string(),
        ));
    }
    if end < start {
        return Err(QfpromError::InvalidArgument(format!(
            "range end 0x{:08X} is below start 0x{:08X}",
            end, start
        )));
    }

    Ok(AddressRange {
        next: u64::from(start),
        end: u64::from(end),
        step: u64::from(step),
    })
}
