//! Text and JSON rendering of register results.

use serde::Serialize;

use crate::error::Result;
use crate::register::RegisterResult;

/// The kind of exchange a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    ReadCorrected,
    ReadDirect,
    Write,
}

impl Operation {
    fn is_write(self) -> bool {
        matches!(self, Operation::Write)
    }
}

/// One JSON report line.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportLine<'a> {
    pub operation: Operation,
    #[serde(flatten)]
    pub result: &'a RegisterResult,
}

/// Render a result as one human-readable line.
pub fn render_text(operation: Operation, result: &RegisterResult) -> String {
    match result {
        RegisterResult::Row(row) if operation.is_write() => format!(
            "Wrote row 0x{:08X} - LSB: 0x{:08X} MSB: 0x{:08X}",
            row.address, row.lsb, row.msb
        ),
        RegisterResult::Row(row) => format!(
            "Row data for 0x{:08X} - LSB: 0x{:08X} MSB: 0x{:08X}",
            row.address, row.lsb, row.msb
        ),
        RegisterResult::Rejected(err) if operation.is_write() => {
            format!("Error writing 0x{:08X} - {}", err.address, err.code)
        }
        RegisterResult::Rejected(err) => {
            format!("Error reading 0x{:08X} - {}", err.address, err.code)
        }
    }
}

/// Render a result as one JSON object.
pub fn render_json(operation: Operation, result: &RegisterResult) -> Result<String> {
    Ok(serde_json::to_string(&ReportLine { operation, result })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{DeviceError, RegisterRow};

    fn row() -> RegisterResult {
        RegisterResult::Row(RegisterRow {
            address: 0xFC4B_80A8,
            lsb: 0x0000_00FF,
            msb: 0x8000_0000,
        })
    }

    fn rejected() -> RegisterResult {
        RegisterResult::Rejected(DeviceError {
            address: 0x10,
            code: 12,
        })
    }

    #[test]
    fn test_render_read_text() {
        assert_eq!(
            render_text(Operation::ReadCorrected, &row()),
            "Row data for 0xFC4B80A8 - LSB: 0x000000FF MSB: 0x80000000"
        );
        assert_eq!(
            render_text(Operation::Read, &rejected()),
            "Error reading 0x00000010 - 12"
        );
    }

    #[test]
    fn test_render_write_text() {
        assert_eq!(
            render_text(Operation::Write, &row()),
            "Wrote row 0xFC4B80A8 - LSB: 0x000000FF MSB: 0x80000000"
        );
        assert_eq!(
            render_text(Operation::Write, &rejected()),
            "Error writing 0x00000010 - 12"
        );
    }

    #[test]
    fn test_render_json_flattens_result() {
        let json = render_json(Operation::ReadDirect, &rejected()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["operation"], "read_direct");
        assert_eq!(value["status"], "rejected");
        assert_eq!(value["address"], 0x10);
        assert_eq!(value["code"], 12);
    }

    #[test]
    fn test_render_json_row() {
        let json = render_json(Operation::Read, &row()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["status"], "row");
        assert_eq!(value["lsb"], 0xFF);
        assert_eq!(value["msb"], 0x8000_0000u32);
    }
}
