//! Report module - rendering exchange results for the operator.
//!
//! Results go to stdout, one line each, either as human-readable text or
//! as JSON objects. Logs go to stderr so stdout stays machine-readable.
//!
//! # Example
//!
//! ```
//! use qfprom_client::report::{render_text, Operation};
//! use qfprom_client::{RegisterResult, RegisterRow};
//!
//! let result = RegisterResult::Row(RegisterRow { address: 0x1000, lsb: 0xAABBCCDD, msb: 0x11223344 });
//! assert_eq!(
//!     render_text(Operation::Read, &result),
//!     "Row data for 0x00001000 - LSB: 0xAABBCCDD MSB: 0x11223344",
//! );
//! ```

mod render;
mod stdio;

pub use render::{render_json, render_text, Operation, ReportLine};
pub use stdio::{OutputFormat, Reporter};
