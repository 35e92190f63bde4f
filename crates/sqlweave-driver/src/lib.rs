//! Command building and statement batching for sqlweave.
//!
//! [`DbDriver`] sits between a [`SqlQuery`](sqlweave_core::SqlQuery) and the
//! host's [`Connection`](sqlweave_core::Connection):
//!
//! - `build_command` parses the placeholders of the text, detects stored
//!   procedure calls, and binds one [`Parameter`](sqlweave_core::Parameter)
//!   per argument.
//! - `combine` / `combine_pair` merge several queries into one batch when the
//!   native driver can return several result sets from one command.
//! - `rebind` / `set_parameter_value` reuse a built command for bulk work.
//!
//! ```ignore
//! let driver = DbDriver::new(DialectKind::Postgres, DriverCapabilities::default());
//! let command = driver.build_command(&query)?;
//! ```

pub mod driver;
mod placeholders;

pub use driver::{DbDriver, DriverCapabilities};
