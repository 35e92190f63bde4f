//! Unit-of-work sessions for sqlweave.
//!
//! A [`SessionFactory`] holds the dialect, driver, converters and listeners
//! for one database and opens sessions over fresh connections.
//!
//! - [`ReadOnlySession`] runs reads. Reads queued through
//!   [`ReadOnlySession::include`] are sent together with the next direct
//!   read, as one round trip when the driver supports batched queries.
//! - [`Session`] adds insert, update and delete, with listeners around each
//!   statement and identifier read-back after inserts.
//!
//! Connections are opened lazily. With [`ConnectionScope::PerTransaction`]
//! the connection is closed after each operation unless a transaction is
//! open; with [`ConnectionScope::PerSession`] it stays open until
//! [`ReadOnlySession::close`].
//!
//! ```ignore
//! let mut session = factory.open_session(ConnectionScope::PerSession);
//! let invoices = session.include().many::<Invoice>(invoices_query)?;
//! let customer = session.single::<Customer>(&cx, 42_i64).await?;
//! for invoice in invoices.take()? { /* ... */ }
//! session.close(&cx).await?;
//! ```

mod config;
mod execution;
mod factory;
mod include;
mod listener;
mod read_only;
mod session;
mod transaction;

pub use config::{ConnectionScope, SessionConfig};
pub use factory::SessionFactory;
pub use include::{IncludeMany, IncludeScalar, IncludeSingle};
pub use listener::{
    AnyEntity, DeleteListener, IdentifierStrategyListener, InsertListener, Listeners,
    UpdateListener,
};
pub use read_only::{Include, ReadOnlySession, SessionState};
pub use session::Session;
pub use transaction::Transaction;
