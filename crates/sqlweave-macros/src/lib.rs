//! Procedural macros for sqlweave.
//!
//! `#[derive(Entity)]` maps a struct with named fields to a table:
//!
//! ```ignore
//! #[derive(Entity, Debug, Default)]
//! #[entity(table = "Customers", schema = "Sales")]
//! pub struct Customer {
//!     #[column(identifier, name = "CustomerId")]
//!     pub id: i64,
//!     pub name: String,
//!     #[column(update = false)]
//!     pub created_on: String,
//!     #[column(ignore)]
//!     pub cache: Vec<u8>,
//! }
//! ```
//!
//! Struct attributes (`#[entity(...)]`): `table` (defaults to the struct name),
//! `schema`.
//!
//! Field attributes (`#[column(...)]`): `name`, `identifier`,
//! `strategy = "assigned" | "db_generated" | "sequence"`, `sequence = "NAME"`,
//! `db_type = "AnsiString"`, `insert = false`, `update = false`, `ignore`.
//!
//! A field named `id` is the identifier when no field is marked. The struct
//! must implement `Default`, and every mapped field type must implement
//! `ToValue` and `FromValue`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity_derive;

/// Derive the `Entity` trait.
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match entity_derive::parse_entity(&input) {
        Ok(def) => entity_derive::generate_entity_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
