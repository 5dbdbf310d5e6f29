#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the relay infrastructure crates.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! relay-derive.workspace = true
//! thiserror.workspace = true
//! ```
//!
//! The examples below are `ignore`d to avoid compiling a proc-macro consumer
//! inside this crate; the UI tests under `tests/ui` exercise them for real.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for declaring crate-level error enums.
///
/// # Injected Behaviors
///
/// * **Derives**: `Debug` and `thiserror::Error`, unless already derived.
/// * **Context**: a companion `<Name>Ext` trait adding `.context(..)` to
///   `Result<T, Name>` and to `Result<T, Source>` for every variant that
///   wraps a source error.
/// * **Conversions**: `From<Source>` for source-carrying variants so `?` works
///   on upstream errors, plus `From<&'static str>` / `From<String>` when an
///   `Internal { message, context }` variant exists.
/// * **Formatting**: a module-level `format_context` helper for `#[error(..)]`
///   strings.
///
/// # Requirements
///
/// 1. Applied to an **enum** with named-field variants only.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. A variant with a `source` field (or a field marked `#[source]` /
///    `#[from]`) must also have a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use relay_derive::relay_error;
/// use std::borrow::Cow;
///
/// #[relay_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read_snapshot(path: &str) -> Result<Vec<u8>, StoreError> {
///     Ok(std::fs::read(path).context("Reading snapshot")?)
/// }
/// ```
#[proc_macro_attribute]
pub fn relay_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
