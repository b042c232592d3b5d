#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the Lockbox infrastructure crates.
//! The macros remove the boilerplate around error enums, API data models
//! and the async runtime entry point so that every crate in the workspace
//! declares these things the same way.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Attribute macro to bootstrap the workspace Tokio runtime.
///
/// Transforms an `async fn main` into a standard `fn main` that builds a
/// pre-configured runtime from one of the [`lockbox-runtime`] profiles and
/// blocks on the original body.
///
/// # Arguments
///
/// * `high_performance` - Tuned for server workloads (larger stacks, longer keep-alive).
/// * `default` - Worker threads auto-detected from available parallelism.
///
/// # Examples
///
/// ```rust,ignore
/// #[lockbox_runtime::main(high_performance)]
/// async fn main() -> anyhow::Result<()> {
/// # Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Attribute macro defining a standard API data model.
///
/// Keeps every DTO in the workspace consistent:
///
/// * **Derives**: adds `Debug`, `Serialize`, `Deserialize` and
///   `utoipa::ToSchema` unless already derived.
/// * **Serde policy**: `deny_unknown_fields` by default (can be disabled),
///   field names left as written unless `rename_all` is given.
///
/// # Arguments
///
/// * `rename_all = "camelCase"` - Applies a serde rename policy.
/// * `deny_unknown_fields = false` - Disables strict field checking.
///
/// # Example
///
/// ```rust,ignore
/// use lockbox_derive::api_model;
///
/// #[api_model(deny_unknown_fields = false)]
/// pub struct SessionRequest {
///     pub username: String,
///     pub password: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Attribute macro bridging Axum handlers with `OpenAPI` documentation.
///
/// Wraps an async handler and registers its metadata via `utoipa::path`.
/// Accepts the standard `utoipa::path` arguments (`get`, `put`,
/// `path = "..."`, `params(...)`, `responses(...)`, `tag = "..."`).
///
/// # Example
///
/// ```rust,ignore
/// use lockbox_derive::api_handler;
///
/// #[api_handler(
///     get,
///     path = "/health",
///     responses((status = OK, description = "Healthcheck endpoint")),
///     tag = "System",
/// )]
/// pub async fn health_handler() {}
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// A high-level attribute macro for defining domain-specific error enums.
///
/// Transforms a plain enum into a fully wired error type:
///
/// * **Derives**: injects `#[derive(Debug, thiserror::Error)]`.
/// * **Context**: generates a companion `<Name>Ext` trait adding
///   `.context(...)` to `Result`s carrying this error or any wrapped
///   source error.
/// * **Conversions**: `From<Source>` for variants with a `#[source]`/named
///   `source` field, and `From<&str>`/`From<String>` when an `Internal`
///   variant exists.
///
/// # Requirements
///
/// 1. Applied to an **enum** with named-field variants only.
/// 2. Variants that support context carry `context: Option<Cow<'static, str>>`.
/// 3. Variants wrapping an upstream error carry a `source` field.
///
/// # Example
///
/// ```rust,ignore
/// use lockbox_derive::lockbox_error;
/// use std::borrow::Cow;
///
/// #[lockbox_error]
/// pub enum StoreError {
///     #[error("I/O error{}: {source}", format_context(.context))]
///     Io {
///         #[source]
///         source: std::io::Error,
///         context: Option<Cow<'static, str>>,
///     },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn lockbox_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
