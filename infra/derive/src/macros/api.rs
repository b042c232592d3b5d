use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::{Attribute, ItemFn, ItemStruct, Lit, LitStr, Meta};

/// Expands the `#[api_model]` attribute macro.
///
/// Adds the common DTO derives (`Debug`, `Serialize`, `Deserialize`,
/// `ToSchema`) and the optional serde policy attributes.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    let ApiModelArgs { rename_all, deny_unknown_fields } = match parse_args(args) {
        Ok(args) => args,
        Err(err) => return err,
    };

    let derives = existing_derives(&input.attrs);
    let mut tokens = Vec::new();
    if !derives.contains("Debug") {
        tokens.push(quote! { Debug });
    }
    if !derives.contains("Serialize") {
        tokens.push(quote! { ::serde::Serialize });
    }
    if !derives.contains("Deserialize") {
        tokens.push(quote! { ::serde::Deserialize });
    }
    if !derives.contains("ToSchema") {
        tokens.push(quote! { ::utoipa::ToSchema });
    }
    let derive_attr =
        if tokens.is_empty() { quote! {} } else { quote! { #[derive(#(#tokens),*)] } };

    let rename_attr =
        rename_all.map_or_else(|| quote! {}, |lit| quote! { #[serde(rename_all = #lit)] });
    let deny_attr = if deny_unknown_fields.unwrap_or(false) {
        quote! { #[serde(deny_unknown_fields)] }
    } else {
        quote! {}
    };

    quote! {
        #derive_attr
        #rename_attr
        #deny_attr
        #input
    }
}

/// Expands the `#[api_handler]` attribute macro.
///
/// Registers the handler with `utoipa::path` while keeping the signature
/// untouched.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let body = &input.block;
    let sig = &input.sig;
    let vis = &input.vis;
    let attrs = &input.attrs;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[::utoipa::path(#args)]
        #vis #sig {
            #body
        }
    }
}

struct ApiModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

fn parse_args(args: TokenStream) -> Result<ApiModelArgs, TokenStream> {
    let parser = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated;
    let metas = parser.parse2(args).map_err(|err| err.to_compile_error())?;

    let mut rename_all = None;
    let mut deny_unknown_fields = None;

    for meta in metas {
        let Meta::NameValue(name_value) = meta else {
            return Err(syn::Error::new_spanned(
                meta,
                "Expected name-value arguments like `rename_all = \"...\"`",
            )
            .to_compile_error());
        };

        if name_value.path.is_ident("rename_all") {
            match literal(&name_value) {
                Some(Lit::Str(lit)) => rename_all = Some(lit.clone()),
                _ => {
                    return Err(syn::Error::new_spanned(
                        &name_value.value,
                        "rename_all must be a string literal",
                    )
                    .to_compile_error());
                },
            }
        } else if name_value.path.is_ident("deny_unknown_fields") {
            match literal(&name_value) {
                Some(Lit::Bool(lit)) => deny_unknown_fields = Some(lit.value),
                _ => {
                    return Err(syn::Error::new_spanned(
                        &name_value.value,
                        "deny_unknown_fields must be a boolean literal",
                    )
                    .to_compile_error());
                },
            }
        } else {
            return Err(syn::Error::new_spanned(
                name_value.path,
                "Unsupported argument; expected rename_all or deny_unknown_fields",
            )
            .to_compile_error());
        }
    }

    Ok(ApiModelArgs { rename_all, deny_unknown_fields })
}

fn literal(name_value: &syn::MetaNameValue) -> Option<&Lit> {
    match &name_value.value {
        syn::Expr::Lit(expr_lit) => Some(&expr_lit.lit),
        _ => None,
    }
}

fn existing_derives(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();

    for attr in attrs {
        if !attr.path().is_ident("derive") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(seg) = meta.path.segments.last() {
                traits.insert(seg.ident.to_string());
            }
            Ok(())
        });
    }

    traits
}
