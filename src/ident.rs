//!
//! Rust names for protobuf declarations, matching what prost-build generates.
//!

use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

use crate::index::{nesting, MessageIndex};

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn",
    "else", "enum", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static",
    "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual",
    "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers; prost appends an underscore instead.
const RESERVED: &[&str] = &["self", "super", "extern", "crate", "Self"];

fn sanitize(name: String) -> Ident {
    if RESERVED.contains(&name.as_str()) {
        Ident::new(&format!("{name}_"), Span::call_site())
    } else if KEYWORDS.contains(&name.as_str()) {
        Ident::new_raw(&name, Span::call_site())
    } else {
        Ident::new(&name, Span::call_site())
    }
}

/// Struct field name of a protobuf field.
pub fn field_ident(name: &str) -> Ident {
    sanitize(name.to_snake_case())
}

/// Name of the generated client method for an RPC.
pub fn method_ident(name: &str) -> Ident {
    sanitize(name.to_snake_case())
}

/// Type or module name in UpperCamelCase.
pub fn type_ident(name: &str) -> Ident {
    sanitize(name.to_upper_camel_case())
}

/// Last segment of a qualified type name: `.shop.v1.GetItemRequest` -> `GetItemRequest`.
pub fn short_type_name(full_name: &str) -> &str {
    full_name.rsplit('.').next().unwrap_or(full_name)
}

///
/// Rust path of the message or enum `full_name` as seen from code generated for `package`.
///
/// Types of the same package are referenced by name, nested types through the snake_case module
/// prost generates for their parent, and types of other packages through `super::` hops to the
/// common ancestor module. Well-known types resolve to `pbjson_types`, which carries their
/// canonical JSON encodings.
///
pub fn rust_type_path(index: &MessageIndex, package: &str, full_name: &str) -> TokenStream {
    if let Some(name) = full_name.strip_prefix(".google.protobuf.") {
        let ident = type_ident(name);
        return quote!(::pbjson_types::#ident);
    }
    let segments = type_segments(index, package, full_name);
    quote!(#(#segments)::*)
}

///
/// Rust path of the enum prost generates for the `oneof` named `oneof` of message `full_name`:
/// `.shop.v1.FindRequest` with `key` -> `find_request::Key`.
///
pub fn oneof_type_path(
    index: &MessageIndex,
    package: &str,
    full_name: &str,
    oneof: &str,
) -> TokenStream {
    let mut segments = type_segments(index, package, full_name);
    segments.pop();
    segments.push(field_ident(short_type_name(full_name)));
    segments.push(type_ident(oneof));
    quote!(#(#segments)::*)
}

fn type_segments(index: &MessageIndex, package: &str, full_name: &str) -> Vec<Ident> {
    let (target_package, nesting): (Vec<&str>, Vec<&str>) = match index.package_of(full_name) {
        Some(target) => (
            target.split('.').filter(|s| !s.is_empty()).collect(),
            nesting(full_name, target),
        ),
        None => {
            tracing::warn!("type `{}` is not in the descriptor set", full_name);
            (vec![], vec![short_type_name(full_name)])
        }
    };
    let current: Vec<&str> = package.split('.').filter(|s| !s.is_empty()).collect();

    let common = current
        .iter()
        .zip(&target_package)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<Ident> = Vec::new();
    segments.extend((common..current.len()).map(|_| Ident::new("super", Span::call_site())));
    segments.extend(target_package[common..].iter().map(|s| field_ident(s)));
    if let Some((last, parents)) = nesting.split_last() {
        segments.extend(parents.iter().map(|s| field_ident(s)));
        segments.push(type_ident(last));
    }
    segments
}
