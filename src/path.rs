use proc_macro2::{Ident, TokenStream};
use prost_types::field_descriptor_proto::Type;
use quote::quote;

use crate::ident::{field_ident, oneof_type_path, rust_type_path, type_ident};
use crate::index::{Field, Message, MessageIndex};

/// How a segment is read from the message that declares it.
#[derive(Debug, Clone)]
enum Access {
    /// A struct field of its own.
    Field,
    /// A `oneof` member, stored as `variant` of the enum in struct field `oneof`.
    Oneof {
        oneof: Ident,
        enum_path: TokenStream,
        variant: Ident,
    },
}

impl Access {
    fn of(index: &MessageIndex, package: &str, message: &Message, field: &Field) -> Self {
        match &field.oneof {
            Some(oneof) => Access::Oneof {
                oneof: field_ident(oneof),
                enum_path: oneof_type_path(index, package, &message.full_name, oneof),
                variant: type_ident(&field.name),
            },
            None => Access::Field,
        }
    }

    /// `Option<&T>` of `field` read from `base`.
    fn optional_ref(&self, base: &TokenStream, field: &Field) -> TokenStream {
        match self {
            Access::Field => {
                let ident = field_ident(&field.name);
                quote!(#base.#ident.as_ref())
            }
            Access::Oneof {
                oneof,
                enum_path,
                variant,
            } => quote! {
                (match &#base.#oneof {
                    Some(#enum_path::#variant(value)) => Some(value),
                    _ => None,
                })
            },
        }
    }
}

///
/// A chain of fields from a root message to a terminal field, e.g. `squid.mantle.mass_kg`.
///
/// Resolution stops at the first segment that does not name a field (or whose message type is
/// not in the index); such a path is kept, with `complete == false`, and callers treat it as
/// "not a valid accessor".
///
/// Type paths are resolved against the package the accessors are generated for.
///
#[derive(Debug, Clone)]
pub struct FieldPath<'a> {
    pub fields: Vec<&'a Field>,
    pub complete: bool,
    access: Vec<Access>,
    /// Rust path of the terminal's enum type, when the enum is part of the compile unit.
    pub enum_type: Option<TokenStream>,
}

impl<'a> FieldPath<'a> {
    /// The terminal field, if the path resolved completely.
    pub fn terminal(&self) -> Option<&'a Field> {
        if self.complete {
            self.fields.last().copied()
        } else {
            None
        }
    }

    pub fn dotted(&self) -> String {
        self.fields
            .iter()
            .map(|field| field.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    ///
    /// Presence-safe accessor of the terminal value, rooted at `root`.
    ///
    /// Unset intermediate messages read as the default value, like the `GetX()` chain of other
    /// protobuf runtimes:
    ///
    /// ```text
    /// input.a.as_ref().and_then(|m| m.b.as_ref()).map(|m| m.c.clone()).unwrap_or_default()
    /// ```
    ///
    /// Message terminals stay an `Option`, optional scalars and unset oneof members collapse to
    /// their default.
    ///
    pub fn safe(&self, root: &TokenStream) -> TokenStream {
        let Some((terminal, parents)) = self.fields.split_last() else {
            return root.clone();
        };
        let access = &self.access[parents.len()];
        let singular_message = terminal.is_message() && !terminal.repeated;

        if let Access::Oneof { .. } = access {
            let value = if parents.is_empty() {
                access.optional_ref(root, terminal)
            } else {
                let chain = self.parent_chain(root, parents);
                let member = access.optional_ref(&quote!(m), terminal);
                quote!(#chain.and_then(|m| #member))
            };
            return if singular_message {
                quote!(#value.cloned())
            } else {
                quote!(#value.cloned().unwrap_or_default())
            };
        }

        let ident = field_ident(&terminal.name);
        if parents.is_empty() {
            return if terminal.proto3_optional {
                quote!(#root.#ident.clone().unwrap_or_default())
            } else {
                quote!(#root.#ident)
            };
        }

        let chain = self.parent_chain(root, parents);
        if singular_message {
            quote!(#chain.and_then(|m| m.#ident.clone()))
        } else if terminal.proto3_optional {
            quote!(#chain.and_then(|m| m.#ident.clone()).unwrap_or_default())
        } else {
            quote!(#chain.map(|m| m.#ident.clone()).unwrap_or_default())
        }
    }

    ///
    /// Raw access to the terminal field as an `Option<&T>`, used to tell an unset optional
    /// scalar or oneof member apart from one set to its zero value.
    ///
    pub fn direct(&self, root: &TokenStream) -> TokenStream {
        let Some((terminal, parents)) = self.fields.split_last() else {
            return root.clone();
        };
        let access = &self.access[parents.len()];
        if parents.is_empty() {
            return access.optional_ref(root, terminal);
        }
        let chain = self.parent_chain(root, parents);
        let member = access.optional_ref(&quote!(m), terminal);
        quote!(#chain.and_then(|m| #member))
    }

    fn parent_chain(&self, root: &TokenStream, parents: &[&Field]) -> TokenStream {
        let m = quote!(m);
        let mut steps = parents
            .iter()
            .zip(&self.access)
            .map(|(field, access)| (*field, access));
        let Some((first, access)) = steps.next() else {
            return root.clone();
        };
        let first = access.optional_ref(root, first);
        let rest = steps.map(|(field, access)| access.optional_ref(&m, field));
        quote!(#first #(.and_then(|m| #rest))*)
    }
}

///
/// Resolves the dotted `path` against `root`, for accessors generated in `package`.
///
/// Every segment except the last must name a message-typed field whose type is in the index.
///
pub fn resolve_path<'a>(
    index: &'a MessageIndex,
    package: &str,
    root: &'a Message,
    path: &str,
) -> FieldPath<'a> {
    let mut fields = Vec::new();
    let mut access = Vec::new();
    let mut current = Some(root);

    for segment in path.split('.') {
        let Some((message, field)) =
            current.and_then(|message| Some((message, message.field_by_name(segment)?)))
        else {
            return FieldPath {
                fields,
                complete: false,
                access,
                enum_type: None,
            };
        };
        access.push(Access::of(index, package, message, field));
        fields.push(field);
        current = index.message_of(field);
    }

    let enum_type = fields
        .last()
        .filter(|field| field.kind == Type::Enum)
        .and_then(|field| field.type_name.as_deref())
        .filter(|name| index.package_of(name).is_some())
        .map(|name| rust_type_path(index, package, name));

    FieldPath {
        complete: !fields.is_empty(),
        fields,
        access,
        enum_type,
    }
}
