use proc_macro2::{Ident, Span, TokenStream};
use prost_types::field_descriptor_proto::Type;
use quote::quote;

use crate::binding::{BodyEncoding, HttpBinding, Verb};
use crate::classify::{
    classify, classify_form, route_variable_regex, BodyParam, ParamClassification,
};
use crate::error::Error;
use crate::flatten::LeafIndex;
use crate::index::{Message, MessageIndex};
use crate::path::{resolve_path, FieldPath};

/// Diagnostic for client-streaming methods.
pub fn no_client_stream(method: &str) -> String {
    format!("{method} not yet supported for REST clients")
}

/// Diagnostic for server-streaming methods.
pub fn no_server_stream(method: &str) -> String {
    format!("{method} not yet supported for REST servers")
}

/// Diagnostic for methods without an HTTP rule.
pub fn no_resty_options(method: &str) -> String {
    format!("{method} has no resty options")
}

/// The single statement generated for a method that cannot be called over REST.
pub fn unsupported(runtime: &TokenStream, diagnostic: &str) -> TokenStream {
    quote! {
        return Err(#runtime::ClientError::Unsupported(String::from(#diagnostic)));
    }
}

fn input() -> TokenStream {
    quote!(input)
}

/// Condition under which a parameter is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Required singular primitive: always sent.
    Unconditional,
    /// Repeated: sent once per element when the list is not empty.
    NonEmptyCollection,
    /// Explicitly optional scalar or oneof member: sent when set, even to its zero value.
    Presence,
    /// Message: sent when set.
    NotNull,
    /// String or bytes: sent when not empty.
    NonEmpty,
    /// Bool: sent when true.
    Truthy,
    /// Numbers and enums: sent when not zero.
    NonZero,
}

/// How a value is turned into the string that is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    Display,
    /// Well-known types go through their canonical JSON form.
    Json,
    Bytes,
    /// Enums go by their name; values unknown to the generated enum fall back to the number.
    Enum,
}

///
/// One query parameter or form field: its key, where its value comes from, and when it is sent.
///
#[derive(Debug, Clone)]
pub struct ParamEmission<'a> {
    pub key: String,
    pub path: FieldPath<'a>,
    pub guard: Guard,
    pub encoding: ValueEncoding,
}

impl<'a> ParamEmission<'a> {
    pub fn new(key: String, path: FieldPath<'a>) -> Option<Self> {
        let field = path.terminal()?;

        let guard = if field.required && field.is_singular_primitive() {
            Guard::Unconditional
        } else if field.repeated {
            Guard::NonEmptyCollection
        } else if field.proto3_optional || field.oneof.is_some() {
            Guard::Presence
        } else {
            match field.kind {
                Type::Message | Type::Group => Guard::NotNull,
                Type::String | Type::Bytes => Guard::NonEmpty,
                Type::Bool => Guard::Truthy,
                _ => Guard::NonZero,
            }
        };

        let encoding = if field.is_well_known() {
            ValueEncoding::Json
        } else if field.kind == Type::Bytes {
            ValueEncoding::Bytes
        } else if path.enum_type.is_some() {
            ValueEncoding::Enum
        } else {
            ValueEncoding::Display
        };

        Some(Self {
            key,
            path,
            guard,
            encoding,
        })
    }

    fn value(&self, value: TokenStream) -> TokenStream {
        match self.encoding {
            ValueEncoding::Display => quote!(#value.to_string()),
            ValueEncoding::Json => quote!(::serde_json::to_string(&#value)?),
            ValueEncoding::Bytes => quote!(String::from_utf8_lossy(&#value).into_owned()),
            ValueEncoding::Enum => match &self.path.enum_type {
                Some(enum_type) => quote! {{
                    let value: i32 = #value.clone();
                    #enum_type::try_from(value)
                        .map(|known| known.as_str_name().to_owned())
                        .unwrap_or_else(|_| value.to_string())
                }},
                None => quote!(#value.to_string()),
            },
        }
    }

    /// Statements appending this parameter to `sink`, a `Vec<(String, String)>`.
    pub fn render(&self, root: &TokenStream, sink: &Ident) -> TokenStream {
        let key = &self.key;
        let safe = self.path.safe(root);
        let push = |value: TokenStream| quote!(#sink.push((#key.to_owned(), #value)););

        match self.guard {
            Guard::Unconditional => push(self.value(safe)),
            Guard::NonEmptyCollection => {
                let push = push(self.value(quote!(item)));
                quote! {
                    {
                        let items = &#safe;
                        if !items.is_empty() {
                            for item in items.iter() {
                                #push
                            }
                        }
                    }
                }
            }
            Guard::Presence => {
                let direct = self.path.direct(root);
                let push = push(self.value(safe));
                quote!(if #direct.is_some() { #push })
            }
            Guard::NotNull => {
                let push = push(self.value(safe.clone()));
                quote!(if #safe.is_some() { #push })
            }
            Guard::NonEmpty => {
                let push = push(self.value(safe.clone()));
                quote!(if !#safe.is_empty() { #push })
            }
            Guard::Truthy => {
                let push = push(self.value(safe.clone()));
                quote!(if #safe { #push })
            }
            Guard::NonZero => {
                let zero = if self.path.terminal().is_some_and(|field| field.is_float()) {
                    quote!(0.0)
                } else {
                    quote!(0)
                };
                let push = push(self.value(safe.clone()));
                quote!(if #safe != #zero { #push })
            }
        }
    }
}

/// Emissions for `leaves` of `message`, in lexical order of their paths.
pub fn emissions<'a>(
    index: &'a MessageIndex,
    package: &str,
    message: &'a Message,
    leaves: &LeafIndex<'a>,
) -> Vec<ParamEmission<'a>> {
    leaves
        .keys()
        .filter_map(|key| {
            ParamEmission::new(key.clone(), resolve_path(index, package, message, key))
        })
        .collect()
}

///
/// The request URL: the route with every `{var}` or `{var=pattern}` replaced by a positional
/// placeholder, behind a placeholder for the base address.
///
#[derive(Debug, Clone)]
pub struct RouteFragment<'a> {
    /// `format!` string, e.g. `{}/v1/{}`.
    pub template: String,
    pub args: Vec<FieldPath<'a>>,
}

impl<'a> RouteFragment<'a> {
    pub fn new(route: &str, classification: &ParamClassification<'a>) -> Self {
        let mut template = String::from("{}");
        let mut last = 0;
        for found in route_variable_regex().find_iter(route) {
            template.push_str(&escape_braces(&route[last..found.start()]));
            template.push_str("{}");
            last = found.end();
        }
        template.push_str(&escape_braces(&route[last..]));

        Self {
            template,
            args: classification
                .path_params
                .iter()
                .map(|param| param.path.clone())
                .collect(),
        }
    }

    pub fn render(&self, base: &TokenStream) -> TokenStream {
        let template = &self.template;
        let root = input();
        let args = self.args.iter().map(|path| path.safe(&root));
        quote! {
            let raw_url = format!(#template, #base #(, #args)*);
        }
    }
}

fn escape_braces(literal: &str) -> String {
    literal.replace('{', "{{").replace('}', "}}")
}

/// Where the body value comes from.
#[derive(Debug, Clone)]
pub enum BodySource<'a> {
    WholeRequest,
    Field(FieldPath<'a>),
}

#[derive(Debug, Clone)]
pub enum BodyFragment<'a> {
    None,
    Json(BodySource<'a>),
    Form {
        multipart: bool,
        source: BodySource<'a>,
        fields: Vec<ParamEmission<'a>>,
    },
    Bytes(BodySource<'a>),
}

impl<'a> BodyFragment<'a> {
    pub fn new(
        index: &'a MessageIndex,
        package: &str,
        request: &'a Message,
        encoding: BodyEncoding,
        classification: &ParamClassification<'a>,
    ) -> Result<Self, Error> {
        let source = match &classification.body {
            BodyParam::None => return Ok(BodyFragment::None),
            BodyParam::WholeRequest => BodySource::WholeRequest,
            BodyParam::Field(path) => BodySource::Field(path.clone()),
        };

        Ok(match encoding {
            BodyEncoding::Json => BodyFragment::Json(source),
            BodyEncoding::Form | BodyEncoding::Multipart => {
                let multipart = encoding == BodyEncoding::Multipart;
                let name = if multipart { "multipart" } else { "form" };
                let fields = match classify_form(index, request, classification, name)? {
                    Some((message, leaves)) => emissions(index, package, message, &leaves),
                    None => Vec::new(),
                };
                BodyFragment::Form {
                    multipart,
                    source,
                    fields,
                }
            }
            BodyEncoding::Bytes => {
                if let BodySource::Field(path) = &source {
                    let supported = path.terminal().is_some_and(|field| {
                        !field.repeated
                            && matches!(field.kind, Type::Bytes | Type::String | Type::Message)
                    });
                    if !supported {
                        return Err(Error::RawBodyType {
                            message: request.full_name.clone(),
                            field: path.dotted(),
                        });
                    }
                }
                BodyFragment::Bytes(source)
            }
        })
    }

    /// Statements assigning the `body` variable; empty when the request has no body.
    pub fn render(&self, runtime: &TokenStream) -> TokenStream {
        let root = input();
        match self {
            BodyFragment::None => TokenStream::new(),
            BodyFragment::Json(BodySource::WholeRequest) => quote! {
                body = #runtime::RequestBody::Json(::serde_json::to_vec(input)?);
            },
            BodyFragment::Json(BodySource::Field(path)) => {
                let value = path.safe(&root);
                quote! {
                    body = #runtime::RequestBody::Json(::serde_json::to_vec(&#value)?);
                }
            }
            BodyFragment::Form {
                multipart,
                source,
                fields,
            } => {
                if fields.is_empty() {
                    return TokenStream::new();
                }
                let sink = Ident::new("body_forms", Span::call_site());
                let (scope, form_root) = match source {
                    BodySource::WholeRequest => (TokenStream::new(), root),
                    BodySource::Field(path) => {
                        let value = path.safe(&root);
                        (
                            quote!(let body_message = #value.clone().unwrap_or_default();),
                            quote!(body_message),
                        )
                    }
                };
                let fields = fields.iter().map(|field| field.render(&form_root, &sink));
                let variant = if *multipart {
                    quote!(Multipart)
                } else {
                    quote!(Form)
                };
                quote! {
                    let mut #sink: Vec<(String, String)> = Vec::new();
                    #scope
                    #(#fields)*
                    body = #runtime::RequestBody::#variant(#sink);
                }
            }
            BodyFragment::Bytes(BodySource::WholeRequest) => quote! {
                body = #runtime::RequestBody::Raw(::prost::Message::encode_to_vec(input));
            },
            BodyFragment::Bytes(BodySource::Field(path)) => {
                let value = path.safe(&root);
                let bytes = match path.terminal().map(|field| field.kind) {
                    Some(Type::Message) => {
                        quote!(::prost::Message::encode_to_vec(&#value.clone().unwrap_or_default()))
                    }
                    Some(Type::String) => quote!(#value.clone().into_bytes()),
                    _ => quote!(#value.clone()),
                };
                quote! {
                    body = #runtime::RequestBody::Raw(#bytes);
                }
            }
        }
    }
}

///
/// Everything needed to issue one REST call: verb, URL construction, body construction and the
/// query parameters in the order they are appended.
///
#[derive(Debug, Clone)]
pub struct RequestFragments<'a> {
    pub verb: Verb,
    pub route: RouteFragment<'a>,
    pub body: BodyFragment<'a>,
    pub query: Vec<ParamEmission<'a>>,
}

impl<'a> RequestFragments<'a> {
    /// Fragments of `request` sent with `binding`, for a client generated in `package`.
    pub fn new(
        index: &'a MessageIndex,
        package: &str,
        request: &'a Message,
        binding: &HttpBinding,
    ) -> Result<Self, Error> {
        let classification = classify(index, package, request, binding)?;
        Ok(Self {
            verb: binding.verb,
            route: RouteFragment::new(&binding.route, &classification),
            body: BodyFragment::new(
                index,
                package,
                request,
                binding.encoding,
                &classification,
            )?,
            query: emissions(index, package, request, &classification.query_params),
        })
    }

    pub fn render(&self, runtime: &TokenStream) -> RequestCode {
        let sink = Ident::new("params", Span::call_site());
        let root = input();
        RequestCode {
            verb: self.verb,
            route: self.route.render(&quote!(options.addr)),
            body: self.body.render(runtime),
            query: self
                .query
                .iter()
                .map(|param| param.render(&root, &sink))
                .collect(),
        }
    }
}

/// Rendered fragments of a REST call, handed to the renderer.
#[derive(Debug, Clone)]
pub struct RequestCode {
    pub verb: Verb,
    pub route: TokenStream,
    pub body: TokenStream,
    /// One statement per query parameter, in lexical order of the parameter paths.
    pub query: Vec<TokenStream>,
}
