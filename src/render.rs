use heck::ToUpperCamelCase;
use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};

use crate::aggregate::{FileUnit, MethodCode, MethodUnit, ServiceUnit};
use crate::fragment::unsupported;
use crate::ident::method_ident;

/// Name of the shared runtime file emitted next to the clients.
pub const RUNTIME_FILE: &str = "resty_options.rs";

/// Generator version written into every generated file.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn header(source: Option<&str>) -> String {
    let mut header = format!("// Code generated by protoc-gen-resty v{VERSION}. DO NOT EDIT.\n");
    if let Some(source) = source {
        header.push_str(&format!("// source: {source}\n"));
    }
    header
}

#[cfg(feature = "doc")]
fn docs(comment: &str) -> TokenStream {
    let lines = comment.lines();
    quote!(#(#[doc = #lines])*)
}

#[cfg(not(feature = "doc"))]
fn docs(_comment: &str) -> TokenStream {
    quote! {}
}

///
/// Renders the REST clients of one `.proto` file.
///
/// The output is meant to be included in the module prost generates for the file's package, so
/// request and response types are referenced relative to it.
///
pub fn render_file(unit: &FileUnit, runtime: &TokenStream) -> String {
    let services = unit
        .services
        .iter()
        .map(|service| render_service(service, runtime));
    let output = quote! {
        #(#services)*
    };

    format!("{}\n{}\n", header(Some(&unit.source)), output)
}

fn render_service(service: &ServiceUnit, runtime: &TokenStream) -> TokenStream {
    let client = format_ident!("{}Client", service.display_name.to_upper_camel_case());
    let docs = if service.comment.is_empty() {
        let doc = format!(
            "REST client of `{}.{}`.",
            service.package, service.name
        );
        quote!(#[doc = #doc])
    } else {
        docs(&service.comment)
    };
    let methods = service
        .methods
        .iter()
        .map(|method| render_method(method, runtime));

    quote! {
        #docs
        #[derive(Debug, Clone)]
        pub struct #client {
            options: #runtime::Options,
        }

        impl #client {
            pub fn new(options: #runtime::Options) -> Self {
                Self { options }
            }

            #(#methods)*
        }
    }
}

///
/// Every RPC becomes two methods: `name(input)` with the client's options, and
/// `name_with(input, call)` where `call` overrides them for one request.
///
fn render_method(method: &MethodUnit, runtime: &TokenStream) -> TokenStream {
    let docs_plain = docs(&method.comment);
    let name = method_ident(&method.name);
    let name_with = method_ident(&format!("{}_with", method.name));
    let docs_with = docs(&format!(
        " Like [`Self::{}`], with `call` overriding the client options.",
        method_ident(&method.name)
    ));
    let request = &method.request_path;
    let response = &method.response_path;

    let body = match &method.code {
        MethodCode::Unsupported(diagnostic) => unsupported(runtime, diagnostic),
        MethodCode::Rest(code) => {
            let verb = Ident::new(code.verb.as_str(), Span::call_site());
            let route = &code.route;
            let body = &code.body;
            let query = &code.query;
            quote! {
                let options = self.options.apply(call);
                #route
                let mut body = #runtime::RequestBody::Empty;
                #body
                let mut params: Vec<(String, String)> = Vec::new();
                #(#query)*
                options
                    .execute(::reqwest::Method::#verb, raw_url, params, body)
                    .await
            }
        }
    };

    quote! {
        #docs_plain
        pub async fn #name(
            &self,
            input: &#request,
        ) -> Result<#response, #runtime::ClientError> {
            self.#name_with(input, &#runtime::CallOptions::default()).await
        }

        #docs_with
        #[allow(unused_variables, unused_mut, unused_parens)]
        pub async fn #name_with(
            &self,
            input: &#request,
            call: &#runtime::CallOptions,
        ) -> Result<#response, #runtime::ClientError> {
            #body
        }
    }
}

///
/// Renders `resty_options.rs`: client options, per-call overrides, the request and response
/// hooks, the request body and the error type.
///
/// Requests go through `Options::do_request` and responses through `Options::do_response`, both
/// replaceable, before the body is decoded as JSON.
///
pub fn render_runtime() -> String {
    let output = quote! {
        use ::std::fmt;
        use ::std::future::Future;
        use ::std::pin::Pin;
        use ::std::sync::Arc;

        pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

        /// Sends a built request.
        pub type DoRequest = Arc<
            dyn Fn(::reqwest::Client, ::reqwest::Request)
                    -> BoxFuture<Result<::reqwest::Response, ClientError>>
                + Send
                + Sync,
        >;

        /// Checks a response and returns its body.
        pub type DoResponse =
            Arc<dyn Fn(::reqwest::Response) -> BoxFuture<Result<Vec<u8>, ClientError>> + Send + Sync>;

        pub fn do_request<F, Fut>(f: F) -> DoRequest
        where
            F: Fn(::reqwest::Client, ::reqwest::Request) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<::reqwest::Response, ClientError>> + Send + 'static,
        {
            Arc::new(
                move |client: ::reqwest::Client,
                      request: ::reqwest::Request|
                      -> BoxFuture<Result<::reqwest::Response, ClientError>> {
                    Box::pin(f(client, request))
                },
            )
        }

        pub fn do_response<F, Fut>(f: F) -> DoResponse
        where
            F: Fn(::reqwest::Response) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<Vec<u8>, ClientError>> + Send + 'static,
        {
            Arc::new(
                move |response: ::reqwest::Response| -> BoxFuture<Result<Vec<u8>, ClientError>> {
                    Box::pin(f(response))
                },
            )
        }

        async fn send(
            client: ::reqwest::Client,
            request: ::reqwest::Request,
        ) -> Result<::reqwest::Response, ClientError> {
            Ok(client.execute(request).await?)
        }

        async fn read(response: ::reqwest::Response) -> Result<Vec<u8>, ClientError> {
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(ClientError::Status(status.as_u16(), text));
            }
            Ok(response.bytes().await?.to_vec())
        }

        #[derive(Clone)]
        pub struct Options {
            /// Base address, starting with `http://` or `https://`.
            pub addr: String,
            pub client: ::reqwest::Client,
            pub do_request: DoRequest,
            pub do_response: DoResponse,
        }

        impl fmt::Debug for Options {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct("Options")
                    .field("addr", &self.addr)
                    .field("client", &self.client)
                    .finish_non_exhaustive()
            }
        }

        impl Options {
            pub fn new(addr: impl Into<String>) -> Self {
                Self {
                    addr: addr.into(),
                    client: ::reqwest::Client::new(),
                    do_request: do_request(send),
                    do_response: do_response(read),
                }
            }

            pub fn with_client(mut self, client: ::reqwest::Client) -> Self {
                self.client = client;
                self
            }

            pub fn with_do_request<F, Fut>(mut self, f: F) -> Self
            where
                F: Fn(::reqwest::Client, ::reqwest::Request) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<::reqwest::Response, ClientError>> + Send + 'static,
            {
                self.do_request = do_request(f);
                self
            }

            pub fn with_do_response<F, Fut>(mut self, f: F) -> Self
            where
                F: Fn(::reqwest::Response) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<Vec<u8>, ClientError>> + Send + 'static,
            {
                self.do_response = do_response(f);
                self
            }

            /// These options with the overrides of `call` applied.
            pub fn apply(&self, call: &CallOptions) -> Options {
                Options {
                    addr: call.addr.clone().unwrap_or_else(|| self.addr.clone()),
                    client: call.client.clone().unwrap_or_else(|| self.client.clone()),
                    do_request: call
                        .do_request
                        .clone()
                        .unwrap_or_else(|| self.do_request.clone()),
                    do_response: call
                        .do_response
                        .clone()
                        .unwrap_or_else(|| self.do_response.clone()),
                }
            }

            pub async fn execute<T: ::serde::de::DeserializeOwned>(
                &self,
                method: ::reqwest::Method,
                url: String,
                params: Vec<(String, String)>,
                body: RequestBody,
            ) -> Result<T, ClientError> {
                let mut request = self.client.request(method, url);
                if !params.is_empty() {
                    request = request.query(&params);
                }
                request = match body {
                    RequestBody::Empty => request,
                    RequestBody::Json(bytes) => request
                        .header(::reqwest::header::CONTENT_TYPE, "application/json")
                        .body(bytes),
                    RequestBody::Form(fields) => request.form(&fields),
                    RequestBody::Multipart(fields) => {
                        let mut form = ::reqwest::multipart::Form::new();
                        for (name, value) in fields {
                            form = form.text(name, value);
                        }
                        request.multipart(form)
                    }
                    RequestBody::Raw(bytes) => request
                        .header(::reqwest::header::CONTENT_TYPE, "application/octet-stream")
                        .body(bytes),
                };

                let request = request.build()?;
                let response = (self.do_request)(self.client.clone(), request).await?;
                let bytes = (self.do_response)(response).await?;
                Ok(::serde_json::from_slice(&bytes)?)
            }
        }

        /// Overrides of the client options for a single call; unset values keep the client's.
        #[derive(Clone, Default)]
        pub struct CallOptions {
            addr: Option<String>,
            client: Option<::reqwest::Client>,
            do_request: Option<DoRequest>,
            do_response: Option<DoResponse>,
        }

        impl fmt::Debug for CallOptions {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct("CallOptions")
                    .field("addr", &self.addr)
                    .field("client", &self.client)
                    .finish_non_exhaustive()
            }
        }

        impl CallOptions {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
                self.addr = Some(addr.into());
                self
            }

            pub fn with_client(mut self, client: ::reqwest::Client) -> Self {
                self.client = Some(client);
                self
            }

            pub fn with_do_request<F, Fut>(mut self, f: F) -> Self
            where
                F: Fn(::reqwest::Client, ::reqwest::Request) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<::reqwest::Response, ClientError>> + Send + 'static,
            {
                self.do_request = Some(do_request(f));
                self
            }

            pub fn with_do_response<F, Fut>(mut self, f: F) -> Self
            where
                F: Fn(::reqwest::Response) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<Vec<u8>, ClientError>> + Send + 'static,
            {
                self.do_response = Some(do_response(f));
                self
            }
        }

        #[derive(Debug, Clone)]
        pub enum RequestBody {
            Empty,
            Json(Vec<u8>),
            Form(Vec<(String, String)>),
            Multipart(Vec<(String, String)>),
            Raw(Vec<u8>),
        }

        #[derive(Debug)]
        pub enum ClientError {
            Http(::reqwest::Error),
            Status(u16, String),
            Json(::serde_json::Error),
            Unsupported(String),
        }

        impl fmt::Display for ClientError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    ClientError::Http(err) => write!(f, "request failed: {}", err),
                    ClientError::Status(status, body) => write!(f, "status {}: {}", status, body),
                    ClientError::Json(err) => write!(f, "json: {}", err),
                    ClientError::Unsupported(message) => f.write_str(message),
                }
            }
        }

        impl ::std::error::Error for ClientError {}

        impl From<::reqwest::Error> for ClientError {
            fn from(err: ::reqwest::Error) -> Self {
                ClientError::Http(err)
            }
        }

        impl From<::serde_json::Error> for ClientError {
            fn from(err: ::serde_json::Error) -> Self {
                ClientError::Json(err)
            }
        }
    };

    format!("{}\n{}\n", header(None), output)
}
