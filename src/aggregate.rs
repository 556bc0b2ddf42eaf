use proc_macro2::TokenStream;

use crate::binding::extract_binding;
use crate::descriptor::{FileDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto};
use crate::error::Error;
use crate::fragment::{
    no_client_stream, no_resty_options, no_server_stream, RequestCode, RequestFragments,
};
use crate::ident::{rust_type_path, short_type_name};
use crate::index::{Context, Decl};

/// Generation record of one `.proto` file.
#[derive(Debug, Clone)]
pub struct FileUnit {
    /// Path of the source file, e.g. `shop/v1/items.proto`.
    pub source: String,
    pub package: String,
    pub services: Vec<ServiceUnit>,
}

#[derive(Debug, Clone)]
pub struct ServiceUnit {
    pub package: String,
    pub name: String,
    /// Service name without its `Service` suffix.
    pub display_name: String,
    pub comment: String,
    pub methods: Vec<MethodUnit>,
}

#[derive(Debug, Clone)]
pub struct MethodUnit {
    pub service: String,
    pub name: String,
    pub comment: String,
    pub request_type: String,
    pub response_type: String,
    pub request_path: TokenStream,
    pub response_path: TokenStream,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub code: MethodCode,
}

#[derive(Debug, Clone)]
pub enum MethodCode {
    Rest(RequestCode),
    /// The method cannot be called over REST; the diagnostic is the whole method body.
    Unsupported(String),
}

/// `ItemService` -> `Item`.
pub fn display_name(service: &str) -> &str {
    match service.strip_suffix("Service") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => service,
    }
}

///
/// Builds the record of `files[file]`. Files without services yield `None`.
///
/// Any error aborts the whole file: partial output is never produced.
///
pub fn build_file(
    ctx: &Context,
    files: &[FileDescriptorProto],
    file: usize,
    runtime: &TokenStream,
) -> Result<Option<FileUnit>, Error> {
    let proto = &files[file];
    if proto.service.is_empty() {
        tracing::debug!("{} declares no services", proto.name());
        return Ok(None);
    }

    let services = proto
        .service
        .iter()
        .enumerate()
        .map(|(index, service)| build_service(ctx, proto, file, index, service, runtime))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(FileUnit {
        source: proto.name().to_string(),
        package: proto.package().to_string(),
        services,
    }))
}

fn build_service(
    ctx: &Context,
    proto: &FileDescriptorProto,
    file: usize,
    index: usize,
    service: &ServiceDescriptorProto,
    runtime: &TokenStream,
) -> Result<ServiceUnit, Error> {
    let display = display_name(service.name()).to_string();
    let methods = service
        .method
        .iter()
        .enumerate()
        .map(|(method_index, method)| {
            let decl = Decl::Method {
                file,
                service: index,
                method: method_index,
            };
            build_method(ctx, proto.package(), &display, decl, method, runtime)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ServiceUnit {
        package: proto.package().to_string(),
        name: service.name().to_string(),
        display_name: display,
        comment: ctx
            .comments
            .get(Decl::Service {
                file,
                service: index,
            })
            .to_string(),
        methods,
    })
}

fn build_method(
    ctx: &Context,
    package: &str,
    service: &str,
    decl: Decl,
    method: &MethodDescriptorProto,
    runtime: &TokenStream,
) -> Result<MethodUnit, Error> {
    let name = method.name();
    let code = method_code(ctx, package, method, runtime)?;
    tracing::debug!(
        "{}.{}: {}",
        service,
        name,
        match &code {
            MethodCode::Rest(code) => code.verb.as_str(),
            MethodCode::Unsupported(_) => "unsupported",
        }
    );

    Ok(MethodUnit {
        service: service.to_string(),
        name: name.to_string(),
        comment: ctx.comments.get(decl).to_string(),
        request_type: short_type_name(method.input_type()).to_string(),
        response_type: short_type_name(method.output_type()).to_string(),
        request_path: rust_type_path(&ctx.messages, package, method.input_type()),
        response_path: rust_type_path(&ctx.messages, package, method.output_type()),
        client_streaming: method.client_streaming(),
        server_streaming: method.server_streaming(),
        code,
    })
}

/// Either the REST call of `method`, or the fixed diagnostic explaining why there is none.
pub fn method_code(
    ctx: &Context,
    package: &str,
    method: &MethodDescriptorProto,
    runtime: &TokenStream,
) -> Result<MethodCode, Error> {
    let name = method.name();
    if method.client_streaming() {
        return Ok(MethodCode::Unsupported(no_client_stream(name)));
    }
    if method.server_streaming() {
        return Ok(MethodCode::Unsupported(no_server_stream(name)));
    }
    let Some(binding) = extract_binding(method) else {
        return Ok(MethodCode::Unsupported(no_resty_options(name)));
    };

    let request = ctx
        .messages
        .get(method.input_type())
        .ok_or_else(|| Error::UnknownMessage {
            method: name.to_string(),
            message: method.input_type().to_string(),
        })?;

    let fragments =
        RequestFragments::new(&ctx.messages, package, request, &binding).map_err(|source| {
            Error::Method {
                method: name.to_string(),
                source: Box::new(source),
            }
        })?;
    Ok(MethodCode::Rest(fragments.render(runtime)))
}
