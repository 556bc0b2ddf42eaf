use std::path::Path;

use prost::Message;
use prost_types::compiler::{code_generator_response, CodeGeneratorResponse};

use crate::aggregate::build_file;
use crate::descriptor::{CodeGeneratorRequest, FileDescriptorProto};
use crate::error::Error;
use crate::index::Context;
use crate::options::PluginOptions;
use crate::render::{render_file, render_runtime, RUNTIME_FILE};

/// `shop/v1/items.proto` -> `shop/v1/items.resty.rs`.
pub fn output_name(source: &str, out: Option<&str>) -> String {
    let stem = source.strip_suffix(".proto").unwrap_or(source);
    let name = format!("{stem}.resty.rs");
    match out {
        Some(out) => Path::new(out).join(name).to_string_lossy().into_owned(),
        None => name,
    }
}

fn runtime_name(out: Option<&str>) -> String {
    match out {
        Some(out) => Path::new(out).join(RUNTIME_FILE).to_string_lossy().into_owned(),
        None => RUNTIME_FILE.to_string(),
    }
}

///
/// Generated files for the given descriptor set, as `(name, content)` pairs.
///
/// Only files listed in `file_to_generate` produce output, but every file feeds the indices.
///
pub fn generate_files(
    files: &[FileDescriptorProto],
    file_to_generate: &[String],
    options: &PluginOptions,
) -> Result<Vec<(String, String)>, Error> {
    let ctx = Context::new(files);
    let runtime = options.runtime_tokens();
    let out = options.out.as_deref();

    let mut generated = Vec::new();
    for (index, file) in files.iter().enumerate() {
        if !file_to_generate.iter().any(|name| name == file.name()) {
            continue;
        }
        let Some(unit) = build_file(&ctx, files, index, &runtime)? else {
            continue;
        };
        tracing::debug!("generating {}", file.name());
        generated.push((output_name(&unit.source, out), render_file(&unit, &runtime)));
    }
    generated.push((runtime_name(out), render_runtime()));
    Ok(generated)
}

/// Runs the generator on a decoded plugin request.
pub fn generate(request: &CodeGeneratorRequest) -> Result<CodeGeneratorResponse, Error> {
    let options = PluginOptions::parse(request.parameter.as_deref())?;
    let files = generate_files(&request.proto_file, &request.file_to_generate, &options)?;

    Ok(CodeGeneratorResponse {
        file: files
            .into_iter()
            .map(|(name, content)| code_generator_response::File {
                name: Some(name),
                content: Some(content),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    })
}

///
/// Decodes a `CodeGeneratorRequest`, runs the generator and encodes the response.
///
/// Generation errors are reported through the response's `error` field with no files, as protoc
/// expects; only a request that cannot be decoded is returned as an `Err`.
///
pub fn run(input: &[u8]) -> Result<Vec<u8>, Error> {
    let request = CodeGeneratorRequest::decode(input)?;

    let mut response = generate(&request).unwrap_or_else(|err| {
        tracing::error!("generation failed: {}", err);
        CodeGeneratorResponse {
            error: Some(err.to_string()),
            ..Default::default()
        }
    });
    response.supported_features = Some(
        code_generator_response::Feature::Proto3Optional as u64,
    );

    let mut output = Vec::new();
    response.encode(&mut output)?;
    Ok(output)
}
