use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use prost::Message;

use crate::descriptor::FileDescriptorSet;
use crate::error::Error;
use crate::options::PluginOptions;
use crate::plugin::generate_files;
use crate::vercheck::Deps;

///
/// Build-script entry point that generates the protobuf messages and their REST clients in one
/// go.
///
/// Messages are compiled by `prost-build`, with `google.protobuf` types mapped to `pbjson_types`.
/// `pbjson-build` then writes their proto3 JSON `serde` impls as `<package>.serde.rs`, so request
/// bodies and responses use the canonical JSON mapping: camelCase names, omitted defaults, enums
/// by name. The REST clients are written next to them as `<proto path>.resty.rs`, together with
/// the shared `resty_options.rs`.
///
/// The package module includes all three:
///
/// ```rust,ignore
/// pub mod v1 {
///     include!(concat!(env!("OUT_DIR"), "/shop.v1.rs"));
///     include!(concat!(env!("OUT_DIR"), "/shop.v1.serde.rs"));
///     include!(concat!(env!("OUT_DIR"), "/shop/v1/items.resty.rs"));
/// }
/// ```
///
/// # Example
///
/// ```rust,no_run
/// // build.rs
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     resty_gen::ClientGenerator::new()
///         .runtime_path("crate::rest")
///         .compile_protos(&["protos/shop/v1/items.proto"], &["protos"])?;
///     Ok(())
/// }
/// ```
///
#[derive(Debug, Clone, Default)]
pub struct ClientGenerator {
    options: PluginOptions,
    out_dir: Option<PathBuf>,
    check_dependencies: bool,
}

impl ClientGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rust path of the module that includes `resty_options.rs`.
    pub fn runtime_path(mut self, path: impl Into<String>) -> Self {
        self.options.runtime = path.into();
        self
    }

    /// Output directory; defaults to `OUT_DIR`.
    pub fn out_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(path.into());
        self
    }

    /// Verify the versions of the generated code's runtime dependencies before generating.
    pub fn check_dependencies(mut self, check: bool) -> Self {
        self.check_dependencies = check;
        self
    }

    ///
    /// The `prost_build::Config` used for the messages. It can be used on its own to compile
    /// messages that are shared with other generators.
    ///
    pub fn build_prost_config(&self) -> prost_build::Config {
        let mut config = prost_build::Config::new();
        config.extern_path(".google.protobuf", "::pbjson_types");
        if let Some(out_dir) = &self.out_dir {
            config.out_dir(out_dir);
        }
        config
    }

    pub fn compile_protos(
        self,
        protos: &[impl AsRef<Path>],
        includes: &[impl AsRef<Path>],
    ) -> Result<(), Error> {
        if self.check_dependencies {
            Deps::default().validate()?;
        }

        let out_dir = match &self.out_dir {
            Some(out_dir) => out_dir.clone(),
            None => std::env::var_os("OUT_DIR")
                .map(PathBuf::from)
                .ok_or_else(|| Error::Protoc("OUT_DIR is not set".to_string()))?,
        };

        let descriptor_path = out_dir.join("resty_descriptor_set.bin");
        run_protoc(protos, includes, &descriptor_path)?;
        let bytes = std::fs::read(&descriptor_path)?;

        let fds = prost_types::FileDescriptorSet::decode(bytes.as_slice())?;
        self.build_prost_config().out_dir(&out_dir).compile_fds(fds)?;

        let set = FileDescriptorSet::decode(bytes.as_slice())?;
        pbjson_build::Builder::new()
            .register_descriptors(&bytes)?
            .out_dir(&out_dir)
            .build(&json_packages(&set))?;

        let targets: Vec<String> = set
            .file
            .iter()
            .map(|file| file.name().to_string())
            .filter(|name| {
                protos
                    .iter()
                    .any(|proto| proto.as_ref().ends_with(Path::new(name)))
            })
            .collect();

        for (name, content) in generate_files(&set.file, &targets, &self.options)? {
            let path = out_dir.join(&name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::debug!("writing {}", path.display());
            std::fs::write(path, content)?;
        }

        for proto in protos {
            println!("cargo:rerun-if-changed={}", proto.as_ref().display());
        }
        Ok(())
    }
}

/// Package prefixes that get proto3 JSON impls: every package prost generated code for.
fn json_packages(set: &FileDescriptorSet) -> Vec<String> {
    set.file
        .iter()
        .map(|file| file.package())
        .filter(|package| !package.is_empty() && *package != "google.protobuf")
        .map(|package| format!(".{package}"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn run_protoc(
    protos: &[impl AsRef<Path>],
    includes: &[impl AsRef<Path>],
    descriptor_path: &Path,
) -> Result<(), Error> {
    let mut command = Command::new(prost_build::protoc_from_env());
    command
        .arg("--include_imports")
        .arg("--include_source_info")
        .arg("-o")
        .arg(descriptor_path);
    for include in includes {
        command.arg("-I").arg(include.as_ref());
    }
    if let Some(include) = prost_build::protoc_include_from_env() {
        command.arg("-I").arg(include);
    }
    for proto in protos {
        command.arg(proto.as_ref());
    }

    tracing::debug!("running {:?}", command);
    let output = command.output()?;
    if !output.status.success() {
        return Err(Error::Protoc(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    Ok(())
}
