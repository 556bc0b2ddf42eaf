use proc_macro2::TokenStream;

use crate::error::Error;

/// Module path of the runtime when none is configured.
pub const DEFAULT_RUNTIME_PATH: &str = "crate::resty_options";

///
/// Options passed to the plugin as `--resty_opt=key=value,key=value`.
///
/// - `out`: directory prepended to every generated file name.
/// - `runtime`: Rust path of the module that includes `resty_options.rs`.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOptions {
    pub out: Option<String>,
    pub runtime: String,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            out: None,
            runtime: DEFAULT_RUNTIME_PATH.to_string(),
        }
    }
}

impl PluginOptions {
    pub fn parse(parameter: Option<&str>) -> Result<Self, Error> {
        let mut options = Self::default();
        let Some(parameter) = parameter else {
            return Ok(options);
        };

        for pair in parameter.split(',').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::OptionFormat(pair.to_string()))?;
            if value.is_empty() {
                return Err(Error::OptionValue(pair.to_string()));
            }
            match key {
                "out" => options.out = Some(value.to_string()),
                "runtime" => options.runtime = value.to_string(),
                other => tracing::warn!("ignoring unknown plugin option `{}`", other),
            }
        }
        Ok(options)
    }

    /// The runtime path as tokens; an unparsable path falls back to the default.
    pub fn runtime_tokens(&self) -> TokenStream {
        self.runtime.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "runtime path `{}` is not a Rust path, using `{}`",
                self.runtime,
                DEFAULT_RUNTIME_PATH
            );
            DEFAULT_RUNTIME_PATH
                .parse()
                .unwrap_or_else(|_| TokenStream::new())
        })
    }
}
