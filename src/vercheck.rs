use cargo_metadata::semver::{Version, VersionReq};

///
/// [`Deps`] checks the dependencies of the crate that includes the generated clients. `resty-gen`
/// is a build-dependency, so the generated code can only assume what this check enforces.
///
/// The generated code calls into:
/// - `reqwest` (transport, with the `json` and `multipart` features)
/// - `serde_json` (bodies and well-known-type query values)
/// - `pbjson-types` (well-known types with canonical JSON encodings)
/// - `pbjson` (runtime of the `serde` impls written by `pbjson-build`)
///
pub struct Deps {
    reqwest: VersionReq,
    serde_json: VersionReq,
    pbjson_types: VersionReq,
    pbjson: VersionReq,
}

#[derive(Debug, thiserror::Error)]
pub enum DepError {
    #[error("Dependency `{name}` is absent")]
    DependencyAbsent { name: String },
    #[error("Incompatible dependency `{name}`: expected `{expected}`, found `{actual}`")]
    DependencyVersionMismatch {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("Failed to read Cargo metadata: {0}")]
    MetadataError(#[from] cargo_metadata::Error),
    #[error("Failed to parse version: {0}")]
    VersionParseError(#[from] cargo_metadata::semver::Error),
}

impl Default for Deps {
    fn default() -> Self {
        Self {
            reqwest: VersionReq::parse("^0.12").unwrap_or(VersionReq::STAR),
            serde_json: VersionReq::parse("^1").unwrap_or(VersionReq::STAR),
            pbjson_types: VersionReq::parse("^0.7").unwrap_or(VersionReq::STAR),
            pbjson: VersionReq::parse("^0.7").unwrap_or(VersionReq::STAR),
        }
    }
}

impl Deps {
    pub fn new(
        reqwest: &str,
        serde_json: &str,
        pbjson_types: &str,
        pbjson: &str,
    ) -> Result<Self, DepError> {
        Ok(Self {
            reqwest: VersionReq::parse(reqwest)?,
            serde_json: VersionReq::parse(serde_json)?,
            pbjson_types: VersionReq::parse(pbjson_types)?,
            pbjson: VersionReq::parse(pbjson)?,
        })
    }

    pub fn validate(self) -> Result<(), DepError> {
        let metadata = cargo_metadata::MetadataCommand::new().exec()?;
        let packages: Vec<(String, Version)> = metadata
            .packages
            .iter()
            .map(|pkg| (pkg.name.to_string(), pkg.version.clone()))
            .collect();
        self.check(&packages)
    }

    fn check(self, packages: &[(String, Version)]) -> Result<(), DepError> {
        let deps = [
            ("reqwest", self.reqwest),
            ("serde_json", self.serde_json),
            ("pbjson-types", self.pbjson_types),
            ("pbjson", self.pbjson),
        ];

        for (name, expected) in deps {
            let actual = &packages
                .iter()
                .find(|(pkg, _)| pkg == name)
                .ok_or_else(|| DepError::DependencyAbsent {
                    name: name.to_string(),
                })?
                .1;

            if !expected.matches(actual) {
                return Err(DepError::DependencyVersionMismatch {
                    name: name.to_string(),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packages(list: &[(&str, &str)]) -> Vec<(String, Version)> {
        list.iter()
            .map(|(name, version)| (name.to_string(), Version::parse(version).unwrap()))
            .collect()
    }

    #[test]
    fn compatible_versions_pass() {
        let found = packages(&[
            ("reqwest", "0.12.9"),
            ("serde_json", "1.0.140"),
            ("pbjson-types", "0.7.0"),
            ("pbjson", "0.7.0"),
        ]);
        assert!(Deps::default().check(&found).is_ok());
    }

    #[test]
    fn missing_and_mismatched_dependencies() {
        let found = packages(&[("reqwest", "0.12.9"), ("serde_json", "1.0.140")]);
        assert!(matches!(
            Deps::default().check(&found),
            Err(DepError::DependencyAbsent { name }) if name == "pbjson-types"
        ));

        let found = packages(&[
            ("reqwest", "0.11.27"),
            ("serde_json", "1.0.140"),
            ("pbjson-types", "0.7.0"),
            ("pbjson", "0.7.0"),
        ]);
        assert!(matches!(
            Deps::default().check(&found),
            Err(DepError::DependencyVersionMismatch { name, .. }) if name == "reqwest"
        ));
    }

    #[test]
    fn invalid_requirement_is_rejected() {
        assert!(matches!(
            Deps::new("not a version", "^1", "^0.7", "^0.7"),
            Err(DepError::VersionParseError(_))
        ));
    }
}
