use std::fmt;

use crate::descriptor::{http_rule::Pattern, MethodDescriptorProto};

/// HTTP verb of a REST binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the request travels as the HTTP body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySpec {
    None,
    /// `body: "*"`
    WholeRequest,
    /// `body: "a.b"`
    Field(String),
}

/// How the body is encoded on the wire.
///
/// Besides JSON, a body may name an encoding after a comma (`body: "upload,multi"`). This is a
/// private extension of the `google.api.http` body string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    Form,
    Multipart,
    Bytes,
}

impl BodyEncoding {
    fn parse(token: &str) -> Self {
        match token.trim() {
            "json" => BodyEncoding::Json,
            "form" => BodyEncoding::Form,
            "multi" => BodyEncoding::Multipart,
            "byte" => BodyEncoding::Bytes,
            other => {
                tracing::warn!("unknown body encoding `{}`, falling back to json", other);
                BodyEncoding::Json
            }
        }
    }
}

/// Normalized `google.api.http` rule of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBinding {
    pub verb: Verb,
    pub route: String,
    pub body: BodySpec,
    pub encoding: BodyEncoding,
}

///
/// Reads the HTTP rule of `method`.
///
/// Returns `None` when the method declares no rule, or a rule without a supported pattern; the
/// caller emits the "no resty options" diagnostic in that case.
///
pub fn extract_binding(method: &MethodDescriptorProto) -> Option<HttpBinding> {
    let rule = method.options.as_ref()?.http.as_ref()?;
    let (verb, route) = match rule.pattern.as_ref()? {
        Pattern::Get(route) => (Verb::Get, route),
        Pattern::Post(route) => (Verb::Post, route),
        Pattern::Put(route) => (Verb::Put, route),
        Pattern::Patch(route) => (Verb::Patch, route),
        Pattern::Delete(route) => (Verb::Delete, route),
        Pattern::Custom(custom) => {
            tracing::warn!(
                "custom verb `{}` on `{}` is not supported",
                custom.kind,
                method.name()
            );
            return None;
        }
    };

    let (body, encoding) = parse_body(&rule.body);
    Some(HttpBinding {
        verb,
        route: route.clone(),
        body,
        encoding,
    })
}

fn parse_body(body: &str) -> (BodySpec, BodyEncoding) {
    let (path, encoding) = match body.split_once(',') {
        Some((path, encoding)) => (path, BodyEncoding::parse(encoding)),
        None => (body, BodyEncoding::Json),
    };
    let selected = match path {
        "" => BodySpec::None,
        "*" => BodySpec::WholeRequest,
        path => BodySpec::Field(path.to_string()),
    };
    (selected, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CustomHttpPattern;
    use crate::test_support::*;

    fn req() -> MethodDescriptorProto {
        method("Do", ".t.Req", ".t.Res")
    }

    #[test]
    fn no_options_means_no_binding() {
        assert_eq!(extract_binding(&req()), None);
    }

    #[test]
    fn get_without_body() {
        let binding = extract_binding(&get(req(), "/v1/items/{id}")).unwrap();
        assert_eq!(binding.verb, Verb::Get);
        assert_eq!(binding.route, "/v1/items/{id}");
        assert_eq!(binding.body, BodySpec::None);
        assert_eq!(binding.encoding, BodyEncoding::Json);
    }

    #[test]
    fn put_takes_route_from_put_pattern() {
        let method = with_rule(req(), Pattern::Put("/v1/items/{item.id}".into()), "item");
        let binding = extract_binding(&method).unwrap();
        assert_eq!(binding.verb, Verb::Put);
        assert_eq!(binding.route, "/v1/items/{item.id}");
        assert_eq!(binding.body, BodySpec::Field("item".into()));
    }

    #[test]
    fn whole_request_body() {
        let binding = extract_binding(&post(req(), "/v1/items", "*")).unwrap();
        assert_eq!(binding.body, BodySpec::WholeRequest);
        assert_eq!(binding.encoding, BodyEncoding::Json);
    }

    #[test]
    fn encoded_bodies() {
        let cases = [
            ("upload,form", BodyEncoding::Form),
            ("upload,multi", BodyEncoding::Multipart),
            ("upload,byte", BodyEncoding::Bytes),
            ("upload,json", BodyEncoding::Json),
            ("upload,xml", BodyEncoding::Json),
        ];
        for (body, expected) in cases {
            let binding = extract_binding(&post(req(), "/v1/upload", body)).unwrap();
            assert_eq!(binding.body, BodySpec::Field("upload".into()), "{body}");
            assert_eq!(binding.encoding, expected, "{body}");
        }

        let binding = extract_binding(&post(req(), "/v1/upload", "*,form")).unwrap();
        assert_eq!(binding.body, BodySpec::WholeRequest);
        assert_eq!(binding.encoding, BodyEncoding::Form);
    }

    #[test]
    fn custom_pattern_is_unsupported() {
        let method = with_rule(
            req(),
            Pattern::Custom(CustomHttpPattern {
                kind: "HEAD".into(),
                path: "/v1/items".into(),
            }),
            "",
        );
        assert_eq!(extract_binding(&method), None);
    }
}
