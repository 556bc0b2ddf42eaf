use std::sync::OnceLock;

use regex::Regex;

use crate::binding::{BodySpec, HttpBinding};
use crate::error::Error;
use crate::flatten::{flatten, LeafIndex};
use crate::index::{Message, MessageIndex};
use crate::path::{resolve_path, FieldPath};

/// Matches one `{field.path}` or `{field.path=pattern}` route variable.
pub(crate) fn route_variable_regex() -> &'static Regex {
    static ROUTE_VARIABLE: OnceLock<Regex> = OnceLock::new();
    ROUTE_VARIABLE.get_or_init(|| {
        Regex::new(r"\{([a-zA-Z0-9_.]+?)(=[^{}]+)?\}").expect("route variable pattern is valid")
    })
}

/// Route variables in order of appearance, with their unexpanded `=pattern` suffix.
pub fn route_variables(route: &str) -> Vec<(String, Option<String>)> {
    route_variable_regex()
        .captures_iter(route)
        .map(|captures| {
            (
                captures[1].to_string(),
                captures
                    .get(2)
                    .map(|pattern| pattern.as_str()[1..].to_string()),
            )
        })
        .collect()
}

/// One route variable, bound to a request field.
#[derive(Debug, Clone)]
pub struct PathParam<'a> {
    pub variable: String,
    /// The `pattern` of `{variable=pattern}`, kept verbatim and never expanded.
    pub pattern: Option<String>,
    pub path: FieldPath<'a>,
}

#[derive(Debug, Clone)]
pub enum BodyParam<'a> {
    None,
    WholeRequest,
    Field(FieldPath<'a>),
}

///
/// Request fields of one method, split into what goes in the route, the body and the query
/// string. The three sets are disjoint.
///
#[derive(Debug, Clone)]
pub struct ParamClassification<'a> {
    /// In route order; a variable used twice appears twice.
    pub path_params: Vec<PathParam<'a>>,
    pub body: BodyParam<'a>,
    pub query_params: LeafIndex<'a>,
}

///
/// Classifies the fields of `request` according to `binding`.
///
/// Query parameters are all leaf fields of the request that are neither a path parameter nor
/// (part of) the body. A whole-request body leaves no query parameters.
///
pub fn classify<'a>(
    index: &'a MessageIndex,
    package: &str,
    request: &'a Message,
    binding: &HttpBinding,
) -> Result<ParamClassification<'a>, Error> {
    let path_params = route_variables(&binding.route)
        .into_iter()
        .map(|(variable, pattern)| {
            let path = resolve_path(index, package, request, &variable);
            if !path.complete {
                return Err(Error::UnresolvedPathVariable {
                    message: request.full_name.clone(),
                    variable,
                });
            }
            Ok(PathParam {
                variable,
                pattern,
                path,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let body = match &binding.body {
        BodySpec::None => BodyParam::None,
        BodySpec::WholeRequest => BodyParam::WholeRequest,
        BodySpec::Field(field) => {
            let path = resolve_path(index, package, request, field);
            if !path.complete {
                return Err(Error::UnresolvedBodyField {
                    message: request.full_name.clone(),
                    field: field.clone(),
                });
            }
            BodyParam::Field(path)
        }
    };

    let query_params = match &body {
        BodyParam::WholeRequest => LeafIndex::new(),
        BodyParam::None => without(flatten(index, request, &[]), &path_params, None),
        BodyParam::Field(path) => {
            let excluded: Vec<_> = path.terminal().map(|field| field.id).into_iter().collect();
            let body_path = path.dotted();
            without(
                flatten(index, request, &excluded),
                &path_params,
                Some(&body_path),
            )
        }
    };

    Ok(ParamClassification {
        path_params,
        body,
        query_params,
    })
}

fn without<'a>(
    mut leaves: LeafIndex<'a>,
    path_params: &[PathParam<'_>],
    body_path: Option<&str>,
) -> LeafIndex<'a> {
    for param in path_params {
        leaves.remove(&param.variable);
    }
    if let Some(body_path) = body_path {
        leaves.remove(body_path);
        let prefix = format!("{body_path}.");
        leaves.retain(|path, _| !path.starts_with(&prefix));
    }
    leaves
}

///
/// Fields of a form or multipart body: the leaves of the body message, minus the route
/// variables that point into it.
///
/// Returns the body message together with its fields.
///
pub fn classify_form<'a>(
    index: &'a MessageIndex,
    request: &'a Message,
    classification: &ParamClassification<'a>,
    encoding: &'static str,
) -> Result<Option<(&'a Message, LeafIndex<'a>)>, Error> {
    let (message, prefix) = match &classification.body {
        BodyParam::None => return Ok(None),
        BodyParam::WholeRequest => (request, String::new()),
        BodyParam::Field(path) => {
            let message = path
                .terminal()
                .filter(|field| !field.repeated)
                .and_then(|field| index.message_of(field))
                .ok_or_else(|| Error::FormBodyNotMessage {
                    message: request.full_name.clone(),
                    field: path.dotted(),
                    encoding,
                })?;
            (message, format!("{}.", path.dotted()))
        }
    };

    let mut leaves = flatten(index, message, &[]);
    for param in &classification.path_params {
        if let Some(relative) = param.variable.strip_prefix(prefix.as_str()) {
            leaves.remove(relative);
        }
    }
    Ok(Some((message, leaves)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;
    use prost_types::field_descriptor_proto::Type;

    use super::*;
    use crate::binding::{BodyEncoding, Verb};
    use crate::test_support::*;

    fn binding(verb: Verb, route: &str, body: BodySpec) -> HttpBinding {
        HttpBinding {
            verb,
            route: route.to_string(),
            body,
            encoding: BodyEncoding::Json,
        }
    }

    fn shop() -> crate::index::Context {
        context(vec![
            message(
                "ListItemsRequest",
                vec![
                    required(scalar("id", 1, Type::String)),
                    scalar("filter", 2, Type::String),
                    scalar("page", 3, Type::Int32),
                ],
            ),
            message(
                "UpdateItemRequest",
                vec![
                    message_field("item", 1, ".test.Item"),
                    message_field("update_mask", 2, ".google.protobuf.FieldMask"),
                    scalar("validate_only", 3, Type::Bool),
                ],
            ),
            message(
                "Item",
                vec![
                    scalar("name", 1, Type::String),
                    scalar("title", 2, Type::String),
                    message_field("owner", 3, ".test.Owner"),
                ],
            ),
            message("Owner", vec![scalar("email", 1, Type::String)]),
        ])
    }

    fn query_keys(classification: &ParamClassification<'_>) -> Vec<String> {
        classification.query_params.keys().cloned().collect()
    }

    #[test]
    fn route_variables_keep_patterns() {
        assert_eq!(
            route_variables("/v1/{name=projects/*}/items/{item.id}:move/{name}"),
            vec![
                ("name".to_string(), Some("projects/*".to_string())),
                ("item.id".to_string(), None),
                ("name".to_string(), None),
            ]
        );
        assert!(route_variables("/v1/items").is_empty());
    }

    #[test]
    fn path_and_query_split() {
        let ctx = shop();
        let request = ctx.messages.get(".test.ListItemsRequest").unwrap();

        let classification = classify(
            &ctx.messages,
            "test",
            request,
            &binding(Verb::Get, "/v1/items/{id}", BodySpec::None),
        )
        .unwrap();

        let vars: Vec<_> = classification
            .path_params
            .iter()
            .map(|param| param.variable.as_str())
            .collect();
        assert_eq!(vars, vec!["id"]);
        assert!(matches!(classification.body, BodyParam::None));
        assert_eq!(query_keys(&classification), vec!["filter", "page"]);
    }

    #[test]
    fn pattern_suffix_is_kept_but_not_expanded() {
        let ctx = context(vec![message(
            "GetRequest",
            vec![scalar("name", 1, Type::String)],
        )]);
        let request = ctx.messages.get(".test.GetRequest").unwrap();

        let classification = classify(
            &ctx.messages,
            "test",
            request,
            &binding(Verb::Get, "/v1/{name=projects/*}", BodySpec::None),
        )
        .unwrap();

        assert_eq!(classification.path_params.len(), 1);
        assert_eq!(classification.path_params[0].variable, "name");
        assert_eq!(
            classification.path_params[0].pattern.as_deref(),
            Some("projects/*")
        );
        assert!(classification.query_params.is_empty());
    }

    #[test]
    fn whole_request_body_has_no_query() {
        let ctx = shop();
        let request = ctx.messages.get(".test.ListItemsRequest").unwrap();

        let classification = classify(
            &ctx.messages,
            "test",
            request,
            &binding(Verb::Post, "/v1/items", BodySpec::WholeRequest),
        )
        .unwrap();

        assert!(matches!(classification.body, BodyParam::WholeRequest));
        assert!(classification.query_params.is_empty());
    }

    #[test]
    fn body_field_never_doubles_as_query() {
        let ctx = shop();
        let request = ctx.messages.get(".test.UpdateItemRequest").unwrap();

        let classification = classify(
            &ctx.messages,
            "test",
            request,
            &binding(
                Verb::Patch,
                "/v1/{item.name}",
                BodySpec::Field("item".to_string()),
            ),
        )
        .unwrap();

        match &classification.body {
            BodyParam::Field(path) => assert_eq!(path.dotted(), "item"),
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(query_keys(&classification), vec!["update_mask", "validate_only"]);
    }

    #[test]
    fn scalar_body_field_is_not_a_query_param() {
        let ctx = shop();
        let request = ctx.messages.get(".test.ListItemsRequest").unwrap();

        let classification = classify(
            &ctx.messages,
            "test",
            request,
            &binding(Verb::Post, "/v1/items/{id}", BodySpec::Field("filter".into())),
        )
        .unwrap();

        assert_eq!(query_keys(&classification), vec!["page"]);
    }

    #[test]
    fn sets_are_disjoint_and_stable() {
        let ctx = shop();
        let request = ctx.messages.get(".test.UpdateItemRequest").unwrap();
        let rule = binding(Verb::Get, "/v1/{item.name}/{item.owner.email}", BodySpec::None);

        let first = classify(&ctx.messages, "test", request, &rule).unwrap();
        let second = classify(&ctx.messages, "test", request, &rule).unwrap();

        assert_eq!(query_keys(&first), query_keys(&second));
        assert_eq!(query_keys(&first), vec!["item.title", "update_mask", "validate_only"]);

        let path: BTreeSet<_> = first
            .path_params
            .iter()
            .map(|param| param.variable.clone())
            .collect();
        let query: BTreeSet<_> = first.query_params.keys().cloned().collect();
        assert!(path.is_disjoint(&query));
    }

    #[test]
    fn unresolved_lookups_are_errors() {
        let ctx = shop();
        let request = ctx.messages.get(".test.ListItemsRequest").unwrap();

        let err = classify(
            &ctx.messages,
            "test",
            request,
            &binding(Verb::Get, "/v1/items/{missing}", BodySpec::None),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvedPathVariable { ref variable, .. } if variable == "missing"));

        let err = classify(
            &ctx.messages,
            "test",
            request,
            &binding(Verb::Post, "/v1/items", BodySpec::Field("nope".into())),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvedBodyField { .. }));
    }

    #[test]
    fn form_fields_are_scoped_to_the_body() {
        let ctx = shop();
        let request = ctx.messages.get(".test.UpdateItemRequest").unwrap();
        let classification = classify(
            &ctx.messages,
            "test",
            request,
            &binding(Verb::Post, "/v1/{item.name}", BodySpec::Field("item".into())),
        )
        .unwrap();

        let (message, fields) = classify_form(&ctx.messages, request, &classification, "form")
            .unwrap()
            .unwrap();

        assert_eq!(message.full_name, ".test.Item");
        assert_eq!(
            fields.keys().cloned().collect::<Vec<_>>(),
            vec!["owner.email", "title"]
        );
    }

    #[test]
    fn form_body_must_be_a_message() {
        let ctx = shop();
        let request = ctx.messages.get(".test.ListItemsRequest").unwrap();
        let classification = classify(
            &ctx.messages,
            "test",
            request,
            &binding(Verb::Post, "/v1/items", BodySpec::Field("filter".into())),
        )
        .unwrap();

        let err = classify_form(&ctx.messages, request, &classification, "form").unwrap_err();
        assert!(matches!(err, Error::FormBodyNotMessage { .. }));
    }
}
