use std::collections::BTreeMap;

use crate::index::{Field, FieldId, Message, MessageIndex};

/// Dotted path to leaf field, relative to one message. Iteration is in lexical path order.
pub type LeafIndex<'a> = BTreeMap<String, &'a Field>;

///
/// Returns every leaf field of `message`, keyed by its dotted path from `message`.
///
/// A leaf is a non-message field or a well-known-type field. For a message like
///
/// ```protobuf
/// message Mollusc {
///     message Squid {
///         message Mantle {
///             int32 mass_kg = 1;
///         }
///         Mantle mantle = 1;
///     }
///     Squid squid = 1;
/// }
/// ```
///
/// the one entry is `squid.mantle.mass_kg`.
///
/// Message fields are descended unless they are repeated (no transcoding exists for lists of
/// objects), listed in `excluded`, or already on the descent stack. Such fields are dropped, they
/// never become leaves.
///
pub fn flatten<'a>(
    index: &'a MessageIndex,
    message: &'a Message,
    excluded: &[FieldId],
) -> LeafIndex<'a> {
    let mut leaves = LeafIndex::new();
    let mut stack = Vec::new();
    descend(index, message, excluded, &mut stack, &mut leaves);
    leaves
}

fn descend<'a>(
    index: &'a MessageIndex,
    message: &'a Message,
    excluded: &[FieldId],
    stack: &mut Vec<&'a Field>,
    leaves: &mut LeafIndex<'a>,
) {
    for field in &message.fields {
        if !field.is_message() || field.is_well_known() {
            leaves.insert(path_of(stack, field), field);
            continue;
        }
        if !should_descend(field, excluded, stack) {
            continue;
        }
        let Some(nested) = index.message_of(field) else {
            tracing::warn!(
                "message `{}` of field `{}` is not in the descriptor set",
                field.type_name.as_deref().unwrap_or_default(),
                path_of(stack, field)
            );
            continue;
        };
        stack.push(field);
        descend(index, nested, excluded, stack, leaves);
        stack.pop();
    }
}

/// The cycle guard compares field identity, not message identity: a self-referencing field
/// stops at its second occurrence, while sibling fields of the same type are still walked.
fn should_descend(field: &Field, excluded: &[FieldId], stack: &[&Field]) -> bool {
    !field.repeated
        && !excluded.contains(&field.id)
        && !stack.iter().any(|ancestor| ancestor.id == field.id)
}

fn path_of(stack: &[&Field], field: &Field) -> String {
    stack
        .iter()
        .map(|ancestor| ancestor.name.as_str())
        .chain(std::iter::once(field.name.as_str()))
        .collect::<Vec<_>>()
        .join(".")
}
