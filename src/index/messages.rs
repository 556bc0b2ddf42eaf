use std::collections::HashMap;

use prost_types::field_descriptor_proto::{Label, Type};

use crate::descriptor::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

/// Well-known types with bespoke JSON encodings. They are opaque leaves: never descended into,
/// always serialized to JSON before being sent.
pub const WELL_KNOWN_TYPES: &[&str] = &[
    ".google.protobuf.FieldMask",
    ".google.protobuf.Timestamp",
    ".google.protobuf.Duration",
    ".google.protobuf.DoubleValue",
    ".google.protobuf.FloatValue",
    ".google.protobuf.Int64Value",
    ".google.protobuf.UInt64Value",
    ".google.protobuf.Int32Value",
    ".google.protobuf.UInt32Value",
    ".google.protobuf.BoolValue",
    ".google.protobuf.StringValue",
    ".google.protobuf.BytesValue",
    ".google.protobuf.Value",
    ".google.protobuf.ListValue",
    ".google.protobuf.Struct",
];

/// Position of a message in the [`MessageIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(usize);

/// Identity of a field: the message that declares it and its position in that message.
///
/// Two fields compare equal only if they are the same declaration, which is what the descent
/// stack of the flattener relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub message: MessageId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub kind: Type,
    pub repeated: bool,
    /// Fully qualified type name (`.pkg.Message`) for message and enum fields.
    pub type_name: Option<String>,
    /// Declared with the proto3 `optional` keyword.
    pub proto3_optional: bool,
    /// Annotated with `(google.api.field_behavior) = REQUIRED`.
    pub required: bool,
    /// Name of the `oneof` this field belongs to. Synthetic oneofs of proto3 `optional` fields
    /// are not recorded.
    pub oneof: Option<String>,
}

impl Field {
    pub fn is_message(&self) -> bool {
        self.kind == Type::Message || self.kind == Type::Group
    }

    pub fn is_well_known(&self) -> bool {
        self.type_name
            .as_deref()
            .is_some_and(|name| WELL_KNOWN_TYPES.contains(&name))
    }

    /// Singular field that is neither a message nor bytes.
    pub fn is_singular_primitive(&self) -> bool {
        !self.is_message() && self.kind != Type::Bytes && !self.repeated
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, Type::Float | Type::Double)
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    /// Fully qualified name with the leading dot, as protoc writes type references.
    pub full_name: String,
    /// Proto package of the declaring file, empty when the file has none.
    pub package: String,
    pub fields: Vec<Field>,
}

impl Message {
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Message names from the package down to this message, e.g. `["Outer", "Inner"]`.
    pub fn nesting(&self) -> Vec<&str> {
        nesting(&self.full_name, &self.package)
    }
}

/// Declaration names below `package` in `full_name`: `.shop.v1.Outer.Inner` -> `["Outer", "Inner"]`.
pub fn nesting<'a>(full_name: &'a str, package: &str) -> Vec<&'a str> {
    let name = full_name.trim_start_matches('.');
    name.strip_prefix(package)
        .unwrap_or(name)
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect()
}

///
/// Index of every message in a compile unit, keyed by fully qualified name.
///
/// The index is built from the transitive closure of the request, not only from the files to
/// generate, because services routinely use messages declared in imported files.
///
#[derive(Debug, Default)]
pub struct MessageIndex {
    messages: Vec<Message>,
    by_name: HashMap<String, MessageId>,
    /// Enum name to the package of its file.
    enums: HashMap<String, String>,
}

impl MessageIndex {
    pub fn new(files: &[FileDescriptorProto]) -> Self {
        let mut index = Self::default();
        for file in files {
            let package = file.package().to_string();
            let prefix = if package.is_empty() {
                String::new()
            } else {
                format!(".{package}")
            };
            for message in &file.message_type {
                index.insert(&prefix, &package, message);
            }
            for decl in &file.enum_type {
                index.insert_enum(&prefix, &package, decl.name());
            }
        }
        index
    }

    fn insert(&mut self, prefix: &str, package: &str, message: &DescriptorProto) {
        let full_name = format!("{prefix}.{}", message.name());
        let id = MessageId(self.messages.len());
        let fields = message
            .field
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let oneof = field
                    .oneof_index
                    .filter(|_| !field.proto3_optional())
                    .and_then(|oneof| message.oneof_decl.get(oneof as usize))
                    .map(|decl| decl.name().to_string());
                Self::build_field(FieldId { message: id, index }, field, oneof)
            })
            .collect();

        self.by_name.insert(full_name.clone(), id);
        self.messages.push(Message {
            id,
            full_name: full_name.clone(),
            package: package.to_string(),
            fields,
        });

        for nested in &message.nested_type {
            self.insert(&full_name, package, nested);
        }
        for decl in &message.enum_type {
            self.insert_enum(&full_name, package, decl.name());
        }
    }

    fn insert_enum(&mut self, prefix: &str, package: &str, name: &str) {
        self.enums.insert(format!("{prefix}.{name}"), package.to_string());
    }

    fn build_field(id: FieldId, field: &FieldDescriptorProto, oneof: Option<String>) -> Field {
        Field {
            id,
            name: field.name().to_string(),
            kind: field.r#type(),
            repeated: field.label() == Label::Repeated,
            type_name: field.type_name.clone(),
            proto3_optional: field.proto3_optional(),
            required: field.is_required(),
            oneof,
        }
    }

    pub fn get(&self, full_name: &str) -> Option<&Message> {
        self.by_name.get(full_name).map(|id| &self.messages[id.0])
    }

    /// Package of the message or enum `full_name`.
    pub fn package_of(&self, full_name: &str) -> Option<&str> {
        match self.get(full_name) {
            Some(message) => Some(message.package.as_str()),
            None => self.enums.get(full_name).map(String::as_str),
        }
    }

    pub fn message(&self, id: MessageId) -> &Message {
        &self.messages[id.0]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.messages[id.message.0].fields[id.index]
    }

    /// Message type of a message-typed field, if it is part of the compile unit.
    pub fn message_of(&self, field: &Field) -> Option<&Message> {
        if !field.is_message() {
            return None;
        }
        field.type_name.as_deref().and_then(|name| self.get(name))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn indexes_nested_messages_across_files() {
        let outer = message(
            "Outer",
            vec![message_field("inner", 1, ".shop.v1.Outer.Inner")],
        )
        .nested(message("Inner", vec![scalar("id", 1, Type::String)]));
        let files = vec![
            file("shop.proto", "shop.v1", vec![outer]),
            file("common.proto", "common", vec![message("Money", vec![])]),
        ];

        let index = MessageIndex::new(&files);

        assert_eq!(index.len(), 3);
        let inner = index.get(".shop.v1.Outer.Inner").expect("nested message");
        assert_eq!(inner.package, "shop.v1");
        assert_eq!(inner.nesting(), vec!["Outer", "Inner"]);
        assert!(index.get(".common.Money").is_some());
        assert!(index.get(".shop.v1.Missing").is_none());
    }

    #[test]
    fn field_identity_is_per_declaration() {
        let files = vec![file(
            "a.proto",
            "a",
            vec![
                message("A", vec![scalar("name", 1, Type::String)]),
                message("B", vec![scalar("name", 1, Type::String)]),
            ],
        )];
        let index = MessageIndex::new(&files);

        let a = index.get(".a.A").unwrap().fields[0].id;
        let b = index.get(".a.B").unwrap().fields[0].id;
        assert_ne!(a, b);
        assert_eq!(index.field(a).name, "name");
    }

    #[test]
    fn well_known_and_required_flags() {
        let files = vec![file(
            "a.proto",
            "a",
            vec![message(
                "A",
                vec![
                    message_field("at", 1, ".google.protobuf.Timestamp"),
                    required(scalar("id", 2, Type::String)),
                    repeated(scalar("tags", 3, Type::String)),
                ],
            )],
        )];
        let index = MessageIndex::new(&files);
        let message = index.get(".a.A").unwrap();

        assert!(message.fields[0].is_well_known());
        assert!(!message.fields[0].is_singular_primitive());
        assert!(message.fields[1].required);
        assert!(message.fields[1].is_singular_primitive());
        assert!(message.fields[2].repeated);
        assert!(index.message_of(&message.fields[0]).is_none());
    }

    #[test]
    fn records_real_oneofs_only() {
        let find = with_oneof(
            message(
                "FindRequest",
                vec![optional(scalar("limit", 1, Type::Int32))],
            ),
            "key",
            vec![
                scalar("by_id", 2, Type::Int64),
                scalar("by_name", 3, Type::String),
            ],
        )
        .with_enum("Order");
        let files = vec![file("a.proto", "a", vec![find]).with_enum("State")];
        let index = MessageIndex::new(&files);
        let find = index.get(".a.FindRequest").unwrap();

        assert_eq!(find.fields[0].oneof, None);
        assert_eq!(find.fields[1].oneof.as_deref(), Some("key"));
        assert_eq!(find.fields[2].oneof.as_deref(), Some("key"));
        assert_eq!(index.package_of(".a.State"), Some("a"));
        assert_eq!(index.package_of(".a.FindRequest.Order"), Some("a"));
        assert_eq!(index.package_of(".a.Missing"), None);
        assert_eq!(nesting(".a.FindRequest.Order", "a"), vec!["FindRequest", "Order"]);
    }
}
