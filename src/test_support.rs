//! Descriptor builders shared by the unit tests.

use prost_types::field_descriptor_proto::{Label, Type};

use crate::descriptor::{
    http_rule::Pattern, DescriptorProto, EnumDescriptorProto, FieldBehavior,
    FieldDescriptorProto, FieldOptions, FileDescriptorProto, HttpRule, MethodDescriptorProto,
    MethodOptions, OneofDescriptorProto, ServiceDescriptorProto,
};
use crate::index::Context;

pub fn file(name: &str, package: &str, messages: Vec<DescriptorProto>) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        message_type: messages,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub trait Nested {
    fn nested(self, message: DescriptorProto) -> Self;
}

impl Nested for DescriptorProto {
    fn nested(mut self, message: DescriptorProto) -> Self {
        self.nested_type.push(message);
        self
    }
}

/// Declares an enum named `name` in a file or message.
pub trait Enums {
    fn with_enum(self, name: &str) -> Self;
}

impl Enums for DescriptorProto {
    fn with_enum(mut self, name: &str) -> Self {
        self.enum_type.push(EnumDescriptorProto {
            name: Some(name.to_string()),
        });
        self
    }
}

impl Enums for FileDescriptorProto {
    fn with_enum(mut self, name: &str) -> Self {
        self.enum_type.push(EnumDescriptorProto {
            name: Some(name.to_string()),
        });
        self
    }
}

/// Adds the `oneof` named `name` with `members` to `message`.
pub fn with_oneof(
    mut message: DescriptorProto,
    name: &str,
    members: Vec<FieldDescriptorProto>,
) -> DescriptorProto {
    let index = message.oneof_decl.len() as i32;
    message.oneof_decl.push(OneofDescriptorProto {
        name: Some(name.to_string()),
    });
    message
        .field
        .extend(members.into_iter().map(|mut field| {
            field.oneof_index = Some(index);
            field
        }));
    message
}

pub fn scalar(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        ..Default::default()
    }
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

pub fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Enum)
    }
}

pub fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

/// A proto3 `optional` field; protoc wraps it in a synthetic oneof of its own.
pub fn optional(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.proto3_optional = Some(true);
    field.oneof_index = Some(0);
    field
}

pub fn required(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.options = Some(FieldOptions {
        field_behavior: vec![FieldBehavior::Required as i32],
    });
    field
}

pub fn service(name: &str, methods: Vec<MethodDescriptorProto>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods,
    }
}

pub fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

pub fn with_rule(mut method: MethodDescriptorProto, pattern: Pattern, body: &str) -> MethodDescriptorProto {
    method.options = Some(MethodOptions {
        http: Some(HttpRule {
            pattern: Some(pattern),
            body: body.to_string(),
            ..Default::default()
        }),
    });
    method
}

pub fn get(method: MethodDescriptorProto, route: &str) -> MethodDescriptorProto {
    with_rule(method, Pattern::Get(route.to_string()), "")
}

pub fn post(method: MethodDescriptorProto, route: &str, body: &str) -> MethodDescriptorProto {
    with_rule(method, Pattern::Post(route.to_string()), body)
}

pub fn context(messages: Vec<DescriptorProto>) -> Context {
    Context::new(&[file("test.proto", "test", messages)])
}
