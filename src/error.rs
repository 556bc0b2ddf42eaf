use crate::vercheck::DepError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid plugin option format, must be key=value: {0}")]
    OptionFormat(String),
    #[error("invalid plugin option value, missing value in key=value: {0}")]
    OptionValue(String),
    #[error("request message `{message}` of method `{method}` is not in the descriptor set")]
    UnknownMessage { method: String, message: String },
    #[error("route variable `{variable}` does not name a field of `{message}`")]
    UnresolvedPathVariable { message: String, variable: String },
    #[error("body `{field}` does not name a field of `{message}`")]
    UnresolvedBodyField { message: String, field: String },
    #[error("body `{field}` of `{message}` must be a message to be sent as {encoding}")]
    FormBodyNotMessage {
        message: String,
        field: String,
        encoding: &'static str,
    },
    #[error("body `{field}` of `{message}` cannot be sent as raw bytes")]
    RawBodyType { message: String, field: String },
    #[error("method `{method}`: {source}")]
    Method {
        method: String,
        #[source]
        source: Box<Error>,
    },
    #[error("Failed to decode code generator input: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Failed to encode code generator response: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("protoc failed: {0}")]
    Protoc(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Dependency(#[from] DepError),
}
