//!
//! Read-only lookups built once per invocation.
//!

mod comments;
mod messages;

pub use comments::{CommentIndex, Decl};
pub use messages::{
    nesting, Field, FieldId, Message, MessageId, MessageIndex, WELL_KNOWN_TYPES,
};

use crate::descriptor::FileDescriptorProto;

///
/// Everything the generator looks up while processing a request: the message index and the
/// comment index. It is constructed from all files of a request (not only the files to generate)
/// and passed by reference to every stage, so independent requests never share state.
///
#[derive(Debug, Default)]
pub struct Context {
    pub messages: MessageIndex,
    pub comments: CommentIndex,
}

impl Context {
    pub fn new(files: &[FileDescriptorProto]) -> Self {
        Self {
            messages: MessageIndex::new(files),
            comments: CommentIndex::new(files),
        }
    }
}
