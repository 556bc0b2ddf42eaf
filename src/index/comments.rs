use std::collections::HashMap;

use crate::descriptor::{FileDescriptorProto, FILE_SERVICE_TAG, SERVICE_METHOD_TAG};

/// Synthetic identity of a commented declaration, assigned while indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decl {
    Service {
        file: usize,
        service: usize,
    },
    Method {
        file: usize,
        service: usize,
        method: usize,
    },
}

///
/// Leading comments of services and methods.
///
/// protoc reports comments as source locations whose path walks the descriptor tree as
/// `[field tag, element index, ...]`: `[6, s]` is the `s`th service of a file and `[6, s, 2, m]`
/// is the `m`th method of that service.
///
#[derive(Debug, Default)]
pub struct CommentIndex {
    comments: HashMap<Decl, String>,
}

impl CommentIndex {
    pub fn new(files: &[FileDescriptorProto]) -> Self {
        let mut comments = HashMap::new();
        for (file_index, file) in files.iter().enumerate() {
            let Some(info) = &file.source_code_info else {
                continue;
            };
            for location in &info.location {
                let Some(comment) = &location.leading_comments else {
                    continue;
                };
                let decl = match location.path.as_slice() {
                    &[FILE_SERVICE_TAG, service] => Decl::Service {
                        file: file_index,
                        service: service as usize,
                    },
                    &[FILE_SERVICE_TAG, service, SERVICE_METHOD_TAG, method] => Decl::Method {
                        file: file_index,
                        service: service as usize,
                        method: method as usize,
                    },
                    _ => continue,
                };
                comments.insert(decl, comment.clone());
            }
        }
        Self { comments }
    }

    /// Leading comment of `decl` without its final newline, or an empty string.
    pub fn get(&self, decl: Decl) -> &str {
        self.comments
            .get(&decl)
            .map(|comment| comment.strip_suffix('\n').unwrap_or(comment))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use prost_types::{source_code_info::Location, SourceCodeInfo};

    use super::*;
    use crate::test_support::*;

    fn location(path: Vec<i32>, comment: Option<&str>) -> Location {
        Location {
            path,
            leading_comments: comment.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn maps_service_and_method_comments() {
        let mut proto = file("a.proto", "a", vec![]);
        proto.service = vec![service(
            "ItemService",
            vec![method("Get", ".a.Req", ".a.Res"), method("List", ".a.Req", ".a.Res")],
        )];
        proto.source_code_info = Some(SourceCodeInfo {
            location: vec![
                location(vec![6, 0], Some(" Items.\n")),
                location(vec![6, 0, 2, 1], Some(" Lists items.\n\n")),
                location(vec![6, 0, 2, 0], None),
                location(vec![4, 0], Some(" A message.\n")),
            ],
        });

        let index = CommentIndex::new(&[proto]);

        assert_eq!(index.get(Decl::Service { file: 0, service: 0 }), " Items.");
        assert_eq!(
            index.get(Decl::Method {
                file: 0,
                service: 0,
                method: 1
            }),
            " Lists items.\n"
        );
        assert_eq!(
            index.get(Decl::Method {
                file: 0,
                service: 0,
                method: 0
            }),
            ""
        );
    }

    #[test]
    fn empty_comment_stays_empty() {
        let mut proto = file("a.proto", "a", vec![]);
        proto.source_code_info = Some(SourceCodeInfo {
            location: vec![location(vec![6, 0], Some(""))],
        });

        let index = CommentIndex::new(&[proto]);

        assert_eq!(index.get(Decl::Service { file: 0, service: 0 }), "");
    }
}
