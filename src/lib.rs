//!
//! `resty-gen` generates REST clients for gRPC services annotated with `google.api.http`.
//!
//! Every RPC whose method carries an HTTP rule becomes an async method on a generated client.
//! The request message is split into route variables, the body, and query parameters, following
//! the gRPC transcoding rules.
//!
//! # Example
//!
//! Given this proto file:
//! ```protobuf
//! syntax = "proto3";
//! package shop.v1;
//!
//! import "google/api/annotations.proto";
//! import "google/api/field_behavior.proto";
//!
//! service ItemService {
//!     // Lists the items of a shelf.
//!     rpc ListItems(ListItemsRequest) returns (ListItemsResponse) {
//!         option (google.api.http) = { get: "/v1/shelves/{shelf}/items" };
//!     }
//! }
//!
//! message ListItemsRequest {
//!     string shelf = 1 [(google.api.field_behavior) = REQUIRED];
//!     string filter = 2;
//!     int32 page_size = 3;
//! }
//! ```
//!
//! the generator creates an `ItemClient` whose `list_items` method sends
//! ```http
//! GET {addr}/v1/shelves/{shelf}/items?filter=...&page_size=...
//! ```
//! where `filter` is only sent when it is not empty and `page_size` only when it is not zero.
//!
//! The generator runs either as a protoc plugin (`protoc-gen-resty`, see [`run`]) or from a build
//! script through [`ClientGenerator`].
//!

pub mod aggregate;
pub mod binding;
mod builder;
pub mod classify;
pub mod descriptor;
mod error;
pub mod flatten;
pub mod fragment;
pub mod ident;
pub mod index;
mod options;
pub mod path;
mod plugin;
pub mod render;
mod vercheck;

#[cfg(test)]
mod test_support;

pub use builder::ClientGenerator;
pub use error::Error;
pub use options::{PluginOptions, DEFAULT_RUNTIME_PATH};
pub use plugin::{generate, generate_files, output_name, run};
pub use vercheck::{DepError, Deps};
