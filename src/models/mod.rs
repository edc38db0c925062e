// Re-export all models from their respective modules
pub mod block;
pub mod bug_version;
pub mod cache;
pub mod dist;
pub mod download;
pub mod maintainer;
pub mod manifest;
pub mod package;
pub mod package_tag;

// Re-export commonly used models
pub use block::*;
pub use bug_version::*;
pub use cache::*;
pub use dist::*;
pub use download::*;
pub use maintainer::*;
pub use manifest::*;
pub use package::*;
pub use package_tag::*;
