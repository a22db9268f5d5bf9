// src/resolve/mod.rs

//! Input resolvers: turn declarative patterns and queries into concrete
//! absolute file paths.
//!
//! All resolvers share the same contract:
//! - an empty declaration list resolves to nothing,
//! - a non-optional pattern that matches no file is a [`NoMatch`] error,
//!   an optional one silently yields nothing,
//! - only regular files are returned,
//! - the matches of one pattern are sorted by path.
//!
//! [`NoMatch`]: crate::errors::TaskgateError::NoMatch

pub mod gitpath;
pub mod glob;
pub mod gosource;

pub use gitpath::GitPathResolver;
pub use glob::GlobResolver;
pub use gosource::{GoListCommand, GoPackage, GoSourceResolver, PackageLister};
