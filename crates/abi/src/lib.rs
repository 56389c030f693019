pub mod resolver;

pub use resolver::{resolve_constructor, resolve_function, ResolveError};
