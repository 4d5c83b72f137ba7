pub mod builder;
pub mod decompose;
pub mod encoding;
pub mod primitives;
pub mod utils;
