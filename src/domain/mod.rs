//! Domain types and DTOs

pub mod analysis;
pub mod documents;
pub mod draft;
pub mod files;

pub use analysis::*;
pub use documents::*;
pub use draft::*;
pub use files::*;
