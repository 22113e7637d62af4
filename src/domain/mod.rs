//! Domain layer types: CMS documents and the portable rich text model.

pub mod entities;
pub mod portable_text;
pub mod slug;
