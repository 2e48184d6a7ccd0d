//! Docroot access: confining request paths and listing what is served.

pub mod listing;
pub mod resolver;

pub use listing::{ListingPage, render_listing, walk_docroot};
pub use resolver::{PathResolver, Resolved, ResolvedFile};
