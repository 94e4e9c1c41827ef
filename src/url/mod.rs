//! URL handling module for Movie-Spider
//!
//! Movie and celebrity pages are addressed by numeric ids embedded in their
//! paths (`/subject/<id>/`, `/celebrity/<id>/`). This module converts between
//! those URLs and bare ids.

mod ids;

pub use ids::{celebrity_id_from_href, MovieSite};
