//! The standard tags and filters.

mod filters;
mod tags;

use crate::registry::Library;

pub(crate) fn register(library: &mut Library) {
    tags::register(library);
    filters::register(library);
}
