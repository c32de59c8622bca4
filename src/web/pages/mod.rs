//! Page templates using maud.

mod profile;

pub use profile::render_profile;
