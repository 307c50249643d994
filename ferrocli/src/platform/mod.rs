//! Platform definitions for multi-vendor support.
//!
//! A platform is plain data: the ready prompt, failure patterns, the
//! configuration context, in-band login prompts and the commands run when a
//! session opens or closes. Sessions take a copy of one definition out of a
//! [`PlatformTable`] at construction time.

mod definition;
mod profile;
mod table;
pub mod vendors;

pub use definition::{
    ConfigMode, DEFAULT_LOGIN_PATTERN, DEFAULT_PASSWORD_PATTERN, PlatformDefinition,
};
pub use profile::{ConfigModeProfile, PlatformProfile};
pub use table::PlatformTable;
