mod handler;
mod model;

pub use handler::{create_profile, delete_profile, get_profile, update_profile};
pub use model::{Profile, ProfileForm};
