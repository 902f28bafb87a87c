mod handler;
mod model;

pub use handler::{
    create_artisan_profile, delete_artisan_profile, find_all, find_by_user, find_for_list,
    my_artisan_profile, top_artisans, update_artisan_profile,
};
pub use model::{ArtisanProfile, ArtisanProfileForDisplay, ArtisanProfileForm};
