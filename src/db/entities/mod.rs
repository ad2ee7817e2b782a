pub mod admin_user;
pub mod track;

pub use admin_user::Entity as AdminUser;
pub use track::Entity as Track;
