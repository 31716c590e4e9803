pub mod user;

pub use user::AppUser;
