pub mod prelude;

pub mod auth_tokens;
pub mod password_reset_otps;
pub mod users;
