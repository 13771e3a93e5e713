pub use super::auth_tokens::Entity as AuthTokens;
pub use super::password_reset_otps::Entity as PasswordResetOtps;
pub use super::users::Entity as Users;
