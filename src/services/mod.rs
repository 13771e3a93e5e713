pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{
    AuthError, AuthService, AuthSession, ForgotPasswordInput, LoginInput, ResetPasswordInput,
    SignupInput, UpdateProfileInput, UserInfo,
};
pub use auth_service_impl::SeaOrmAuthService;

pub mod mailer;
pub use mailer::{EmailSender, LogEmailSender, PasswordResetEmail};

pub mod otp;
pub use otp::OtpService;

pub mod tokens;
pub use tokens::{AuthContext, IssuedToken, TokenError, TokenService};

pub mod validation;
pub use validation::FieldErrors;
