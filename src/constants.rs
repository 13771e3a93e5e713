pub mod auth {

    pub const MIN_PASSWORD_LENGTH_FLOOR: usize = 8;

    pub const MAX_NAME_LENGTH: usize = 255;

    pub const MAX_EMAIL_LENGTH: usize = 255;

    pub const OTP_LENGTH: usize = 6;

    /// Random bytes per bearer token (256 bits).
    pub const TOKEN_BYTES: usize = 32;

    /// Characters of a token that may appear in logs.
    pub const TOKEN_LOG_PREFIX: usize = 8;

    pub const TOKEN_TYPE: &str = "Bearer";

    /// Largest accepted token or reset code lifetime (one hundred years).
    pub const MAX_TTL_MINUTES: i64 = 525_600 * 100;
}
