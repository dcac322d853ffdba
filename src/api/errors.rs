//! `apiStatus` codes returned by the Meross cloud HTTP API.

pub const ERR_MISSING_PASSWORD: i32 = 1001;
pub const ERR_UNEXISTING_ACCOUNT: i32 = 1002;
pub const ERR_DISABLED_ACCOUNT: i32 = 1003;
pub const ERR_WRONG_CREDENTIALS: i32 = 1004;
pub const ERR_INVALID_EMAIL: i32 = 1005;
pub const ERR_BAD_PASSWORD_FORMAT: i32 = 1006;
pub const ERR_WRONG_EMAIL: i32 = 1008;
pub const ERR_TOKEN_INVALID: i32 = 1019;
pub const ERR_TOKEN_ERROR: i32 = 1022;
pub const ERR_REDIRECT_REGION: i32 = 1030;
pub const ERR_WRONG_MFA_CODE: i32 = 1032;
pub const ERR_MFA_REQUIRED: i32 = 1033;
pub const ERR_TOKEN_EXPIRED: i32 = 1200;
pub const ERR_TOO_MANY_TOKENS: i32 = 1301;

pub fn is_credentials_error(code: i32) -> bool {
    matches!(
        code,
        ERR_MISSING_PASSWORD
            | ERR_UNEXISTING_ACCOUNT
            | ERR_DISABLED_ACCOUNT
            | ERR_WRONG_CREDENTIALS
            | ERR_INVALID_EMAIL
            | ERR_BAD_PASSWORD_FORMAT
            | ERR_WRONG_EMAIL
            | ERR_WRONG_MFA_CODE
    )
}

pub fn is_token_error(code: i32) -> bool {
    matches!(
        code,
        ERR_TOKEN_INVALID | ERR_TOKEN_ERROR | ERR_TOKEN_EXPIRED | ERR_TOO_MANY_TOKENS
    )
}
