//! Session storage key names shared by the shell and every micro-frontend.

pub const JWT_TOKEN: &str = "jwt_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const USER_INFO: &str = "user_info";
pub const USER_PERMISSIONS: &str = "user_permissions";
pub const REDIRECT_URL: &str = "redirectUrl";
pub const CUSTOMER_ID: &str = "customerId";
pub const ACCOUNT_ID: &str = "accountId";
pub const LOADING: &str = "loading";

/// Keys removed when the session ends.
///
/// `redirectUrl` and `loading` are navigation state and survive logout.
pub const AUTH_DATA: &[&str] = &[
    CUSTOMER_ID,
    ACCOUNT_ID,
    JWT_TOKEN,
    REFRESH_TOKEN,
    USER_INFO,
    USER_PERMISSIONS,
];
