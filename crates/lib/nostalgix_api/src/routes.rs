//! Route paths.

pub const GET_HEALTHCHECK: &str = "/healthcheck";
pub const POST_AUTH_LOGIN_USERNAME: &str = "/v1/auth/login/username";
pub const POST_AUTH_LOGIN_ANONYMOUS: &str = "/v1/auth/login/anonymous";
pub const POST_AUTH_REGISTER: &str = "/v1/auth/register";
pub const POST_AUTH_REFRESH: &str = "/v1/auth/refresh";
pub const GET_AUTH_USER: &str = "/v1/auth/user";
pub const POST_AUTH_LOGOUT: &str = "/v1/auth/logout";
