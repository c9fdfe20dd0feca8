/// API version prefix for all file routes.
pub const API_PREFIX: &str = "/api/v0";
