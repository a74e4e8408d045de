pub const MIN_PASSWORD_LENGTH: usize = 5;
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_LINK_LENGTH: usize = 255;

pub const PRICE_MAX_DIGITS: usize = 5;
pub const PRICE_DECIMAL_PLACES: usize = 2;

pub const MAX_JSON_BODY_BYTES: u64 = 64 * 1024;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

pub const MEDIA_URL: &str = "/media/";
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

pub const TOKEN_SCHEMES: &[&str] = &["Token", "Bearer"];
