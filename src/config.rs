#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub reader_cookie_maxage: i64,
    pub port: u16,
    pub image_api_url: String,
    pub image_api_key: String,
    pub channel_api_url: String,
    pub frontend_url: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let reader_cookie_maxage =
            std::env::var("READER_COOKIE_MAXAGE").expect("READER_COOKIE_MAXAGE must be set");
        let image_api_url = std::env::var("IMAGE_API_URL").expect("IMAGE_API_URL must be set");
        let image_api_key = std::env::var("IMAGE_API_KEY").expect("IMAGE_API_KEY must be set");
        let channel_api_url =
            std::env::var("CHANNEL_API_URL").expect("CHANNEL_API_URL must be set");
        let frontend_url = std::env::var("FRONTEND_URL").expect("FRONTEND_URL must be set");

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            reader_cookie_maxage: reader_cookie_maxage.parse::<i64>().unwrap(),
            port: 8000,
            image_api_url,
            image_api_key,
            channel_api_url,
            frontend_url,
        }
    }
}
