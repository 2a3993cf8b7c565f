use sqlx::{Pool, Postgres};

mod user;
pub use user::UserExt;

mod article;
pub use article::ArticleExt;

mod category;
pub use category::CategoryExt;

mod engagement;
pub use engagement::EngagementExt;

/// Storage client wrapping the connection pool.
///
/// Constructed once in `main` and injected through `AppState`; nothing in the
/// crate reaches for a global connection.
#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
