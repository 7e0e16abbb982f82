/// A post row as stored in the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredPost {
    pub id: i64,
    pub uuid: String,
    pub url: String,
    pub author: Option<String>,
    pub published: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub language: Option<String>,
    pub sentiment: Option<String>,
    pub ord_in_thread: Option<i64>,
    pub parent_url: Option<String>,
    pub highlight_text: Option<String>,
    pub highlight_title: Option<String>,
    pub highlight_thread_title: Option<String>,
    pub crawled: Option<String>,
    pub updated: Option<String>,
    pub created_at: String,
}

/// A row from the `entities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredEntity {
    pub id: i64,
    pub post_uuid: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub name: String,
    pub sentiment: Option<String>,
}
