//! Table definitions. Every statement is idempotent.

pub const CREATE_POSTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT UNIQUE NOT NULL,
    url TEXT NOT NULL,
    author TEXT,
    published TEXT,
    title TEXT,
    text TEXT,
    language TEXT,
    sentiment TEXT,
    ord_in_thread INTEGER,
    parent_url TEXT,
    highlight_text TEXT,
    highlight_title TEXT,
    highlight_thread_title TEXT,
    crawled TEXT,
    updated TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

// Posts from the same discussion share a thread uuid, so only post_uuid is unique.
pub const CREATE_THREADS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS threads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL,
    url TEXT NOT NULL,
    site_full TEXT,
    site TEXT,
    site_section TEXT,
    title TEXT,
    title_full TEXT,
    published TEXT,
    country TEXT,
    main_image TEXT,
    performance_score REAL,
    domain_rank INTEGER,
    post_uuid TEXT UNIQUE NOT NULL REFERENCES posts(uuid) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

pub const CREATE_CATEGORIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_uuid TEXT NOT NULL REFERENCES posts(uuid) ON DELETE CASCADE,
    category TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

pub const CREATE_ENTITIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_uuid TEXT NOT NULL REFERENCES posts(uuid) ON DELETE CASCADE,
    type TEXT NOT NULL,
    name TEXT NOT NULL,
    sentiment TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_categories_post_uuid ON categories(post_uuid)",
    "CREATE INDEX IF NOT EXISTS idx_entities_post_uuid ON entities(post_uuid)",
];
