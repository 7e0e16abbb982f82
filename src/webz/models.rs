use serde::Deserialize;

/// One page of results from the news search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebzResponse {
    pub posts: Vec<Post>,
    pub total_results: u64,
    /// Number of results still available after this page.
    pub more_results_available: u64,
    /// Path-relative URL of the next page, when there is one.
    pub next: Option<String>,
    pub requests_left: Option<i64>,
    pub warnings: Option<String>,
}

impl WebzResponse {
    /// The continuation link, if the API says more results exist.
    #[must_use]
    pub fn next_page(&self) -> Option<&str> {
        if self.more_results_available == 0 {
            return None;
        }
        self.next.as_deref().filter(|next| !next.is_empty())
    }
}

/// A single news post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Post {
    pub uuid: String,
    #[serde(default)]
    pub url: String,
    pub thread: Option<Thread>,
    pub ord_in_thread: Option<i64>,
    pub parent_url: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "highlightText")]
    pub highlight_text: Option<String>,
    #[serde(rename = "highlightTitle")]
    pub highlight_title: Option<String>,
    #[serde(rename = "highlightThreadTitle")]
    pub highlight_thread_title: Option<String>,
    pub language: Option<String>,
    pub sentiment: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub external_links: Vec<String>,
    #[serde(default)]
    pub external_images: Vec<String>,
    pub entities: Option<Entities>,
    pub rating: Option<serde_json::Value>,
    pub crawled: Option<String>,
    pub updated: Option<String>,
}

/// Site and discussion metadata for the thread a post belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Thread {
    pub uuid: String,
    pub url: String,
    pub site_full: Option<String>,
    pub site: Option<String>,
    pub site_section: Option<String>,
    pub site_categories: Vec<String>,
    pub section_title: Option<String>,
    pub title: Option<String>,
    pub title_full: Option<String>,
    pub published: Option<String>,
    pub replies_count: Option<i64>,
    pub participants_count: Option<i64>,
    pub site_type: Option<String>,
    pub country: Option<String>,
    pub main_image: Option<String>,
    pub performance_score: Option<f64>,
    pub domain_rank: Option<i64>,
    pub domain_rank_updated: Option<String>,
    pub social: Option<serde_json::Value>,
}

/// Named mentions extracted from a post, grouped by kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Entities {
    pub persons: Vec<Entity>,
    pub organizations: Vec<Entity>,
    pub locations: Vec<Entity>,
}

impl Entities {
    /// All entities tagged with their kind, persons first, then organizations, then locations.
    pub fn tagged(&self) -> impl Iterator<Item = (EntityKind, &Entity)> {
        let persons = self.persons.iter().map(|e| (EntityKind::Person, e));
        let organizations = self
            .organizations
            .iter()
            .map(|e| (EntityKind::Organization, e));
        let locations = self.locations.iter().map(|e| (EntityKind::Location, e));
        persons.chain(organizations).chain(locations)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub name: String,
    pub sentiment: Option<String>,
}

/// Kind of a named entity, as stored in the `entities.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Person,
    Organization,
    Location,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
        }
    }
}
