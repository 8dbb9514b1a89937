pub mod memory;
pub mod queries;
pub mod sqlite;
#[cfg(test)]
pub mod testing;

use crate::config::{Config, StorageBackend};
use crate::icons::Icon;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub count: u32,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewActivity {
    pub date: NaiveDate,
    pub count: u32,
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub alias: Option<String>,
    pub avatar: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
    pub personality_type: Option<String>,
    pub personality_title: Option<String>,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    pub alias: Option<String>,
    pub avatar: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
    pub personality_type: Option<String>,
    pub personality_title: Option<String>,
    pub owner_id: Option<i64>,
}

/// Partial profile update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub alias: Option<String>,
    pub avatar: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
    pub personality_type: Option<String>,
    pub personality_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub icon_background: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub icon_background: String,
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStack {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub background: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTechStack {
    pub name: String,
    pub icon: String,
    pub background: String,
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInterest {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub owner_id: Option<i64>,
}

/// Message left through the contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Reader comment on a post. Hidden until approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub content: String,
}

impl Project {
    pub fn icon_kind(&self) -> Icon {
        Icon::parse(&self.icon)
    }
}

impl TechStack {
    pub fn icon_kind(&self) -> Icon {
        Icon::parse(&self.icon)
    }
}

impl Interest {
    pub fn icon_kind(&self) -> Icon {
        Icon::parse(&self.icon)
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("invalid {field}: {message}")]
    Constraint { field: String, message: String },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn constraint(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Constraint {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Persistence boundary shared by the HTTP handlers, the ingestion pipeline
/// and the CLI. Each call is atomic on its own; callers never rely on
/// multi-call transactions.
pub trait Repository: Send + Sync {
    fn backend_name(&self) -> &'static str;

    fn create_post(&self, post: NewPost) -> RepoResult<Post>;
    /// Newest first.
    fn list_posts(&self) -> RepoResult<Vec<Post>>;
    fn get_post(&self, id: i64) -> RepoResult<Option<Post>>;

    /// Ordered by date ascending.
    fn list_activities(&self, owner_id: Option<i64>) -> RepoResult<Vec<ActivityRecord>>;
    fn create_activity(&self, activity: NewActivity) -> RepoResult<ActivityRecord>;
    /// Drops the owner's records dated within `[from, to]` and inserts `activities`.
    fn replace_activities(
        &self,
        owner_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        activities: &[NewActivity],
    ) -> RepoResult<usize>;

    fn profile(&self) -> RepoResult<Option<Profile>>;
    fn create_profile(&self, profile: NewProfile, owner_id: i64) -> RepoResult<Profile>;
    fn update_profile(&self, id: i64, patch: ProfilePatch) -> RepoResult<Profile>;

    fn list_projects(&self) -> RepoResult<Vec<Project>>;
    fn get_project(&self, id: i64) -> RepoResult<Option<Project>>;
    fn create_project(&self, project: NewProject, owner_id: i64) -> RepoResult<Project>;

    fn list_tech_stacks(&self) -> RepoResult<Vec<TechStack>>;
    fn create_tech_stack(&self, tech_stack: NewTechStack, owner_id: i64) -> RepoResult<TechStack>;

    fn list_interests(&self) -> RepoResult<Vec<Interest>>;
    fn create_interest(&self, interest: NewInterest, owner_id: i64) -> RepoResult<Interest>;

    /// Oldest first.
    fn list_contacts(&self) -> RepoResult<Vec<Contact>>;
    fn get_contact(&self, id: i64) -> RepoResult<Option<Contact>>;
    fn create_contact(&self, contact: NewContact) -> RepoResult<Contact>;
    fn mark_contact_read(&self, id: i64) -> RepoResult<Contact>;

    /// Oldest first, across every post.
    fn list_comments(&self) -> RepoResult<Vec<Comment>>;
    fn list_post_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>>;
    /// Fails with a `postId` constraint error when the post does not exist.
    fn create_comment(&self, comment: NewComment) -> RepoResult<Comment>;
    fn approve_comment(&self, id: i64) -> RepoResult<Comment>;
}

pub fn open_repository(config: &Config) -> Result<Arc<dyn Repository>> {
    let repository: Arc<dyn Repository> = match config.storage {
        StorageBackend::Sqlite => Arc::new(SqliteRepository::open(&config.db_path)?),
        StorageBackend::Memory => Arc::new(MemoryRepository::new()),
    };

    Ok(repository)
}

impl NewPost {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)?;
        if let Some(url) = &self.image_url {
            require_text("imageUrl", url)?;
        }
        Ok(())
    }
}

impl NewProfile {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("name", &self.name)?;
        validate_link("github", self.github.as_deref())?;
        validate_link("website", self.website.as_deref())
    }
}

impl ProfilePatch {
    pub fn validate(&self) -> RepoResult<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        validate_link("github", self.github.as_deref())?;
        validate_link("website", self.website.as_deref())
    }

    pub fn apply(self, profile: &mut Profile) {
        let Self {
            name,
            alias,
            avatar,
            github,
            website,
            personality_type,
            personality_title,
        } = self;

        if let Some(value) = name {
            profile.name = value.trim().to_string();
        }
        [
            (alias, &mut profile.alias),
            (avatar, &mut profile.avatar),
            (github, &mut profile.github),
            (website, &mut profile.website),
            (personality_type, &mut profile.personality_type),
            (personality_title, &mut profile.personality_title),
        ]
        .into_iter()
        .for_each(|(value, slot)| {
            if let Some(value) = value {
                *slot = blank_to_none(value);
            }
        });
    }
}

impl NewProject {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("icon", &self.icon)?;
        require_text("iconBackground", &self.icon_background)
    }
}

impl NewTechStack {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("name", &self.name)?;
        require_text("icon", &self.icon)?;
        require_text("background", &self.background)
    }
}

impl NewInterest {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("icon", &self.icon)
    }
}

impl NewContact {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("name", &self.name)?;
        validate_email("email", &self.email)?;
        require_text("subject", &self.subject)?;
        require_text("message", &self.message)
    }
}

impl NewComment {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("name", &self.name)?;
        validate_email("email", &self.email)?;
        require_text("content", &self.content)
    }
}

fn require_text(field: &str, value: &str) -> RepoResult<()> {
    if value.trim().is_empty() {
        return Err(RepositoryError::constraint(field, "must not be blank"));
    }
    Ok(())
}

fn validate_link(field: &str, value: Option<&str>) -> RepoResult<()> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(());
    };

    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(RepositoryError::constraint(
            field,
            "must be an absolute http(s) URL",
        )),
    }
}

fn validate_email(field: &str, value: &str) -> RepoResult<()> {
    let valid = value
        .trim()
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !domain.contains('@')
                && !local.chars().chain(domain.chars()).any(char::is_whitespace)
        });

    if valid {
        Ok(())
    } else {
        Err(RepositoryError::constraint(field, "must be an email address"))
    }
}

pub(crate) fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
