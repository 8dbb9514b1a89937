use super::queries::{self, COMMENT_COLUMNS, CONTACT_COLUMNS, POST_COLUMNS, PROFILE_COLUMNS};
use super::{
    ActivityRecord, Comment, Contact, Interest, NewActivity, NewComment, NewContact, NewInterest,
    NewPost, NewProfile, NewProject, NewTechStack, Post, Profile, ProfilePatch, Project,
    RepoResult, Repository, RepositoryError, TechStack, blank_to_none,
};
use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn insert_post(&self, post: &NewPost) -> RepoResult<Post> {
        let created_at = Utc::now();
        let title = post.title.trim();

        self.conn
            .execute(
                "INSERT INTO posts (title, content, image_url, created_at, owner_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![title, post.content, post.image_url, created_at, post.owner_id],
            )
            .map_err(|error| storage_error(error, "insert post"))?;

        Ok(Post {
            id: self.conn.last_insert_rowid(),
            title: title.to_string(),
            content: post.content.clone(),
            image_url: post.image_url.clone(),
            created_at,
            owner_id: post.owner_id,
        })
    }

    pub fn posts(&self) -> RepoResult<Vec<Post>> {
        let mut statement = self
            .conn
            .prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
            ))
            .map_err(|error| storage_error(error, "prepare post listing"))?;

        let rows = statement
            .query_map([], post_from_row)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|error| storage_error(error, "list posts"))?;

        Ok(rows)
    }

    pub fn post(&self, id: i64) -> RepoResult<Option<Post>> {
        self.conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                post_from_row,
            )
            .optional()
            .map_err(|error| storage_error(error, "load post"))
    }

    pub fn activities(&self, owner_id: Option<i64>) -> RepoResult<Vec<ActivityRecord>> {
        let mut statement = self
            .conn
            .prepare(
                "SELECT id, date, count, owner_id
                 FROM activities
                 WHERE ?1 IS NULL OR owner_id = ?1
                 ORDER BY date ASC, id ASC",
            )
            .map_err(|error| storage_error(error, "prepare activity listing"))?;

        let rows = statement
            .query_map(params![owner_id], |row| {
                Ok(ActivityRecord {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    count: row.get(2)?,
                    owner_id: row.get(3)?,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|error| storage_error(error, "list activities"))?;

        Ok(rows)
    }

    pub fn insert_activity(&self, activity: &NewActivity) -> RepoResult<ActivityRecord> {
        self.conn
            .execute(
                "INSERT INTO activities (date, count, owner_id) VALUES (?1, ?2, ?3)",
                params![activity.date, activity.count, activity.owner_id],
            )
            .map_err(|error| storage_error(error, "insert activity"))?;

        Ok(ActivityRecord {
            id: self.conn.last_insert_rowid(),
            date: activity.date,
            count: activity.count,
            owner_id: activity.owner_id,
        })
    }

    pub fn replace_activities_between(
        &mut self,
        owner_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        activities: &[NewActivity],
    ) -> RepoResult<usize> {
        let transaction = self
            .conn
            .transaction()
            .map_err(|error| storage_error(error, "start transaction"))?;

        transaction
            .execute(
                "DELETE FROM activities WHERE owner_id = ?1 AND date >= ?2 AND date <= ?3",
                params![owner_id, from, to],
            )
            .map_err(|error| storage_error(error, "delete existing activities"))?;

        activities.iter().try_for_each(|activity| {
            transaction
                .execute(
                    "INSERT INTO activities (date, count, owner_id) VALUES (?1, ?2, ?3)",
                    params![activity.date, activity.count, activity.owner_id],
                )
                .map(|_| ())
                .map_err(|error| storage_error(error, "insert activity"))
        })?;

        transaction
            .commit()
            .map_err(|error| storage_error(error, "commit activities"))?;

        Ok(activities.len())
    }

    pub fn first_profile(&self) -> RepoResult<Option<Profile>> {
        self.conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY id ASC LIMIT 1"),
                [],
                profile_from_row,
            )
            .optional()
            .map_err(|error| storage_error(error, "load profile"))
    }

    fn profile_by_id(&self, id: i64) -> RepoResult<Option<Profile>> {
        self.conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id],
                profile_from_row,
            )
            .optional()
            .map_err(|error| storage_error(error, "load profile"))
    }

    pub fn insert_profile(&self, profile: NewProfile, owner_id: i64) -> RepoResult<Profile> {
        let stored = Profile {
            id: 0,
            name: profile.name.trim().to_string(),
            alias: profile.alias.and_then(blank_to_none),
            avatar: profile.avatar.and_then(blank_to_none),
            github: profile.github.and_then(blank_to_none),
            website: profile.website.and_then(blank_to_none),
            personality_type: profile.personality_type.and_then(blank_to_none),
            personality_title: profile.personality_title.and_then(blank_to_none),
            owner_id,
        };

        self.conn
            .execute(
                "INSERT INTO profiles (name, alias, avatar, github, website, personality_type, personality_title, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    stored.name,
                    stored.alias,
                    stored.avatar,
                    stored.github,
                    stored.website,
                    stored.personality_type,
                    stored.personality_title,
                    stored.owner_id
                ],
            )
            .map_err(|error| storage_error(error, "insert profile"))?;

        Ok(Profile {
            id: self.conn.last_insert_rowid(),
            ..stored
        })
    }

    pub fn patch_profile(&self, id: i64, patch: ProfilePatch) -> RepoResult<Profile> {
        let mut profile = self
            .profile_by_id(id)?
            .ok_or(RepositoryError::NotFound("profile"))?;
        patch.apply(&mut profile);

        self.conn
            .execute(
                "UPDATE profiles
                 SET name = ?2, alias = ?3, avatar = ?4, github = ?5, website = ?6,
                     personality_type = ?7, personality_title = ?8
                 WHERE id = ?1",
                params![
                    profile.id,
                    profile.name,
                    profile.alias,
                    profile.avatar,
                    profile.github,
                    profile.website,
                    profile.personality_type,
                    profile.personality_title
                ],
            )
            .map_err(|error| storage_error(error, "update profile"))?;

        Ok(profile)
    }

    pub fn projects(&self) -> RepoResult<Vec<Project>> {
        let mut statement = self
            .conn
            .prepare(
                "SELECT id, name, description, icon, icon_background, owner_id
                 FROM projects ORDER BY id ASC",
            )
            .map_err(|error| storage_error(error, "prepare project listing"))?;

        let rows = statement
            .query_map([], project_from_row)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|error| storage_error(error, "list projects"))?;

        Ok(rows)
    }

    pub fn project(&self, id: i64) -> RepoResult<Option<Project>> {
        self.conn
            .query_row(
                "SELECT id, name, description, icon, icon_background, owner_id
                 FROM projects WHERE id = ?1",
                params![id],
                project_from_row,
            )
            .optional()
            .map_err(|error| storage_error(error, "load project"))
    }

    pub fn insert_project(&self, project: &NewProject, owner_id: i64) -> RepoResult<Project> {
        self.conn
            .execute(
                "INSERT INTO projects (name, description, icon, icon_background, owner_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    project.name.trim(),
                    project.description.trim(),
                    project.icon.trim(),
                    project.icon_background.trim(),
                    owner_id
                ],
            )
            .map_err(|error| storage_error(error, "insert project"))?;

        Ok(Project {
            id: self.conn.last_insert_rowid(),
            name: project.name.trim().to_string(),
            description: project.description.trim().to_string(),
            icon: project.icon.trim().to_string(),
            icon_background: project.icon_background.trim().to_string(),
            owner_id,
        })
    }

    pub fn tech_stacks(&self) -> RepoResult<Vec<TechStack>> {
        let mut statement = self
            .conn
            .prepare("SELECT id, name, icon, background, owner_id FROM tech_stacks ORDER BY id ASC")
            .map_err(|error| storage_error(error, "prepare tech stack listing"))?;

        let rows = statement
            .query_map([], |row| {
                Ok(TechStack {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    icon: row.get(2)?,
                    background: row.get(3)?,
                    owner_id: row.get(4)?,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|error| storage_error(error, "list tech stacks"))?;

        Ok(rows)
    }

    pub fn insert_tech_stack(
        &self,
        tech_stack: &NewTechStack,
        owner_id: i64,
    ) -> RepoResult<TechStack> {
        self.conn
            .execute(
                "INSERT INTO tech_stacks (name, icon, background, owner_id) VALUES (?1, ?2, ?3, ?4)",
                params![
                    tech_stack.name.trim(),
                    tech_stack.icon.trim(),
                    tech_stack.background.trim(),
                    owner_id
                ],
            )
            .map_err(|error| storage_error(error, "insert tech stack"))?;

        Ok(TechStack {
            id: self.conn.last_insert_rowid(),
            name: tech_stack.name.trim().to_string(),
            icon: tech_stack.icon.trim().to_string(),
            background: tech_stack.background.trim().to_string(),
            owner_id,
        })
    }

    pub fn interests(&self) -> RepoResult<Vec<Interest>> {
        let mut statement = self
            .conn
            .prepare("SELECT id, name, description, icon, owner_id FROM interests ORDER BY id ASC")
            .map_err(|error| storage_error(error, "prepare interest listing"))?;

        let rows = statement
            .query_map([], |row| {
                Ok(Interest {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    icon: row.get(3)?,
                    owner_id: row.get(4)?,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|error| storage_error(error, "list interests"))?;

        Ok(rows)
    }

    pub fn insert_interest(&self, interest: &NewInterest, owner_id: i64) -> RepoResult<Interest> {
        self.conn
            .execute(
                "INSERT INTO interests (name, description, icon, owner_id) VALUES (?1, ?2, ?3, ?4)",
                params![
                    interest.name.trim(),
                    interest.description.trim(),
                    interest.icon.trim(),
                    owner_id
                ],
            )
            .map_err(|error| storage_error(error, "insert interest"))?;

        Ok(Interest {
            id: self.conn.last_insert_rowid(),
            name: interest.name.trim().to_string(),
            description: interest.description.trim().to_string(),
            icon: interest.icon.trim().to_string(),
            owner_id,
        })
    }

    pub fn contacts(&self) -> RepoResult<Vec<Contact>> {
        let mut statement = self
            .conn
            .prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at ASC, id ASC"
            ))
            .map_err(|error| storage_error(error, "prepare contact listing"))?;

        let rows = statement
            .query_map([], contact_from_row)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|error| storage_error(error, "list contacts"))?;

        Ok(rows)
    }

    pub fn contact(&self, id: i64) -> RepoResult<Option<Contact>> {
        self.conn
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id],
                contact_from_row,
            )
            .optional()
            .map_err(|error| storage_error(error, "load contact"))
    }

    pub fn insert_contact(&self, contact: &NewContact) -> RepoResult<Contact> {
        let stored = Contact {
            id: 0,
            name: contact.name.trim().to_string(),
            email: contact.email.trim().to_string(),
            subject: contact.subject.trim().to_string(),
            message: contact.message.clone(),
            created_at: Utc::now(),
            is_read: false,
        };

        self.conn
            .execute(
                "INSERT INTO contacts (name, email, subject, message, created_at, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    stored.name,
                    stored.email,
                    stored.subject,
                    stored.message,
                    stored.created_at,
                    stored.is_read
                ],
            )
            .map_err(|error| storage_error(error, "insert contact"))?;

        Ok(Contact {
            id: self.conn.last_insert_rowid(),
            ..stored
        })
    }

    pub fn mark_contact_read(&self, id: i64) -> RepoResult<Contact> {
        let changed = self
            .conn
            .execute("UPDATE contacts SET is_read = 1 WHERE id = ?1", params![id])
            .map_err(|error| storage_error(error, "mark contact read"))?;
        if changed == 0 {
            return Err(RepositoryError::NotFound("contact"));
        }

        self.contact(id)?.ok_or(RepositoryError::NotFound("contact"))
    }

    pub fn comments(&self, post_id: Option<i64>) -> RepoResult<Vec<Comment>> {
        let mut statement = self
            .conn
            .prepare(&format!(
                "SELECT {COMMENT_COLUMNS}
                 FROM comments
                 WHERE ?1 IS NULL OR post_id = ?1
                 ORDER BY created_at ASC, id ASC"
            ))
            .map_err(|error| storage_error(error, "prepare comment listing"))?;

        let rows = statement
            .query_map(params![post_id], comment_from_row)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|error| storage_error(error, "list comments"))?;

        Ok(rows)
    }

    fn comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        self.conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![id],
                comment_from_row,
            )
            .optional()
            .map_err(|error| storage_error(error, "load comment"))
    }

    pub fn insert_comment(&self, comment: &NewComment) -> RepoResult<Comment> {
        if self.post(comment.post_id)?.is_none() {
            return Err(RepositoryError::constraint("postId", "no post with this id"));
        }

        let stored = Comment {
            id: 0,
            post_id: comment.post_id,
            name: comment.name.trim().to_string(),
            email: comment.email.trim().to_string(),
            content: comment.content.clone(),
            created_at: Utc::now(),
            is_approved: false,
        };

        self.conn
            .execute(
                "INSERT INTO comments (post_id, name, email, content, created_at, is_approved)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    stored.post_id,
                    stored.name,
                    stored.email,
                    stored.content,
                    stored.created_at,
                    stored.is_approved
                ],
            )
            .map_err(|error| storage_error(error, "insert comment"))?;

        Ok(Comment {
            id: self.conn.last_insert_rowid(),
            ..stored
        })
    }

    pub fn approve_comment(&self, id: i64) -> RepoResult<Comment> {
        let changed = self
            .conn
            .execute("UPDATE comments SET is_approved = 1 WHERE id = ?1", params![id])
            .map_err(|error| storage_error(error, "approve comment"))?;
        if changed == 0 {
            return Err(RepositoryError::NotFound("comment"));
        }

        self.comment(id)?.ok_or(RepositoryError::NotFound("comment"))
    }
}

/// Relational backend. One connection, opened with the schema in place and
/// shared behind a lock.
pub struct SqliteRepository {
    database: Mutex<Database>,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            database: Mutex::new(Database::open(path)?),
        })
    }

    fn database(&self) -> RepoResult<MutexGuard<'_, Database>> {
        self.database
            .lock()
            .map_err(|_| RepositoryError::Backend(anyhow!("sqlite connection lock poisoned")))
    }
}

impl Repository for SqliteRepository {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        post.validate()?;
        self.database()?.insert_post(&post)
    }

    fn list_posts(&self) -> RepoResult<Vec<Post>> {
        self.database()?.posts()
    }

    fn get_post(&self, id: i64) -> RepoResult<Option<Post>> {
        self.database()?.post(id)
    }

    fn list_activities(&self, owner_id: Option<i64>) -> RepoResult<Vec<ActivityRecord>> {
        self.database()?.activities(owner_id)
    }

    fn create_activity(&self, activity: NewActivity) -> RepoResult<ActivityRecord> {
        self.database()?.insert_activity(&activity)
    }

    fn replace_activities(
        &self,
        owner_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        activities: &[NewActivity],
    ) -> RepoResult<usize> {
        let mut database = self.database()?;
        database.replace_activities_between(owner_id, from, to, activities)
    }

    fn profile(&self) -> RepoResult<Option<Profile>> {
        self.database()?.first_profile()
    }

    fn create_profile(&self, profile: NewProfile, owner_id: i64) -> RepoResult<Profile> {
        profile.validate()?;
        self.database()?.insert_profile(profile, owner_id)
    }

    fn update_profile(&self, id: i64, patch: ProfilePatch) -> RepoResult<Profile> {
        patch.validate()?;
        self.database()?.patch_profile(id, patch)
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        self.database()?.projects()
    }

    fn get_project(&self, id: i64) -> RepoResult<Option<Project>> {
        self.database()?.project(id)
    }

    fn create_project(&self, project: NewProject, owner_id: i64) -> RepoResult<Project> {
        project.validate()?;
        self.database()?.insert_project(&project, owner_id)
    }

    fn list_tech_stacks(&self) -> RepoResult<Vec<TechStack>> {
        self.database()?.tech_stacks()
    }

    fn create_tech_stack(&self, tech_stack: NewTechStack, owner_id: i64) -> RepoResult<TechStack> {
        tech_stack.validate()?;
        self.database()?.insert_tech_stack(&tech_stack, owner_id)
    }

    fn list_interests(&self) -> RepoResult<Vec<Interest>> {
        self.database()?.interests()
    }

    fn create_interest(&self, interest: NewInterest, owner_id: i64) -> RepoResult<Interest> {
        interest.validate()?;
        self.database()?.insert_interest(&interest, owner_id)
    }

    fn list_contacts(&self) -> RepoResult<Vec<Contact>> {
        self.database()?.contacts()
    }

    fn get_contact(&self, id: i64) -> RepoResult<Option<Contact>> {
        self.database()?.contact(id)
    }

    fn create_contact(&self, contact: NewContact) -> RepoResult<Contact> {
        contact.validate()?;
        self.database()?.insert_contact(&contact)
    }

    fn mark_contact_read(&self, id: i64) -> RepoResult<Contact> {
        self.database()?.mark_contact_read(id)
    }

    fn list_comments(&self) -> RepoResult<Vec<Comment>> {
        self.database()?.comments(None)
    }

    fn list_post_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>> {
        self.database()?.comments(Some(post_id))
    }

    fn create_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        comment.validate()?;
        self.database()?.insert_comment(&comment)
    }

    fn approve_comment(&self, id: i64) -> RepoResult<Comment> {
        self.database()?.approve_comment(id)
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        created_at: row.get(4)?,
        owner_id: row.get(5)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        name: row.get(1)?,
        alias: row.get(2)?,
        avatar: row.get(3)?,
        github: row.get(4)?,
        website: row.get(5)?,
        personality_type: row.get(6)?,
        personality_title: row.get(7)?,
        owner_id: row.get(8)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        icon_background: row.get(4)?,
        owner_id: row.get(5)?,
    })
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        subject: row.get(3)?,
        message: row.get(4)?,
        created_at: row.get(5)?,
        is_read: row.get(6)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
        is_approved: row.get(6)?,
    })
}

fn storage_error(error: rusqlite::Error, action: &str) -> RepositoryError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &error {
        if failure.code == ErrorCode::ConstraintViolation {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            return RepositoryError::constraint("record", detail);
        }
    }

    RepositoryError::Backend(anyhow::Error::new(error).context(format!("Failed to {action}")))
}

#[cfg(test)]
mod tests {
    use super::{Database, SqliteRepository};
    use crate::db::{
        NewActivity, NewComment, NewContact, NewPost, NewProfile, ProfilePatch, Repository,
        RepositoryError,
    };
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn repository(dir: &TempDir) -> SqliteRepository {
        SqliteRepository::open(&dir.path().join("db").join("folio.db")).expect("open repository")
    }

    fn post(title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: format!("# {title}\nBody"),
            image_url: None,
            owner_id: 1,
        }
    }

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn posts_are_listed_newest_first() {
        let dir = TempDir::new().expect("tempdir");
        let repository = repository(&dir);

        let first = repository.create_post(post("First")).expect("first post");
        let second = repository.create_post(post("Second")).expect("second post");

        let titles = repository
            .list_posts()
            .expect("list posts")
            .into_iter()
            .map(|post| post.id)
            .collect::<Vec<_>>();

        assert_eq!(titles, vec![second.id, first.id]);
        assert_eq!(
            repository.get_post(first.id).expect("get post"),
            Some(first)
        );
        assert_eq!(repository.get_post(999).expect("missing post"), None);
    }

    #[test]
    fn blank_title_is_rejected_before_insert() {
        let dir = TempDir::new().expect("tempdir");
        let repository = repository(&dir);

        let result = repository.create_post(post(" "));

        assert!(matches!(result, Err(RepositoryError::Constraint { .. })));
        assert!(repository.list_posts().expect("list posts").is_empty());
    }

    #[test]
    fn schema_check_surfaces_as_constraint_error() {
        let dir = TempDir::new().expect("tempdir");
        let database = Database::open(&dir.path().join("raw.db")).expect("open database");

        let result = database.insert_post(&post("   "));

        assert!(matches!(result, Err(RepositoryError::Constraint { .. })));
    }

    #[test]
    fn replace_activities_only_touches_window_and_owner() {
        let dir = TempDir::new().expect("tempdir");
        let repository = repository(&dir);

        [("2026-01-01", 1, 1), ("2026-01-10", 2, 1), ("2026-01-10", 7, 2)]
            .into_iter()
            .for_each(|(date, count, owner_id)| {
                repository
                    .create_activity(NewActivity {
                        date: day(date),
                        count,
                        owner_id,
                    })
                    .expect("create activity");
            });

        let inserted = repository
            .replace_activities(
                1,
                day("2026-01-05"),
                day("2026-01-31"),
                &[NewActivity {
                    date: day("2026-01-20"),
                    count: 4,
                    owner_id: 1,
                }],
            )
            .expect("replace activities");

        assert_eq!(inserted, 1);

        let owner_one = repository
            .list_activities(Some(1))
            .expect("list activities")
            .into_iter()
            .map(|record| (record.date, record.count))
            .collect::<Vec<_>>();
        assert_eq!(
            owner_one,
            vec![(day("2026-01-01"), 1), (day("2026-01-20"), 4)]
        );
        assert_eq!(repository.list_activities(None).expect("all").len(), 3);
    }

    #[test]
    fn profile_update_keeps_unpatched_fields() {
        let dir = TempDir::new().expect("tempdir");
        let repository = repository(&dir);

        let created = repository
            .create_profile(
                NewProfile {
                    name: "Eltrac".to_string(),
                    github: Some("https://github.com/eltrac".to_string()),
                    ..NewProfile::default()
                },
                1,
            )
            .expect("create profile");

        let updated = repository
            .update_profile(
                created.id,
                ProfilePatch {
                    alias: Some("el".to_string()),
                    ..ProfilePatch::default()
                },
            )
            .expect("update profile");

        assert_eq!(updated.github.as_deref(), Some("https://github.com/eltrac"));
        assert_eq!(updated.alias.as_deref(), Some("el"));
        assert_eq!(repository.profile().expect("profile"), Some(updated));
        assert!(matches!(
            repository.update_profile(42, ProfilePatch::default()),
            Err(RepositoryError::NotFound("profile"))
        ));
    }

    #[test]
    fn repository_keeps_a_single_connection() {
        let dir = TempDir::new().expect("tempdir");
        let repository = repository(&dir);

        repository
            .database()
            .expect("lock")
            .conn
            .execute_batch("CREATE TEMP TABLE marker (id INTEGER);")
            .expect("create temp table");

        // Temp tables only exist on the connection that created them.
        let rows: i64 = repository
            .database()
            .expect("lock")
            .conn
            .query_row("SELECT count(*) FROM temp.marker", [], |row| row.get(0))
            .expect("temp table visible");
        assert_eq!(rows, 0);
    }

    #[test]
    fn contacts_can_be_marked_read() {
        let dir = TempDir::new().expect("tempdir");
        let repository = repository(&dir);

        let contact = repository
            .create_contact(NewContact {
                name: "Reader".to_string(),
                email: "reader@example.com".to_string(),
                subject: "Hi".to_string(),
                message: "Nice site".to_string(),
            })
            .expect("create contact");
        assert!(!contact.is_read);

        let read = repository.mark_contact_read(contact.id).expect("mark read");

        assert!(read.is_read);
        assert_eq!(repository.get_contact(contact.id).expect("get"), Some(read.clone()));
        assert_eq!(repository.list_contacts().expect("list"), vec![read]);
        assert!(matches!(
            repository.mark_contact_read(404),
            Err(RepositoryError::NotFound("contact"))
        ));
    }

    #[test]
    fn comments_are_scoped_to_posts_and_approved_in_place() {
        let dir = TempDir::new().expect("tempdir");
        let repository = repository(&dir);
        let first = repository.create_post(post("First")).expect("first post");
        let second = repository.create_post(post("Second")).expect("second post");
        let comment = |post_id: i64, content: &str| NewComment {
            post_id,
            name: "Reader".to_string(),
            email: "reader@example.com".to_string(),
            content: content.to_string(),
        };

        let on_first = repository.create_comment(comment(first.id, "one")).expect("comment");
        repository.create_comment(comment(second.id, "two")).expect("comment");

        assert!(matches!(
            repository.create_comment(comment(999, "orphan")),
            Err(RepositoryError::Constraint { field, .. }) if field == "postId"
        ));

        let approved = repository.approve_comment(on_first.id).expect("approve");
        assert!(approved.is_approved);
        assert_eq!(
            repository.list_post_comments(first.id).expect("comments"),
            vec![approved]
        );
        assert_eq!(repository.list_comments().expect("all comments").len(), 2);
        assert!(matches!(
            repository.approve_comment(999),
            Err(RepositoryError::NotFound("comment"))
        ));
    }
}
