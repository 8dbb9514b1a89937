pub const CREATE_POSTS: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  title      TEXT NOT NULL CHECK (length(trim(title)) > 0),
  content    TEXT NOT NULL,
  image_url  TEXT,
  created_at TEXT NOT NULL,
  owner_id   INTEGER NOT NULL
);
"#;

pub const CREATE_ACTIVITIES: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id       INTEGER PRIMARY KEY AUTOINCREMENT,
  date     TEXT NOT NULL,
  count    INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
  owner_id INTEGER NOT NULL
);
"#;

pub const CREATE_PROFILES: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
  id                INTEGER PRIMARY KEY AUTOINCREMENT,
  name              TEXT NOT NULL,
  alias             TEXT,
  avatar            TEXT,
  github            TEXT,
  website           TEXT,
  personality_type  TEXT,
  personality_title TEXT,
  owner_id          INTEGER NOT NULL
);
"#;

pub const CREATE_PROJECTS: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  name            TEXT NOT NULL,
  description     TEXT NOT NULL,
  icon            TEXT NOT NULL,
  icon_background TEXT NOT NULL,
  owner_id        INTEGER NOT NULL
);
"#;

pub const CREATE_TECH_STACKS: &str = r#"
CREATE TABLE IF NOT EXISTS tech_stacks (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  name       TEXT NOT NULL,
  icon       TEXT NOT NULL,
  background TEXT NOT NULL,
  owner_id   INTEGER NOT NULL
);
"#;

pub const CREATE_INTERESTS: &str = r#"
CREATE TABLE IF NOT EXISTS interests (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  name        TEXT NOT NULL,
  description TEXT NOT NULL,
  icon        TEXT NOT NULL,
  owner_id    INTEGER NOT NULL
);
"#;

pub const CREATE_CONTACTS: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  name       TEXT NOT NULL,
  email      TEXT NOT NULL,
  subject    TEXT NOT NULL,
  message    TEXT NOT NULL,
  created_at TEXT NOT NULL,
  is_read    INTEGER NOT NULL DEFAULT 0
);
"#;

pub const CREATE_COMMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  post_id     INTEGER NOT NULL,
  name        TEXT NOT NULL,
  email       TEXT NOT NULL,
  content     TEXT NOT NULL,
  created_at  TEXT NOT NULL,
  is_approved INTEGER NOT NULL DEFAULT 0
);
"#;

pub const INDEX_POSTS_CREATED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);";

pub const INDEX_ACTIVITIES_OWNER_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_activities_owner_date ON activities(owner_id, date);";

pub const INDEX_COMMENTS_POST: &str =
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at);";

pub const POST_COLUMNS: &str = "id, title, content, image_url, created_at, owner_id";
pub const PROFILE_COLUMNS: &str =
    "id, name, alias, avatar, github, website, personality_type, personality_title, owner_id";
pub const CONTACT_COLUMNS: &str = "id, name, email, subject, message, created_at, is_read";
pub const COMMENT_COLUMNS: &str = "id, post_id, name, email, content, created_at, is_approved";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_POSTS,
        CREATE_ACTIVITIES,
        CREATE_PROFILES,
        CREATE_PROJECTS,
        CREATE_TECH_STACKS,
        CREATE_INTERESTS,
        CREATE_CONTACTS,
        CREATE_COMMENTS,
        INDEX_POSTS_CREATED_AT,
        INDEX_ACTIVITIES_OWNER_DATE,
        INDEX_COMMENTS_POST,
    ]
}
