use super::{
    ActivityRecord, Comment, Contact, Interest, MemoryRepository, NewActivity, NewComment,
    NewContact, NewInterest, NewPost, NewProfile, NewProject, NewTechStack, Post, Profile,
    ProfilePatch, Project, RepoResult, Repository, RepositoryError, TechStack,
};
use anyhow::anyhow;
use chrono::NaiveDate;

/// Memory repository whose `create_post` always fails.
pub struct FailingPosts {
    inner: MemoryRepository,
    constraint: bool,
}

impl FailingPosts {
    /// Fails like an unreachable store.
    pub fn backend() -> Self {
        Self {
            inner: MemoryRepository::new(),
            constraint: false,
        }
    }

    /// Fails like a schema violation on `title`.
    pub fn constraint() -> Self {
        Self {
            inner: MemoryRepository::new(),
            constraint: true,
        }
    }
}

impl Repository for FailingPosts {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    fn create_post(&self, _post: NewPost) -> RepoResult<Post> {
        if self.constraint {
            Err(RepositoryError::constraint("title", "violates posts schema"))
        } else {
            Err(RepositoryError::Backend(anyhow!("disk I/O error")))
        }
    }

    fn list_posts(&self) -> RepoResult<Vec<Post>> {
        self.inner.list_posts()
    }

    fn get_post(&self, id: i64) -> RepoResult<Option<Post>> {
        self.inner.get_post(id)
    }

    fn list_activities(&self, owner_id: Option<i64>) -> RepoResult<Vec<ActivityRecord>> {
        self.inner.list_activities(owner_id)
    }

    fn create_activity(&self, activity: NewActivity) -> RepoResult<ActivityRecord> {
        self.inner.create_activity(activity)
    }

    fn replace_activities(
        &self,
        owner_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        activities: &[NewActivity],
    ) -> RepoResult<usize> {
        self.inner.replace_activities(owner_id, from, to, activities)
    }

    fn profile(&self) -> RepoResult<Option<Profile>> {
        self.inner.profile()
    }

    fn create_profile(&self, profile: NewProfile, owner_id: i64) -> RepoResult<Profile> {
        self.inner.create_profile(profile, owner_id)
    }

    fn update_profile(&self, id: i64, patch: ProfilePatch) -> RepoResult<Profile> {
        self.inner.update_profile(id, patch)
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        self.inner.list_projects()
    }

    fn get_project(&self, id: i64) -> RepoResult<Option<Project>> {
        self.inner.get_project(id)
    }

    fn create_project(&self, project: NewProject, owner_id: i64) -> RepoResult<Project> {
        self.inner.create_project(project, owner_id)
    }

    fn list_tech_stacks(&self) -> RepoResult<Vec<TechStack>> {
        self.inner.list_tech_stacks()
    }

    fn create_tech_stack(&self, tech_stack: NewTechStack, owner_id: i64) -> RepoResult<TechStack> {
        self.inner.create_tech_stack(tech_stack, owner_id)
    }

    fn list_interests(&self) -> RepoResult<Vec<Interest>> {
        self.inner.list_interests()
    }

    fn create_interest(&self, interest: NewInterest, owner_id: i64) -> RepoResult<Interest> {
        self.inner.create_interest(interest, owner_id)
    }

    fn list_contacts(&self) -> RepoResult<Vec<Contact>> {
        self.inner.list_contacts()
    }

    fn get_contact(&self, id: i64) -> RepoResult<Option<Contact>> {
        self.inner.get_contact(id)
    }

    fn create_contact(&self, contact: NewContact) -> RepoResult<Contact> {
        self.inner.create_contact(contact)
    }

    fn mark_contact_read(&self, id: i64) -> RepoResult<Contact> {
        self.inner.mark_contact_read(id)
    }

    fn list_comments(&self) -> RepoResult<Vec<Comment>> {
        self.inner.list_comments()
    }

    fn list_post_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>> {
        self.inner.list_post_comments(post_id)
    }

    fn create_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        self.inner.create_comment(comment)
    }

    fn approve_comment(&self, id: i64) -> RepoResult<Comment> {
        self.inner.approve_comment(id)
    }
}
