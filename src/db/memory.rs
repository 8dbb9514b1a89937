use super::{
    ActivityRecord, Comment, Contact, Interest, NewActivity, NewComment, NewContact, NewInterest,
    NewPost, NewProfile, NewProject, NewTechStack, Post, Profile, ProfilePatch, Project,
    RepoResult, Repository, RepositoryError, TechStack, blank_to_none,
};
use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    posts: BTreeMap<i64, Post>,
    activities: BTreeMap<i64, ActivityRecord>,
    profiles: BTreeMap<i64, Profile>,
    projects: BTreeMap<i64, Project>,
    tech_stacks: BTreeMap<i64, TechStack>,
    interests: BTreeMap<i64, Interest>,
    contacts: BTreeMap<i64, Contact>,
    comments: BTreeMap<i64, Comment>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local backend for tests and throwaway runs. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Backend(anyhow!("memory repository lock poisoned")))
    }
}

impl Repository for MemoryRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        post.validate()?;
        let mut tables = self.lock()?;
        let id = tables.allocate_id();
        let stored = Post {
            id,
            title: post.title.trim().to_string(),
            content: post.content,
            image_url: post.image_url,
            created_at: Utc::now(),
            owner_id: post.owner_id,
        };
        tables.posts.insert(id, stored.clone());
        Ok(stored)
    }

    fn list_posts(&self) -> RepoResult<Vec<Post>> {
        let mut posts = self.lock()?.posts.values().cloned().collect::<Vec<_>>();
        posts.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(posts)
    }

    fn get_post(&self, id: i64) -> RepoResult<Option<Post>> {
        Ok(self.lock()?.posts.get(&id).cloned())
    }

    fn list_activities(&self, owner_id: Option<i64>) -> RepoResult<Vec<ActivityRecord>> {
        let mut records = self
            .lock()?
            .activities
            .values()
            .filter(|record| owner_id.is_none_or(|owner| record.owner_id == owner))
            .cloned()
            .collect::<Vec<_>>();
        records.sort_by(|left, right| left.date.cmp(&right.date).then(left.id.cmp(&right.id)));
        Ok(records)
    }

    fn create_activity(&self, activity: NewActivity) -> RepoResult<ActivityRecord> {
        let mut tables = self.lock()?;
        let id = tables.allocate_id();
        let record = ActivityRecord {
            id,
            date: activity.date,
            count: activity.count,
            owner_id: activity.owner_id,
        };
        tables.activities.insert(id, record.clone());
        Ok(record)
    }

    fn replace_activities(
        &self,
        owner_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        activities: &[NewActivity],
    ) -> RepoResult<usize> {
        let mut tables = self.lock()?;
        tables.activities.retain(|_, record| {
            record.owner_id != owner_id || record.date < from || record.date > to
        });

        activities.iter().for_each(|activity| {
            let id = tables.allocate_id();
            tables.activities.insert(
                id,
                ActivityRecord {
                    id,
                    date: activity.date,
                    count: activity.count,
                    owner_id: activity.owner_id,
                },
            );
        });

        Ok(activities.len())
    }

    fn profile(&self) -> RepoResult<Option<Profile>> {
        Ok(self.lock()?.profiles.values().next().cloned())
    }

    fn create_profile(&self, profile: NewProfile, owner_id: i64) -> RepoResult<Profile> {
        profile.validate()?;
        let mut tables = self.lock()?;
        let id = tables.allocate_id();
        let stored = Profile {
            id,
            name: profile.name.trim().to_string(),
            alias: profile.alias.and_then(blank_to_none),
            avatar: profile.avatar.and_then(blank_to_none),
            github: profile.github.and_then(blank_to_none),
            website: profile.website.and_then(blank_to_none),
            personality_type: profile.personality_type.and_then(blank_to_none),
            personality_title: profile.personality_title.and_then(blank_to_none),
            owner_id,
        };
        tables.profiles.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_profile(&self, id: i64, patch: ProfilePatch) -> RepoResult<Profile> {
        patch.validate()?;
        let mut tables = self.lock()?;
        let profile = tables
            .profiles
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound("profile"))?;
        patch.apply(profile);
        Ok(profile.clone())
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        Ok(self.lock()?.projects.values().cloned().collect())
    }

    fn get_project(&self, id: i64) -> RepoResult<Option<Project>> {
        Ok(self.lock()?.projects.get(&id).cloned())
    }

    fn create_project(&self, project: NewProject, owner_id: i64) -> RepoResult<Project> {
        project.validate()?;
        let mut tables = self.lock()?;
        let id = tables.allocate_id();
        let stored = Project {
            id,
            name: project.name.trim().to_string(),
            description: project.description.trim().to_string(),
            icon: project.icon.trim().to_string(),
            icon_background: project.icon_background.trim().to_string(),
            owner_id,
        };
        tables.projects.insert(id, stored.clone());
        Ok(stored)
    }

    fn list_tech_stacks(&self) -> RepoResult<Vec<TechStack>> {
        Ok(self.lock()?.tech_stacks.values().cloned().collect())
    }

    fn create_tech_stack(&self, tech_stack: NewTechStack, owner_id: i64) -> RepoResult<TechStack> {
        tech_stack.validate()?;
        let mut tables = self.lock()?;
        let id = tables.allocate_id();
        let stored = TechStack {
            id,
            name: tech_stack.name.trim().to_string(),
            icon: tech_stack.icon.trim().to_string(),
            background: tech_stack.background.trim().to_string(),
            owner_id,
        };
        tables.tech_stacks.insert(id, stored.clone());
        Ok(stored)
    }

    fn list_interests(&self) -> RepoResult<Vec<Interest>> {
        Ok(self.lock()?.interests.values().cloned().collect())
    }

    fn create_interest(&self, interest: NewInterest, owner_id: i64) -> RepoResult<Interest> {
        interest.validate()?;
        let mut tables = self.lock()?;
        let id = tables.allocate_id();
        let stored = Interest {
            id,
            name: interest.name.trim().to_string(),
            description: interest.description.trim().to_string(),
            icon: interest.icon.trim().to_string(),
            owner_id,
        };
        tables.interests.insert(id, stored.clone());
        Ok(stored)
    }

    fn list_contacts(&self) -> RepoResult<Vec<Contact>> {
        Ok(self.lock()?.contacts.values().cloned().collect())
    }

    fn get_contact(&self, id: i64) -> RepoResult<Option<Contact>> {
        Ok(self.lock()?.contacts.get(&id).cloned())
    }

    fn create_contact(&self, contact: NewContact) -> RepoResult<Contact> {
        contact.validate()?;
        let mut tables = self.lock()?;
        let id = tables.allocate_id();
        let stored = Contact {
            id,
            name: contact.name.trim().to_string(),
            email: contact.email.trim().to_string(),
            subject: contact.subject.trim().to_string(),
            message: contact.message,
            created_at: Utc::now(),
            is_read: false,
        };
        tables.contacts.insert(id, stored.clone());
        Ok(stored)
    }

    fn mark_contact_read(&self, id: i64) -> RepoResult<Contact> {
        let mut tables = self.lock()?;
        let contact = tables
            .contacts
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound("contact"))?;
        contact.is_read = true;
        Ok(contact.clone())
    }

    fn list_comments(&self) -> RepoResult<Vec<Comment>> {
        Ok(self.lock()?.comments.values().cloned().collect())
    }

    fn list_post_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>> {
        Ok(self
            .lock()?
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect())
    }

    fn create_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        comment.validate()?;
        let mut tables = self.lock()?;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepositoryError::constraint("postId", "no post with this id"));
        }
        let id = tables.allocate_id();
        let stored = Comment {
            id,
            post_id: comment.post_id,
            name: comment.name.trim().to_string(),
            email: comment.email.trim().to_string(),
            content: comment.content,
            created_at: Utc::now(),
            is_approved: false,
        };
        tables.comments.insert(id, stored.clone());
        Ok(stored)
    }

    fn approve_comment(&self, id: i64) -> RepoResult<Comment> {
        let mut tables = self.lock()?;
        let comment = tables
            .comments
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound("comment"))?;
        comment.is_approved = true;
        Ok(comment.clone())
    }
}
