//! Domain state manager.
//!
//! `Portal` owns the user, post and activity-log collections plus the
//! current session. The store is the authority: every mutation re-reads
//! the collections it touches, writes all affected keys (activity log
//! included) as one batch that is rolled back if any write fails, and only
//! then replaces the in-memory copy. Another process sharing the same
//! store therefore never has its records overwritten by a stale copy, and a
//! failed write leaves both the store and the manager unchanged.

use crate::config::AdminSeed;
use crate::error::{PortalError, Result};
use crate::model::{Activity, ActivityLog, DashboardStats, Employee, Post, User};
use crate::password::{hash_password, verify_password};
use crate::store::{
    load_json, save_json, write_all, Store, Write, ACTIVITY_LOGS_KEY, CURRENT_USER_KEY,
    POSTS_KEY, USERS_KEY,
};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Timestamp ids, strictly increasing within one manager
#[derive(Debug, Default)]
struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    /// Never hand out an id at or below any numeric id in `existing`
    fn observe<'a>(&mut self, existing: impl Iterator<Item = &'a str>) {
        let max = existing
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        self.last = self.last.max(max);
    }

    fn next(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last.to_string()
    }
}

fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PortalError::EmptyField(field));
    }
    Ok(())
}

fn seed_admin(seed: &AdminSeed) -> Result<User> {
    Ok(User {
        id: "1".to_string(),
        email: seed.email.clone(),
        name: seed.name.clone(),
        password_hash: hash_password(&seed.password)?,
        created_at: Utc::now(),
        is_admin: true,
        department: Some("Management Support".to_string()),
        position: Some("CEO".to_string()),
        rank: Some("Executive".to_string()),
    })
}

pub struct Portal<S: Store> {
    store: S,
    users: Vec<User>,
    posts: Vec<Post>,
    activity_logs: Vec<ActivityLog>,
    current_user: Option<User>,
    ids: IdGenerator,
}

impl<S: Store> Portal<S> {
    /// Load all collections from `store`.
    ///
    /// When no user collection exists yet, a single admin account built
    /// from `seed` is created and persisted.
    pub fn load(mut store: S, seed: &AdminSeed) -> Result<Self> {
        if load_json::<Vec<User>, _>(&store, USERS_KEY)?.is_none() {
            save_json(&mut store, USERS_KEY, &[seed_admin(seed)?])?;
            info!(email = %seed.email, "seeded admin account");
        }
        let current_user: Option<User> = load_json(&store, CURRENT_USER_KEY)?;

        let mut portal = Self {
            store,
            users: Vec::new(),
            posts: Vec::new(),
            activity_logs: Vec::new(),
            current_user,
            ids: IdGenerator::default(),
        };
        portal.reload()?;

        debug!(
            users = portal.users.len(),
            posts = portal.posts.len(),
            activity_logs = portal.activity_logs.len(),
            session = portal.current_user.is_some(),
            "portal state loaded"
        );
        Ok(portal)
    }

    /// Re-read the users, posts and activity log from the store.
    ///
    /// Picks up records written by other processes sharing the store. The
    /// session belongs to this process and is left as is.
    pub fn reload(&mut self) -> Result<()> {
        self.reload_users()?;
        self.reload_posts()?;
        self.reload_logs()
    }

    // Accounts and session

    /// Find the user whose email and password both match. No side effects.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.email == email && password_matches(u, password))
            .ok_or(PortalError::InvalidCredentials)
    }

    /// Authenticate and open a session
    pub fn login(&mut self, email: &str, password: &str) -> Result<User> {
        self.reload_users()?;
        let user = match self.authenticate(email, password) {
            Ok(user) => user.clone(),
            Err(e) => {
                warn!(email, "login failed");
                return Err(e);
            }
        };

        let (_, logs) = self.logs_with(&user.id, &user.email, Activity::Login.label())?;
        self.commit_logged(vec![Write::json(CURRENT_USER_KEY, &user)?], logs)?;
        self.current_user = Some(user.clone());
        info!(email, "login");
        Ok(user)
    }

    /// Authenticate and record a login without touching the local session.
    /// Used by the HTTP backend, which issues no sessions.
    pub fn check_login(&mut self, email: &str, password: &str) -> Result<User> {
        self.reload_users()?;
        let user = self.authenticate(email, password)?.clone();
        let (_, logs) = self.logs_with(&user.id, &user.email, Activity::Login.label())?;
        self.commit_logged(Vec::new(), logs)?;
        Ok(user)
    }

    /// Register a new, non-admin account. Does not log in.
    pub fn signup(&mut self, email: &str, password: &str, name: &str) -> Result<User> {
        require(email, "email")?;
        require(password, "password")?;
        require(name, "name")?;

        self.reload_users()?;
        if self.users.iter().any(|u| u.email == email) {
            warn!(email, "signup rejected, duplicate email");
            return Err(PortalError::DuplicateEmail);
        }

        let user = User {
            id: self.ids.next(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
            is_admin: false,
            department: None,
            position: None,
            rank: None,
        };

        let mut users = self.users.clone();
        users.push(user.clone());
        let (_, logs) = self.logs_with(&user.id, &user.email, Activity::Signup.label())?;
        self.commit_logged(vec![Write::json(USERS_KEY, &users)?], logs)?;
        self.users = users;
        info!(email, id = %user.id, "signup");
        Ok(user)
    }

    /// Close the session. Returns the user that was logged out, if any.
    pub fn logout(&mut self) -> Result<Option<User>> {
        let Some(user) = self.current_user.clone() else {
            return Ok(None);
        };

        let (_, logs) = self.logs_with(&user.id, &user.email, Activity::Logout.label())?;
        self.commit_logged(vec![Write::Remove(CURRENT_USER_KEY)], logs)?;
        self.current_user = None;
        info!(email = %user.email, "logout");
        Ok(Some(user))
    }

    // Board

    /// Publish a post as the current user.
    ///
    /// Without a session this is a no-op and returns `Ok(None)`.
    pub fn create_post(&mut self, title: &str, content: &str) -> Result<Option<Post>> {
        let Some(author) = self.current_user.clone() else {
            debug!("create_post without a session ignored");
            return Ok(None);
        };
        require(title, "title")?;
        require(content, "content")?;

        self.reload_posts()?;
        let post = Post {
            id: self.ids.next(),
            title: title.to_string(),
            content: content.to_string(),
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_email: author.email.clone(),
            created_at: Utc::now(),
            views: 0,
        };

        let mut posts = self.posts.clone();
        posts.push(post.clone());
        let (_, logs) = self.logs_with(&author.id, &author.email, Activity::CreatePost.label())?;
        self.commit_logged(vec![Write::json(POSTS_KEY, &posts)?], logs)?;
        self.posts = posts;
        Ok(Some(post))
    }

    /// Replace the title and content of a post.
    ///
    /// Only the author or an admin may edit.
    pub fn update_post(&mut self, id: &str, title: &str, content: &str) -> Result<Post> {
        require(title, "title")?;
        require(content, "content")?;

        self.reload_posts()?;
        let idx = self
            .post_index(id)
            .ok_or_else(|| PortalError::not_found("post", id))?;
        let editor = self.editor_of(&self.posts[idx])?;

        let mut posts = self.posts.clone();
        posts[idx].title = title.to_string();
        posts[idx].content = content.to_string();
        let updated = posts[idx].clone();

        let (_, logs) = self.logs_with(&editor.id, &editor.email, Activity::UpdatePost.label())?;
        self.commit_logged(vec![Write::json(POSTS_KEY, &posts)?], logs)?;
        self.posts = posts;
        Ok(updated)
    }

    /// Remove a post. Returns `Ok(false)` when no post has this id.
    pub fn delete_post(&mut self, id: &str) -> Result<bool> {
        self.reload_posts()?;
        let Some(idx) = self.post_index(id) else {
            debug!(id, "delete of unknown post ignored");
            return Ok(false);
        };
        let editor = self.editor_of(&self.posts[idx])?;

        let mut posts = self.posts.clone();
        posts.remove(idx);
        let (_, logs) = self.logs_with(&editor.id, &editor.email, Activity::DeletePost.label())?;
        self.commit_logged(vec![Write::json(POSTS_KEY, &posts)?], logs)?;
        self.posts = posts;
        Ok(true)
    }

    /// Count one view of a post. Every call counts.
    ///
    /// Returns the new view count, or `None` if the post does not exist.
    pub fn record_view(&mut self, id: &str) -> Result<Option<u64>> {
        self.reload_posts()?;
        let Some(idx) = self.post_index(id) else {
            return Ok(None);
        };

        let mut posts = self.posts.clone();
        posts[idx].views += 1;
        let views = posts[idx].views;
        save_json(&mut self.store, POSTS_KEY, &posts)?;
        self.posts = posts;
        Ok(Some(views))
    }

    /// Whether the current session may edit or delete `post`
    pub fn can_edit(&self, post: &Post) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|u| u.is_admin || u.id == post.author_id)
    }

    // Employees

    /// Set department, position and rank of a user. Admin only.
    ///
    /// If the edited user is the one logged in, the session copy is patched
    /// and re-persisted in the same batch as the user collection.
    pub fn update_employee_info(
        &mut self,
        id: &str,
        department: &str,
        position: &str,
        rank: &str,
    ) -> Result<User> {
        let admin = match &self.current_user {
            Some(u) if u.is_admin => u.clone(),
            _ => return Err(PortalError::Forbidden("employee")),
        };
        require(department, "department")?;
        require(position, "position")?;
        require(rank, "rank")?;

        self.reload_users()?;
        let idx = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| PortalError::not_found("user", id))?;

        let mut users = self.users.clone();
        users[idx].department = Some(department.to_string());
        users[idx].position = Some(position.to_string());
        users[idx].rank = Some(rank.to_string());
        let updated = users[idx].clone();

        let mut writes = vec![Write::json(USERS_KEY, &users)?];
        let session = self.current_user.clone().filter(|u| u.id == id).map(|mut s| {
            s.department = updated.department.clone();
            s.position = updated.position.clone();
            s.rank = updated.rank.clone();
            s
        });
        if let Some(session) = &session {
            writes.push(Write::json(CURRENT_USER_KEY, session)?);
        }

        let (_, logs) = self.logs_with(&admin.id, &admin.email, Activity::UpdateEmployee.label())?;
        self.commit_logged(writes, logs)?;
        self.users = users;
        if session.is_some() {
            self.current_user = session;
        }
        info!(id, department, position, rank, "employee updated");
        Ok(updated)
    }

    // Activity log

    /// Append one entry to the audit trail
    pub fn append_activity_log(
        &mut self,
        user_id: &str,
        email: &str,
        action: &str,
    ) -> Result<ActivityLog> {
        let (entry, logs) = self.logs_with(user_id, email, action)?;
        self.commit_logged(Vec::new(), logs)?;
        Ok(entry)
    }

    // Read side

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Oldest first
    pub fn activity_logs(&self) -> &[ActivityLog] {
        &self.activity_logs
    }

    /// Newest first
    pub fn recent_activity(&self) -> impl Iterator<Item = &ActivityLog> {
        self.activity_logs.iter().rev()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn employees(&self) -> Vec<Employee> {
        self.users.iter().map(Employee::from).collect()
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            users: self.users.len(),
            posts: self.posts.len(),
            activity_logs: self.activity_logs.len(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // Internals

    fn post_index(&self, id: &str) -> Option<usize> {
        self.posts.iter().position(|p| p.id == id)
    }

    /// Session user allowed to modify `post`
    fn editor_of(&self, post: &Post) -> Result<User> {
        match &self.current_user {
            Some(u) if u.is_admin || u.id == post.author_id => Ok(u.clone()),
            _ => Err(PortalError::Forbidden("post")),
        }
    }

    fn reload_users(&mut self) -> Result<()> {
        if let Some(users) = load_json::<Vec<User>, _>(&self.store, USERS_KEY)? {
            self.ids.observe(users.iter().map(|u| u.id.as_str()));
            self.users = users;
        }
        Ok(())
    }

    fn reload_posts(&mut self) -> Result<()> {
        let posts: Vec<Post> = load_json(&self.store, POSTS_KEY)?.unwrap_or_default();
        self.ids.observe(posts.iter().map(|p| p.id.as_str()));
        self.posts = posts;
        Ok(())
    }

    fn reload_logs(&mut self) -> Result<()> {
        let logs: Vec<ActivityLog> =
            load_json(&self.store, ACTIVITY_LOGS_KEY)?.unwrap_or_default();
        self.ids.observe(logs.iter().map(|l| l.id.as_str()));
        self.activity_logs = logs;
        Ok(())
    }

    /// A new entry and the stored activity log with it appended. Nothing
    /// is written yet.
    fn logs_with(
        &mut self,
        user_id: &str,
        email: &str,
        action: &str,
    ) -> Result<(ActivityLog, Vec<ActivityLog>)> {
        self.reload_logs()?;
        let entry = ActivityLog {
            id: self.ids.next(),
            user_id: user_id.to_string(),
            user_email: email.to_string(),
            action: action.to_string(),
            timestamp: Utc::now(),
        };
        let mut logs = self.activity_logs.clone();
        logs.push(entry.clone());
        Ok((entry, logs))
    }

    /// Write `writes` plus the new activity log as one batch, then adopt
    /// the log in memory
    fn commit_logged(&mut self, mut writes: Vec<Write>, logs: Vec<ActivityLog>) -> Result<()> {
        writes.push(Write::json(ACTIVITY_LOGS_KEY, &logs)?);
        write_all(&mut self.store, &writes)?;
        self.activity_logs = logs;
        Ok(())
    }
}

fn password_matches(user: &User, password: &str) -> bool {
    verify_password(password, &user.password_hash).unwrap_or_else(|e| {
        warn!(email = %user.email, "stored password unusable: {}", e);
        false
    })
}
