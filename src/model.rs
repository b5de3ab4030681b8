//! Portal entities as they are persisted.
//!
//! Field names are camelCase on the wire so the blobs stay readable by any
//! client that shares the data directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rank ladder offered by the employee editor, highest first.
pub const RANKS: &[&str] = &[
    "Executive",
    "General Manager",
    "Deputy General Manager",
    "Manager",
    "Assistant Manager",
    "Senior Staff",
    "Staff",
];

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Salted hash, see [`crate::password`]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

/// A user with the password hash stripped, safe to hand to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
    pub department: Option<String>,
    pub position: Option<String>,
    pub rank: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: user.created_at,
            is_admin: user.is_admin,
            department: user.department.clone(),
            position: user.position.clone(),
            rank: user.rank.clone(),
        }
    }
}

/// A discussion board post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
    pub views: u64,
}

/// One entry of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// Actions recorded by the state manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Signup,
    Login,
    Logout,
    CreatePost,
    UpdatePost,
    DeletePost,
    UpdateEmployee,
}

impl Activity {
    pub fn label(self) -> &'static str {
        match self {
            Activity::Signup => "signup",
            Activity::Login => "login",
            Activity::Logout => "logout",
            Activity::CreatePost => "create post",
            Activity::UpdatePost => "update post",
            Activity::DeletePost => "delete post",
            Activity::UpdateEmployee => "update employee",
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Row of the admin employee table. Missing employee fields become empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub email: String,
    pub name: String,
    pub department: String,
    pub position: String,
    pub rank: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
}

impl From<&User> for Employee {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            department: user.department.clone().unwrap_or_default(),
            position: user.position.clone().unwrap_or_default(),
            rank: user.rank.clone().unwrap_or_default(),
            created_at: user.created_at,
            is_admin: user.is_admin,
        }
    }
}

/// Counters shown on the admin dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub users: usize,
    pub posts: usize,
    pub activity_logs: usize,
}
