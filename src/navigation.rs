//! View navigation with the admin gate.

use crate::error::{PortalError, Result};
use crate::model::User;
use std::fmt;
use std::str::FromStr;

/// The five portal views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Main,
    Login,
    Signup,
    Board,
    Admin,
}

impl View {
    pub const ALL: [View; 5] = [View::Main, View::Login, View::Signup, View::Board, View::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            View::Main => "main",
            View::Login => "login",
            View::Signup => "signup",
            View::Board => "board",
            View::Admin => "admin",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("Unknown view: {}", s))
    }
}

/// Tracks the active view
#[derive(Debug, Default)]
pub struct Navigator {
    current: View,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        self.current
    }

    /// Move to `to`. Entering the admin view requires an admin session;
    /// on refusal the current view is kept.
    pub fn navigate(&mut self, to: View, session: Option<&User>) -> Result<View> {
        if to == View::Admin && !session.is_some_and(|u| u.is_admin) {
            tracing::debug!(from = %self.current, "admin view refused");
            return Err(PortalError::AdminRequired);
        }
        self.current = to;
        Ok(to)
    }

    pub fn after_login(&mut self) {
        self.current = View::Main;
    }

    pub fn after_signup(&mut self) {
        self.current = View::Login;
    }

    pub fn after_logout(&mut self) {
        self.current = View::Main;
    }
}
