use crate::config::AdminSeed;
use crate::error::{PortalError, Result};
use crate::portal::Portal;
use crate::store::{MemoryStore, Store};

pub const ADMIN_EMAIL: &str = "admin@muhantrading.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const MEMBER_EMAIL: &str = "member@x.com";
pub const MEMBER_PASSWORD: &str = "pw";

pub fn admin_seed() -> AdminSeed {
    AdminSeed {
        email: ADMIN_EMAIL.to_string(),
        name: "Administrator".to_string(),
        password: ADMIN_PASSWORD.to_string(),
    }
}

/// Fresh portal over an empty memory store (seeded admin only)
pub fn test_portal() -> Portal<MemoryStore> {
    Portal::load(MemoryStore::new(), &admin_seed()).expect("load portal")
}

/// Portal with one non-admin member signed up and logged in
pub fn portal_with_member() -> Portal<MemoryStore> {
    let mut portal = test_portal();
    portal
        .signup(MEMBER_EMAIL, MEMBER_PASSWORD, "Member")
        .expect("signup member");
    portal
        .login(MEMBER_EMAIL, MEMBER_PASSWORD)
        .expect("login member");
    portal
}

/// Memory store whose writes can be switched to fail, either for every key
/// or only for the keys in `fail_keys`
#[derive(Debug, Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_writes: bool,
    pub fail_keys: Vec<&'static str>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.fail_writes || self.fail_keys.contains(&key) {
            return Err(PortalError::Storage(std::io::Error::other(format!(
                "simulated write failure on {key}"
            ))));
        }
        Ok(())
    }
}

impl Store for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.check(key)?;
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check(key)?;
        self.inner.remove(key)
    }
}
