use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
}

/// Credential store backed by a single JSON file.
///
/// The path is injected by the caller; a missing file reads as an empty
/// store. Every mutation rewrites the whole file, which is fine at the
/// handful-of-users scale this runs at.
#[derive(Clone, Debug)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Vec<UserRecord>> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::de::from_slice(&bytes)
                .with_context(|| format!("malformed user store {}", self.path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read {}", self.path.display()))
            }
        }
    }

    async fn save(&self, users: &[UserRecord]) -> Result<()> {
        let json = serde_json::ser::to_vec_pretty(users)?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let users = self.load().await?;
        Ok(users.into_iter().find(|user| user.username == username))
    }

    /// Registers a new user. Returns false if the username is taken.
    pub async fn insert(&self, username: &str, password: &str) -> Result<bool> {
        let mut users = self.load().await?;
        if users.iter().any(|user| user.username == username) {
            return Ok(false);
        }
        users.push(UserRecord {
            username: username.to_string(),
            password: password.to_string(),
        });
        self.save(&users).await?;
        debug!("registered user {}", username);
        Ok(true)
    }

    pub async fn update_password(&self, username: &str, password: &str) -> Result<()> {
        let mut users = self.load().await?;
        for user in users.iter_mut().filter(|user| user.username == username) {
            user.password = password.to_string();
        }
        self.save(&users).await
    }

    pub async fn delete(&self, username: &str) -> Result<()> {
        let mut users = self.load().await?;
        users.retain(|user| user.username != username);
        self.save(&users).await
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        let user = self.find_by_username(username).await?;
        Ok(user.is_some_and(|user| user.password == password))
    }
}
