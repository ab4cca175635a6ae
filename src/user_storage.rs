use crate::user_models::User;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::info;

const USERS_FILE: &str = "users.json";

pub struct UserStorage {
    path: Option<PathBuf>,
    users: RwLock<Vec<User>>,
}

impl UserStorage {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(USERS_FILE);
        let users = if path.exists() {
            let data = fs::read_to_string(&path).context("Failed to read users file")?;
            serde_json::from_str(&data).context("Failed to parse users file")?
        } else {
            Vec::new()
        };

        Ok(Self {
            path: Some(path),
            users: RwLock::new(users),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            users: RwLock::new(Vec::new()),
        }
    }

    /// Hashes the password and stores a new user.
    pub async fn register(&self, username: &str, password: &str) -> Result<User> {
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash password")?;
        self.create_user(User::new(username.to_string(), password_hash)).await
    }

    pub async fn create_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.username == user.username) {
            bail!("Username already exists");
        }

        users.push(user.clone());
        self.save_users_to_disk(&users)?;
        info!(username = %user.username, "user registered");
        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.clone())
    }

    /// Maps user ids to usernames for every id that exists.
    pub async fn usernames<'a, I>(&self, ids: I) -> Result<HashMap<String, String>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let users = self.users.read().await;
        Ok(ids
            .into_iter()
            .filter_map(|id| users.iter().find(|u| &u.id == id))
            .map(|u| (u.id.clone(), u.username.clone()))
            .collect())
    }

    /// Returns the user when the password matches.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_user_by_username(username).await? else {
            return Ok(None);
        };
        let password = password.to_string();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("Password verification task failed")?
            .context("Failed to verify password")?;
        Ok(valid.then_some(user))
    }

    fn save_users_to_disk(&self, users: &[User]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(users).context("Failed to serialize users")?;
        fs::write(path, json).context("Failed to write to users file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_verify() {
        let storage = UserStorage::in_memory();
        let user = storage.register("alice", "correct horse").await.unwrap();

        let found = storage.verify_credentials("alice", "correct horse").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(storage.verify_credentials("alice", "wrong").await.unwrap().is_none());
        assert!(storage.verify_credentials("bob", "correct horse").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let storage = UserStorage::in_memory();
        storage.register("alice", "password1").await.unwrap();
        assert!(storage.register("alice", "password2").await.is_err());
    }

    #[tokio::test]
    async fn usernames_skip_unknown_ids() {
        let storage = UserStorage::in_memory();
        let alice = storage.register("alice", "password1").await.unwrap();
        let ids = vec![alice.id.clone(), "missing".to_string()];
        let names = storage.usernames(&ids).await.unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names.get(&alice.id).map(String::as_str), Some("alice"));
    }
}
