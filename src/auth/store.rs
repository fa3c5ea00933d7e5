use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("email `{0}` is already registered")]
    DuplicateEmail(String),
}

pub trait UserStore: Send + Sync + 'static {
    /// Inserts a user, failing if the email is already taken.
    fn insert(&self, user: UserRecord) -> Result<(), StoreError>;
    fn find_by_email(&self, email: &str) -> Option<UserRecord>;
}

/// Users keyed by their normalized email.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, UserRecord>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn insert(&self, user: UserRecord) -> Result<(), StoreError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail(user.email)),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        self.users.get(email).map(|user| user.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let store = InMemoryUserStore::new();
        let record = user("ana@example.com");
        store.insert(record.clone()).unwrap();

        assert_eq!(store.find_by_email("ana@example.com"), Some(record));
        assert_eq!(store.find_by_email("bob@example.com"), None);
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store.insert(user("ana@example.com")).unwrap();

        assert_eq!(
            store.insert(user("ana@example.com")),
            Err(StoreError::DuplicateEmail("ana@example.com".into()))
        );
    }
}
