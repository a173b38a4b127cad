//! In-memory catalog store.

use crate::models::{Genre, GenreId, User, UserId, name_key};
use crate::storage::traits::CatalogStore;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    genres: HashMap<GenreId, Genre>,
}

/// In-memory user and genre store.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<State>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &str) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::operation(operation, "Lock poisoned"))
    }

    fn write(&self, operation: &str) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::operation(operation, "Lock poisoned"))
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn create_user(&self, user: &User) -> Result<()> {
        let mut state = self.write("create_user")?;
        let key = name_key(&user.username);
        if state
            .users
            .values()
            .any(|u| u.id == user.id || name_key(&u.username) == key)
        {
            return Err(Error::Conflict(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.read("get_user")?.users.get(id).cloned())
    }

    fn find_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let key = name_key(username);
        Ok(self
            .read("find_user_by_name")?
            .users
            .values()
            .find(|u| name_key(&u.username) == key)
            .cloned())
    }

    fn delete_user(&self, id: &UserId) -> Result<bool> {
        Ok(self.write("delete_user")?.users.remove(id).is_some())
    }

    fn create_genre(&self, genre: &Genre) -> Result<()> {
        let mut state = self.write("create_genre")?;
        let key = name_key(&genre.name);
        if state
            .genres
            .values()
            .any(|g| g.id == genre.id || name_key(&g.name) == key)
        {
            return Err(Error::Conflict(format!(
                "genre '{}' already exists",
                genre.name
            )));
        }
        state.genres.insert(genre.id.clone(), genre.clone());
        Ok(())
    }

    fn get_genre(&self, id: &GenreId) -> Result<Option<Genre>> {
        Ok(self.read("get_genre")?.genres.get(id).cloned())
    }

    fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let key = name_key(name);
        Ok(self
            .read("find_genre_by_name")?
            .genres
            .values()
            .find(|g| name_key(&g.name) == key)
            .cloned())
    }

    fn list_genres(&self) -> Result<Vec<Genre>> {
        let mut genres: Vec<Genre> = self.read("list_genres")?.genres.values().cloned().collect();
        genres.sort_by(|a, b| {
            name_key(&a.name)
                .cmp(&name_key(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(genres)
    }

    fn delete_genre(&self, id: &GenreId) -> Result<bool> {
        Ok(self.write("delete_genre")?.genres.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usernames_are_unique_ignoring_case() {
        let store = InMemoryCatalogStore::new();
        store.create_user(&User::new("alice")).unwrap();
        assert!(store.create_user(&User::new("Alice")).unwrap_err().is_conflict());
        assert!(store.find_user_by_name("ALICE").unwrap().is_some());
    }

    #[test]
    fn test_genres_listed_by_name() {
        let store = InMemoryCatalogStore::new();
        for name in ["techno", "Ambient", "jazz"] {
            store.create_genre(&Genre::new(name, None)).unwrap();
        }
        let names: Vec<String> = store
            .list_genres()
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Ambient", "jazz", "techno"]);
    }

    #[test]
    fn test_delete_genre() {
        let store = InMemoryCatalogStore::new();
        let genre = Genre::new("lofi", None);
        store.create_genre(&genre).unwrap();
        assert!(store.delete_genre(&genre.id).unwrap());
        assert!(!store.delete_genre(&genre.id).unwrap());
        assert!(store.get_genre(&genre.id).unwrap().is_none());
    }
}
