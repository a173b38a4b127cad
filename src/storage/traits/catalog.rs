//! Catalog store trait for users and genres.

use crate::Result;
use crate::models::{Genre, GenreId, User, UserId};

/// Trait for user and genre storage.
///
/// Usernames and genre names are unique, compared case-insensitively.
pub trait CatalogStore: Send + Sync {
    /// Persists a new user.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if the username is taken.
    fn create_user(&self, user: &User) -> Result<()>;

    /// Retrieves a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Finds a user by username, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_user_by_name(&self, username: &str) -> Result<Option<User>>;

    /// Deletes a user. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_user(&self, id: &UserId) -> Result<bool>;

    /// Persists a new genre.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if the name is taken.
    fn create_genre(&self, genre: &Genre) -> Result<()>;

    /// Retrieves a genre by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_genre(&self, id: &GenreId) -> Result<Option<Genre>>;

    /// Finds a genre by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>>;

    /// Lists all genres ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_genres(&self) -> Result<Vec<Genre>>;

    /// Deletes a genre. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_genre(&self, id: &GenreId) -> Result<bool>;
}
