//! In-memory project store.

use crate::models::{GenreId, KeywordId, Project, ProjectId, UserId};
use crate::storage::traits::ProjectStore;
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::RwLock;

/// In-memory project store. Projects are kept in submission order.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<Vec<Project>>,
}

impl InMemoryProjectStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(project: &Project, owner: Option<&UserId>, genre: Option<&GenreId>) -> bool {
    owner.is_none_or(|o| &project.owner == o) && genre.is_none_or(|g| &project.genre == g)
}

impl ProjectStore for InMemoryProjectStore {
    fn create_project(&self, project: &Project) -> Result<()> {
        let mut projects = self
            .projects
            .write()
            .map_err(|_| Error::operation("create_project", "Lock poisoned"))?;
        if projects.iter().any(|p| p.id == project.id) {
            return Err(Error::Conflict(format!("project {} already exists", project.id)));
        }
        projects.push(project.clone());
        Ok(())
    }

    fn attach_keywords(&self, id: &ProjectId, keywords: &BTreeSet<KeywordId>) -> Result<()> {
        let mut projects = self
            .projects
            .write()
            .map_err(|_| Error::operation("attach_keywords", "Lock poisoned"))?;
        let project = projects
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| Error::not_found("project", id.as_str()))?;
        project.keywords.clone_from(keywords);
        Ok(())
    }

    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let projects = self
            .projects
            .read()
            .map_err(|_| Error::operation("get_project", "Lock poisoned"))?;
        Ok(projects.iter().find(|p| &p.id == id).cloned())
    }

    fn list_projects(
        &self,
        owner: Option<&UserId>,
        genre: Option<&GenreId>,
    ) -> Result<Vec<Project>> {
        let projects = self
            .projects
            .read()
            .map_err(|_| Error::operation("list_projects", "Lock poisoned"))?;
        Ok(projects
            .iter()
            .filter(|p| matches(p, owner, genre))
            .cloned()
            .collect())
    }

    fn delete_project(&self, id: &ProjectId) -> Result<bool> {
        let mut projects = self
            .projects
            .write()
            .map_err(|_| Error::operation("delete_project", "Lock poisoned"))?;
        let before = projects.len();
        projects.retain(|p| &p.id != id);
        Ok(projects.len() != before)
    }

    fn delete_projects(&self, owner: Option<&UserId>, genre: Option<&GenreId>) -> Result<usize> {
        let mut projects = self
            .projects
            .write()
            .map_err(|_| Error::operation("delete_projects", "Lock poisoned"))?;
        let before = projects.len();
        projects.retain(|p| !matches(p, owner, genre));
        Ok(before - projects.len())
    }
}
