use std::path::Path;

use bevy::reflect::Reflect;
use serde::{Deserialize, Serialize};

use crate::errors::{CatalogError, CatalogResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct AvatarEntry {
    pub id: String,
    /// Human readable name.
    pub label: String,
    /// Model file, relative to the catalog's `base_path`.
    pub file: String,
    #[serde(default)]
    pub gender: Gender,
}

/// A validated, non-empty avatar list with unique ids.
#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct AvatarCatalog {
    #[serde(default)]
    base_path: String,
    #[serde(default)]
    default: Option<String>,
    avatars: Vec<AvatarEntry>,
}

impl AvatarCatalog {
    pub fn new(
        base_path: impl Into<String>,
        default: Option<String>,
        avatars: Vec<AvatarEntry>,
    ) -> CatalogResult<Self> {
        let catalog = Self {
            base_path: base_path.into(),
            default,
            avatars,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_ron_str(source: &str) -> CatalogResult<Self> {
        let catalog: Self = ron::de::from_str(source)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    fn validate(&self) -> CatalogResult<()> {
        if self.avatars.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, entry) in self.avatars.iter().enumerate() {
            if self.avatars[..i].iter().any(|other| other.id == entry.id) {
                return Err(CatalogError::DuplicateId(entry.id.clone()));
            }
        }
        match &self.default {
            Some(default) if self.get(default).is_none() => {
                Err(CatalogError::UnknownDefault(default.clone()))
            }
            _ => Ok(()),
        }
    }

    pub fn get(&self, id: &str) -> Option<&AvatarEntry> {
        self.avatars.iter().find(|entry| entry.id == id)
    }

    /// Looks up `id`, falling back to the first avatar for unknown ids.
    pub fn resolve(&self, id: &str) -> &AvatarEntry {
        self.get(id).unwrap_or_else(|| self.first())
    }

    /// The configured default avatar, or the first one.
    pub fn default_entry(&self) -> &AvatarEntry {
        match &self.default {
            Some(id) => self.resolve(id),
            None => self.first(),
        }
    }

    fn first(&self) -> &AvatarEntry {
        // Validation guarantees at least one entry.
        &self.avatars[0]
    }

    /// The avatar after `id` in catalog order, wrapping around.
    pub fn next_after(&self, id: &str) -> &AvatarEntry {
        let next = self
            .avatars
            .iter()
            .position(|entry| entry.id == id)
            .map_or(0, |index| (index + 1) % self.avatars.len());
        &self.avatars[next]
    }

    /// Asset path of an entry's model file.
    pub fn asset_path(&self, entry: &AvatarEntry) -> String {
        let base = self.base_path.trim_end_matches('/');
        if base.is_empty() {
            entry.file.clone()
        } else {
            format!("{base}/{}", entry.file)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AvatarEntry> {
        self.avatars.iter()
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    /// Always false for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }
}
