// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the document store.
//!
//! Every entity type implements [`Document`], which names its collection
//! directory. [`Collection`] then provides the common CRUD operations;
//! entities with uniqueness constraints get a dedicated repository on top.

use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};

use super::document_store::is_safe_id;
use super::{DocumentStorage, StorageError, StorageResult};
use crate::domain::{
    Advisor, AnonymousQuestion, Event, Feedback, Gallery, Member, PeerEducationSession,
    PeerEducator, Resource, Story, TrainingContent, User,
};

pub mod people;
pub mod settings;

pub use people::{MemberRepository, ProfileRepository, UserRepository};
pub use settings::SettingsRepository;

/// A record stored as one JSON file in its collection directory.
pub trait Document: Serialize + DeserializeOwned {
    /// Directory name under the data root.
    const COLLECTION: &'static str;
    /// Human-readable entity name used in error messages.
    const LABEL: &'static str;

    fn id(&self) -> &str;
}

macro_rules! document {
    ($ty:ty, $collection:literal, $label:literal) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;
            const LABEL: &'static str = $label;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

document!(User, "users", "User");
document!(Member, "members", "Member");
document!(Advisor, "advisors", "Advisor");
document!(PeerEducator, "peer_educators", "Peer educator");
document!(Event, "events", "Event");
document!(PeerEducationSession, "sessions", "Session");
document!(Resource, "resources", "Resource");
document!(TrainingContent, "training", "Training content");
document!(Story, "stories", "Story");
document!(Gallery, "galleries", "Gallery");
document!(AnonymousQuestion, "questions", "Question");
document!(Feedback, "feedback", "Feedback");

/// Every collection directory created at initialization.
pub const COLLECTIONS: &[&str] = &[
    User::COLLECTION,
    Member::COLLECTION,
    Advisor::COLLECTION,
    PeerEducator::COLLECTION,
    Event::COLLECTION,
    PeerEducationSession::COLLECTION,
    Resource::COLLECTION,
    TrainingContent::COLLECTION,
    Story::COLLECTION,
    Gallery::COLLECTION,
    AnonymousQuestion::COLLECTION,
    Feedback::COLLECTION,
];

/// CRUD over one collection.
pub struct Collection<'a, T> {
    storage: &'a DocumentStorage,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Document> Collection<'a, T> {
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self {
            storage,
            _marker: PhantomData,
        }
    }

    fn not_found() -> StorageError {
        StorageError::NotFound(T::LABEL.to_string())
    }

    fn path(&self, id: &str) -> StorageResult<PathBuf> {
        if !is_safe_id(id) {
            return Err(Self::not_found());
        }
        Ok(self.storage.paths().document(T::COLLECTION, id))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path(id).is_ok_and(|p| self.storage.exists(p))
    }

    pub fn get(&self, id: &str) -> StorageResult<T> {
        let path = self.path(id)?;
        if !self.storage.exists(&path) {
            return Err(Self::not_found());
        }
        self.storage.read_json(path)
    }

    pub fn insert(&self, doc: &T) -> StorageResult<()> {
        let path = self.path(doc.id())?;
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(T::LABEL.to_string()));
        }
        self.storage.write_json(path, doc)
    }

    /// Overwrite an existing document.
    pub fn save(&self, doc: &T) -> StorageResult<()> {
        let path = self.path(doc.id())?;
        if !self.storage.exists(&path) {
            return Err(Self::not_found());
        }
        self.storage.write_json(path, doc)
    }

    pub fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.path(id)?;
        if !self.storage.exists(&path) {
            return Err(Self::not_found());
        }
        self.storage.delete(path)
    }

    /// Every readable document. Unreadable files are logged and skipped.
    pub fn list_all(&self) -> StorageResult<Vec<T>> {
        let dir = self.storage.paths().collection_dir(T::COLLECTION);
        let ids = self.storage.list_files(dir, "json")?;

        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(
                    collection = T::COLLECTION,
                    id = %id,
                    error = %e,
                    "Skipping unreadable document"
                ),
            }
        }
        Ok(docs)
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> StorageResult<Vec<T>> {
        Ok(self.list_all()?.into_iter().filter(|d| predicate(d)).collect())
    }

    pub fn find_one(&self, predicate: impl Fn(&T) -> bool) -> StorageResult<Option<T>> {
        Ok(self.list_all()?.into_iter().find(|d| predicate(d)))
    }

    pub fn count(&self, predicate: impl Fn(&T) -> bool) -> StorageResult<usize> {
        Ok(self.list_all()?.iter().filter(|d| predicate(d)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = DocumentStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    fn feedback(subject: &str) -> Feedback {
        Feedback::new(
            None,
            crate::domain::FeedbackType::General,
            subject.to_string(),
            "Some message body".to_string(),
            None,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn insert_get_save_delete() {
        let (_temp, storage) = setup();
        let repo = storage.collection::<Feedback>();
        let mut doc = feedback("Hello");

        repo.insert(&doc).unwrap();
        assert!(matches!(repo.insert(&doc), Err(StorageError::AlreadyExists(_))));
        assert_eq!(repo.get(&doc.id).unwrap().subject, "Hello");

        doc.subject = "Updated".into();
        repo.save(&doc).unwrap();
        assert_eq!(repo.get(&doc.id).unwrap().subject, "Updated");

        repo.delete(&doc.id).unwrap();
        assert!(!repo.exists(&doc.id));
        assert!(matches!(repo.get(&doc.id), Err(StorageError::NotFound(label)) if label == "Feedback"));
    }

    #[test]
    fn save_requires_existing_document() {
        let (_temp, storage) = setup();
        let repo = storage.collection::<Feedback>();
        assert!(matches!(repo.save(&feedback("x")), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn unsafe_ids_are_not_found() {
        let (_temp, storage) = setup();
        let repo = storage.collection::<Feedback>();
        assert!(matches!(repo.get("../settings"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn find_and_count() {
        let (_temp, storage) = setup();
        let repo = storage.collection::<Feedback>();
        repo.insert(&feedback("a")).unwrap();
        repo.insert(&feedback("b")).unwrap();
        repo.insert(&feedback("a")).unwrap();

        assert_eq!(repo.list_all().unwrap().len(), 3);
        assert_eq!(repo.count(|f| f.subject == "a").unwrap(), 2);
        assert!(repo.find_one(|f| f.subject == "b").unwrap().is_some());
        assert!(repo.find(|f| f.subject == "z").unwrap().is_empty());
    }
}
