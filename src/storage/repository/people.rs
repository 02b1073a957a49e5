// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repositories for accounts and profiles, enforcing uniqueness.
//!
//! Uniqueness is checked by scanning the collection, so callers must hold
//! the application write gate across check and write.

use super::super::{DocumentStorage, StorageError, StorageResult};
use super::{Collection, Document};
use crate::domain::people::{normalize_email, normalize_username};
use crate::domain::{Advisor, Member, PeerEducator, User};

/// Repository for user accounts.
pub struct UserRepository<'a> {
    users: Collection<'a, User>,
}

impl<'a> UserRepository<'a> {
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self {
            users: storage.collection(),
        }
    }

    pub fn get(&self, user_id: &str) -> StorageResult<User> {
        self.users.get(user_id)
    }

    pub fn list_all(&self) -> StorageResult<Vec<User>> {
        self.users.list_all()
    }

    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let email = normalize_email(email);
        self.users.find_one(|u| normalize_email(&u.email) == email)
    }

    /// Look up by email or username, case-insensitively.
    pub fn find_by_login(&self, identifier: &str) -> StorageResult<Option<User>> {
        if identifier.contains('@') {
            return self.find_by_email(identifier);
        }
        let username = normalize_username(identifier);
        self.users
            .find_one(|u| normalize_username(&u.username) == username)
    }

    fn check_unique(&self, user: &User) -> StorageResult<()> {
        let email = normalize_email(&user.email);
        let username = normalize_username(&user.username);
        for other in self.users.list_all()? {
            if other.id == user.id {
                continue;
            }
            if normalize_email(&other.email) == email {
                return Err(StorageError::AlreadyExists("User with this email".to_string()));
            }
            if normalize_username(&other.username) == username {
                return Err(StorageError::AlreadyExists("User with this username".to_string()));
            }
        }
        Ok(())
    }

    pub fn create(&self, user: &User) -> StorageResult<()> {
        self.check_unique(user)?;
        let mut user = user.clone();
        user.normalize_roles();
        self.users.insert(&user)
    }

    /// Persist changes. The legacy role field is folded into the set.
    pub fn update(&self, user: &mut User) -> StorageResult<()> {
        self.check_unique(user)?;
        user.normalize_roles();
        self.users.save(user)
    }

    pub fn delete(&self, user_id: &str) -> StorageResult<()> {
        self.users.delete(user_id)
    }
}

/// Repository for member profiles (one per user, unique student id).
pub struct MemberRepository<'a> {
    members: Collection<'a, Member>,
}

impl<'a> MemberRepository<'a> {
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self {
            members: storage.collection(),
        }
    }

    pub fn get(&self, member_id: &str) -> StorageResult<Member> {
        self.members.get(member_id)
    }

    pub fn list_all(&self) -> StorageResult<Vec<Member>> {
        self.members.list_all()
    }

    pub fn find_by_user(&self, user_id: &str) -> StorageResult<Option<Member>> {
        self.members.find_one(|m| m.user_id == user_id)
    }

    fn check_unique(&self, member: &Member) -> StorageResult<()> {
        let student_id = member.student_id.trim().to_lowercase();
        for other in self.members.list_all()? {
            if other.id == member.id {
                continue;
            }
            if other.user_id == member.user_id {
                return Err(StorageError::AlreadyExists(
                    "Member profile for this user".to_string(),
                ));
            }
            if other.student_id.trim().to_lowercase() == student_id {
                return Err(StorageError::AlreadyExists(
                    "Member with this student ID".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn create(&self, member: &Member) -> StorageResult<()> {
        self.check_unique(member)?;
        self.members.insert(member)
    }

    pub fn update(&self, member: &Member) -> StorageResult<()> {
        self.check_unique(member)?;
        self.members.save(member)
    }

    pub fn delete(&self, member_id: &str) -> StorageResult<()> {
        self.members.delete(member_id)
    }
}

/// Profiles attached one-to-one to a user account.
pub trait UserLinked: Document {
    fn user_id(&self) -> &str;
}

impl UserLinked for Advisor {
    fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl UserLinked for PeerEducator {
    fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Repository for advisor and peer-educator profiles (unique per user).
pub struct ProfileRepository<'a, T> {
    profiles: Collection<'a, T>,
}

impl<'a, T: UserLinked> ProfileRepository<'a, T> {
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self {
            profiles: storage.collection(),
        }
    }

    pub fn get(&self, id: &str) -> StorageResult<T> {
        self.profiles.get(id)
    }

    pub fn list_all(&self) -> StorageResult<Vec<T>> {
        self.profiles.list_all()
    }

    pub fn find_by_user(&self, user_id: &str) -> StorageResult<Option<T>> {
        self.profiles.find_one(|p| p.user_id() == user_id)
    }

    pub fn create(&self, profile: &T) -> StorageResult<()> {
        if self.find_by_user(profile.user_id())?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "{} profile for this user",
                T::LABEL
            )));
        }
        self.profiles.insert(profile)
    }

    pub fn update(&self, profile: &T) -> StorageResult<()> {
        self.profiles.save(profile)
    }

    pub fn delete(&self, id: &str) -> StorageResult<()> {
        self.profiles.delete(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::domain::people::NewUser;
    use crate::domain::{new_id, MembershipStatus, PeerEducatorStatus};
    use crate::storage::StoragePaths;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = DocumentStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    fn user(username: &str, email: &str) -> User {
        User::new(
            NewUser {
                username: username.into(),
                email: email.into(),
                password_hash: "h".into(),
                first_name: "F".into(),
                last_name: "L".into(),
                phone: None,
            },
            Utc::now(),
        )
    }

    fn member(user_id: &str, student_id: &str) -> Member {
        let now = Utc::now();
        Member {
            id: new_id(),
            user_id: user_id.into(),
            student_id: student_id.into(),
            department: "Public Health".into(),
            year_of_study: 1,
            membership_status: MembershipStatus::Pending,
            volunteer_hours: 0.0,
            interests: vec![],
            emergency_contact: None,
            joined_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn email_and_username_are_unique_case_insensitively() {
        let (_temp, storage) = setup();
        let repo = UserRepository::new(&storage);
        repo.create(&user("alice", "alice@uni.edu")).unwrap();

        let dup_email = repo.create(&user("alice2", "ALICE@uni.edu")).unwrap_err();
        assert_eq!(dup_email.to_string(), "Already exists: User with this email");

        let dup_name = repo.create(&user("Alice", "other@uni.edu")).unwrap_err();
        assert!(matches!(dup_name, StorageError::AlreadyExists(m) if m.contains("username")));
    }

    #[test]
    fn login_lookup_by_email_or_username() {
        let (_temp, storage) = setup();
        let repo = UserRepository::new(&storage);
        let created = user("bob_1", "bob@uni.edu");
        repo.create(&created).unwrap();

        assert_eq!(repo.find_by_login("BOB@uni.edu").unwrap().unwrap().id, created.id);
        assert_eq!(repo.find_by_login("Bob_1").unwrap().unwrap().id, created.id);
        assert!(repo.find_by_login("nobody").unwrap().is_none());
    }

    #[test]
    fn update_normalizes_legacy_role() {
        let (_temp, storage) = setup();
        let repo = UserRepository::new(&storage);
        let mut u = user("carol", "carol@uni.edu");
        repo.create(&u).unwrap();

        u.role = Some(Role::Moderator);
        repo.update(&mut u).unwrap();

        let stored = repo.get(&u.id).unwrap();
        assert!(stored.role.is_none());
        assert!(stored.roles.contains(&Role::Moderator));
        assert!(stored.roles.contains(&Role::Member));
    }

    #[test]
    fn one_member_profile_per_user_and_unique_student_id() {
        let (_temp, storage) = setup();
        let repo = MemberRepository::new(&storage);
        repo.create(&member("u1", "S-100")).unwrap();

        assert!(repo.create(&member("u1", "S-200")).is_err());
        assert!(repo.create(&member("u2", "s-100")).is_err());
        repo.create(&member("u2", "S-200")).unwrap();
        assert_eq!(repo.find_by_user("u2").unwrap().unwrap().student_id, "S-200");
    }

    #[test]
    fn peer_educator_profile_unique_per_user() {
        let (_temp, storage) = setup();
        let repo = ProfileRepository::<PeerEducator>::new(&storage);
        let now = Utc::now();
        let profile = PeerEducator {
            id: new_id(),
            user_id: "u1".into(),
            status: PeerEducatorStatus::Trainee,
            specializations: vec![],
            certification_date: None,
            bio: None,
            created_at: now,
            updated_at: now,
        };
        repo.create(&profile).unwrap();
        let dup = PeerEducator {
            id: new_id(),
            ..profile
        };
        let err = repo.create(&dup).unwrap_err();
        assert_eq!(err.to_string(), "Already exists: Peer educator profile for this user");
    }
}
