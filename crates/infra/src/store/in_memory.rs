use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use registrar_academics::{Course, Department, Enrollment, Student};
use registrar_auth::PermissionCode;
use registrar_core::{CourseId, DepartmentId, EnrollmentId, PermissionId, StudentId, UserId};

use super::messages::{self, still_referenced};
use super::{
    Grant, PermissionRecord, PermissionStore, Record, RecordStore, StoreError, UserChanges,
    UserRecord, UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, UserRecord>,
    permissions: HashMap<PermissionId, PermissionRecord>,
    grants: BTreeSet<(UserId, PermissionId)>,
    departments: HashMap<DepartmentId, Department>,
    students: HashMap<StudentId, Student>,
    courses: HashMap<CourseId, Course>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
}

impl Tables {
    fn active_user(&self, id: UserId) -> Option<&UserRecord> {
        self.users.get(&id).filter(|u| u.exists)
    }

    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    /// Permission records granted to `user_id`, ordered by code.
    fn granted(&self, user_id: UserId) -> Vec<PermissionRecord> {
        let mut records: Vec<_> = self
            .grants
            .iter()
            .filter(|(u, _)| *u == user_id)
            .filter_map(|(_, p)| self.permissions.get(p).cloned())
            .collect();
        records.sort_by(|a, b| a.code.cmp(&b.code));
        records
    }
}

/// In-memory store for tests/dev.
///
/// One lock guards every table so that constraint checks and the write they
/// protect happen atomically.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".into()))
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let mut tables = self.write()?;
        if tables.username_taken(username, None) {
            return Err(StoreError::Conflict(messages::USERNAME_TAKEN.into()));
        }
        let user = UserRecord {
            id: UserId::new(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            exists: true,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_active_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.exists && u.username == username)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.read()?;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_active_user(&self, id: UserId) -> Result<UserRecord, StoreError> {
        let tables = self.read()?;
        tables.active_user(id).cloned().ok_or(StoreError::NotFound("user"))
    }

    async fn list_active_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let tables = self.read()?;
        let mut users: Vec<_> = tables.users.values().filter(|u| u.exists).cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<UserRecord, StoreError> {
        let mut tables = self.write()?;
        if tables.active_user(id).is_none() {
            return Err(StoreError::NotFound("user"));
        }
        if let Some(username) = &changes.username {
            if tables.username_taken(username, Some(id)) {
                return Err(StoreError::Conflict(messages::USERNAME_TAKEN.into()));
            }
        }
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(user.clone())
    }

    async fn soft_delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        match tables.users.get_mut(&id) {
            Some(user) if user.exists => {
                user.exists = false;
                Ok(())
            }
            _ => Err(StoreError::NotFound("user")),
        }
    }
}

#[async_trait::async_trait]
impl PermissionStore for InMemoryStore {
    async fn create_permission(
        &self,
        name: &str,
        code: &PermissionCode,
    ) -> Result<PermissionRecord, StoreError> {
        let mut tables = self.write()?;
        if tables.permissions.values().any(|p| &p.code == code) {
            return Err(StoreError::Conflict(messages::PERMISSION_CODE_TAKEN.into()));
        }
        let record = PermissionRecord {
            id: PermissionId::new(),
            name: name.to_string(),
            code: code.clone(),
        };
        tables.permissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn ensure_permission(
        &self,
        name: &str,
        code: &PermissionCode,
    ) -> Result<PermissionRecord, StoreError> {
        let mut tables = self.write()?;
        if let Some(existing) = tables.permissions.values().find(|p| &p.code == code) {
            return Ok(existing.clone());
        }
        let record = PermissionRecord {
            id: PermissionId::new(),
            name: name.to_string(),
            code: code.clone(),
        };
        tables.permissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, StoreError> {
        let tables = self.read()?;
        let mut all: Vec<_> = tables.permissions.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(all)
    }

    async fn grant(&self, user_id: UserId, permission_id: PermissionId) -> Result<Grant, StoreError> {
        let mut tables = self.write()?;
        if tables.active_user(user_id).is_none() {
            return Err(StoreError::NotFound("user"));
        }
        if !tables.permissions.contains_key(&permission_id) {
            return Err(StoreError::NotFound("permission"));
        }
        if !tables.grants.insert((user_id, permission_id)) {
            return Err(StoreError::Conflict(messages::ALREADY_GRANTED.into()));
        }
        Ok(Grant {
            user_id,
            permission_id,
        })
    }

    async fn revoke(&self, user_id: UserId, permission_id: PermissionId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.grants.remove(&(user_id, permission_id)) {
            Ok(())
        } else {
            Err(StoreError::NotFound("grant"))
        }
    }

    async fn permissions_of(&self, user_id: UserId) -> Result<Vec<PermissionRecord>, StoreError> {
        let tables = self.read()?;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("user"));
        }
        Ok(tables.granted(user_id))
    }

    async fn granted_codes(&self, user_id: UserId) -> Result<Vec<PermissionCode>, StoreError> {
        let tables = self.read()?;
        if tables.active_user(user_id).is_none() {
            return Err(StoreError::NotFound("user"));
        }
        Ok(tables.granted(user_id).into_iter().map(|p| p.code).collect())
    }
}

/// Table access and constraint checks per record type.
trait Table: Record {
    fn rows(tables: &Tables) -> &HashMap<Self::Id, Self>;
    fn rows_mut(tables: &mut Tables) -> &mut HashMap<Self::Id, Self>;

    /// Uniqueness and reference checks for `candidate`, which may replace an existing row.
    fn check_write(tables: &Tables, candidate: &Self) -> Result<(), StoreError>;

    fn is_referenced(tables: &Tables, id: Self::Id) -> bool;
}

impl Table for Department {
    fn rows(tables: &Tables) -> &HashMap<DepartmentId, Self> {
        &tables.departments
    }

    fn rows_mut(tables: &mut Tables) -> &mut HashMap<DepartmentId, Self> {
        &mut tables.departments
    }

    fn check_write(tables: &Tables, candidate: &Self) -> Result<(), StoreError> {
        if tables
            .departments
            .values()
            .any(|d| d.id != candidate.id && d.name == candidate.name)
        {
            return Err(StoreError::Conflict(messages::DEPARTMENT_NAME_TAKEN.into()));
        }
        Ok(())
    }

    fn is_referenced(tables: &Tables, id: DepartmentId) -> bool {
        tables.students.values().any(|s| s.dept_id == id)
            || tables.courses.values().any(|c| c.dept_id == id)
    }
}

impl Table for Student {
    fn rows(tables: &Tables) -> &HashMap<StudentId, Self> {
        &tables.students
    }

    fn rows_mut(tables: &mut Tables) -> &mut HashMap<StudentId, Self> {
        &mut tables.students
    }

    fn check_write(tables: &Tables, candidate: &Self) -> Result<(), StoreError> {
        if !tables.departments.contains_key(&candidate.dept_id) {
            return Err(StoreError::InvalidReference(messages::MISSING_DEPARTMENT.into()));
        }
        if tables
            .students
            .values()
            .any(|s| s.id != candidate.id && s.email == candidate.email)
        {
            return Err(StoreError::Conflict(messages::STUDENT_EMAIL_TAKEN.into()));
        }
        Ok(())
    }

    fn is_referenced(tables: &Tables, id: StudentId) -> bool {
        tables.enrollments.values().any(|e| e.student_id == id)
    }
}

impl Table for Course {
    fn rows(tables: &Tables) -> &HashMap<CourseId, Self> {
        &tables.courses
    }

    fn rows_mut(tables: &mut Tables) -> &mut HashMap<CourseId, Self> {
        &mut tables.courses
    }

    fn check_write(tables: &Tables, candidate: &Self) -> Result<(), StoreError> {
        if !tables.departments.contains_key(&candidate.dept_id) {
            return Err(StoreError::InvalidReference(messages::MISSING_DEPARTMENT.into()));
        }
        Ok(())
    }

    fn is_referenced(tables: &Tables, id: CourseId) -> bool {
        tables.enrollments.values().any(|e| e.course_id == id)
    }
}

impl Table for Enrollment {
    fn rows(tables: &Tables) -> &HashMap<EnrollmentId, Self> {
        &tables.enrollments
    }

    fn rows_mut(tables: &mut Tables) -> &mut HashMap<EnrollmentId, Self> {
        &mut tables.enrollments
    }

    fn check_write(tables: &Tables, candidate: &Self) -> Result<(), StoreError> {
        if !tables.students.contains_key(&candidate.student_id) {
            return Err(StoreError::InvalidReference(messages::MISSING_STUDENT.into()));
        }
        if !tables.courses.contains_key(&candidate.course_id) {
            return Err(StoreError::InvalidReference(messages::MISSING_COURSE.into()));
        }
        if tables.enrollments.values().any(|e| {
            e.id != candidate.id
                && e.student_id == candidate.student_id
                && e.course_id == candidate.course_id
        }) {
            return Err(StoreError::Conflict(messages::ALREADY_ENROLLED.into()));
        }
        Ok(())
    }

    fn is_referenced(_tables: &Tables, _id: EnrollmentId) -> bool {
        false
    }
}

impl InMemoryStore {
    fn list_rows<R: Table>(&self) -> Result<Vec<R>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<R> = R::rows(&tables).values().cloned().collect();
        rows.sort_by_key(|r| r.id());
        Ok(rows)
    }

    fn get_row<R: Table>(&self, id: R::Id) -> Result<R, StoreError> {
        let tables = self.read()?;
        R::rows(&tables).get(&id).cloned().ok_or(StoreError::NotFound(R::KIND))
    }

    fn insert_row<R: Table>(&self, draft: R::Draft) -> Result<R, StoreError> {
        let record = R::build(R::new_id(), draft);
        let mut tables = self.write()?;
        R::check_write(&tables, &record)?;
        R::rows_mut(&mut tables).insert(record.id(), record.clone());
        Ok(record)
    }

    fn update_row<R: Table>(&self, id: R::Id, draft: R::Draft) -> Result<R, StoreError> {
        let record = R::build(id, draft);
        let mut tables = self.write()?;
        if !R::rows(&tables).contains_key(&id) {
            return Err(StoreError::NotFound(R::KIND));
        }
        R::check_write(&tables, &record)?;
        R::rows_mut(&mut tables).insert(id, record.clone());
        Ok(record)
    }

    fn delete_row<R: Table>(&self, id: R::Id) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !R::rows(&tables).contains_key(&id) {
            return Err(StoreError::NotFound(R::KIND));
        }
        if R::is_referenced(&tables, id) {
            return Err(StoreError::Conflict(still_referenced(R::KIND)));
        }
        R::rows_mut(&mut tables).remove(&id);
        Ok(())
    }
}

macro_rules! record_store {
    ($($record:ty),+ $(,)?) => {$(
        #[async_trait::async_trait]
        impl RecordStore<$record> for InMemoryStore {
            async fn list(&self) -> Result<Vec<$record>, StoreError> {
                self.list_rows()
            }

            async fn get(&self, id: <$record as Record>::Id) -> Result<$record, StoreError> {
                self.get_row::<$record>(id)
            }

            async fn insert(&self, draft: <$record as Record>::Draft) -> Result<$record, StoreError> {
                self.insert_row::<$record>(draft)
            }

            async fn update(
                &self,
                id: <$record as Record>::Id,
                draft: <$record as Record>::Draft,
            ) -> Result<$record, StoreError> {
                self.update_row::<$record>(id, draft)
            }

            async fn delete(&self, id: <$record as Record>::Id) -> Result<(), StoreError> {
                self.delete_row::<$record>(id)
            }
        }
    )+};
}

record_store!(Department, Student, Course, Enrollment);

#[cfg(test)]
mod tests {
    use registrar_academics::{CourseDraft, DepartmentDraft, EnrollmentDraft, StudentDraft};
    use registrar_auth::codes;

    use super::*;

    async fn department(store: &InMemoryStore, name: &str) -> Department {
        RecordStore::<Department>::insert(store, DepartmentDraft { name: name.into() })
            .await
            .unwrap()
    }

    async fn student(store: &InMemoryStore, dept_id: DepartmentId, email: &str) -> Student {
        RecordStore::<Student>::insert(
            store,
            StudentDraft {
                name: "Ahmed".into(),
                email: email.into(),
                dept_id,
            },
        )
        .await
        .unwrap()
    }

    async fn course(store: &InMemoryStore, dept_id: DepartmentId) -> Course {
        RecordStore::<Course>::insert(
            store,
            CourseDraft {
                title: "Algorithms".into(),
                credits: 3,
                dept_id,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn usernames_stay_reserved_after_soft_delete() {
        let store = InMemoryStore::new();
        let user = store.create_user("alice", "hash").await.unwrap();
        store.soft_delete_user(user.id).await.unwrap();

        assert!(store.find_active_by_username("alice").await.unwrap().is_none());
        assert_eq!(
            store.create_user("alice", "other").await.unwrap_err(),
            StoreError::Conflict(messages::USERNAME_TAKEN.into())
        );
        assert_eq!(
            store.get_active_user(user.id).await.unwrap_err(),
            StoreError::NotFound("user")
        );
    }

    #[tokio::test]
    async fn update_user_rejects_a_taken_username() {
        let store = InMemoryStore::new();
        store.create_user("alice", "hash").await.unwrap();
        let bob = store.create_user("bob", "hash").await.unwrap();

        let err = store
            .update_user(
                bob.id,
                UserChanges {
                    username: Some("alice".into()),
                    password_hash: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let renamed = store
            .update_user(
                bob.id,
                UserChanges {
                    username: Some("robert".into()),
                    password_hash: Some("new-hash".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.username, "robert");
        assert_eq!(renamed.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn grants_are_unique_and_revocable() {
        let store = InMemoryStore::new();
        let user = store.create_user("alice", "hash").await.unwrap();
        let perm = store
            .create_permission("Create department", &codes::DEPARTMENTS_CREATE)
            .await
            .unwrap();

        store.grant(user.id, perm.id).await.unwrap();
        assert!(matches!(
            store.grant(user.id, perm.id).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(
            store.granted_codes(user.id).await.unwrap(),
            vec![codes::DEPARTMENTS_CREATE]
        );

        store.revoke(user.id, perm.id).await.unwrap();
        assert!(store.granted_codes(user.id).await.unwrap().is_empty());
        assert_eq!(
            store.revoke(user.id, perm.id).await.unwrap_err(),
            StoreError::NotFound("grant")
        );
    }

    #[tokio::test]
    async fn grant_requires_an_active_user_and_a_known_permission() {
        let store = InMemoryStore::new();
        let user = store.create_user("alice", "hash").await.unwrap();
        let perm = store
            .create_permission("View students", &codes::STUDENTS_VIEW)
            .await
            .unwrap();

        assert_eq!(
            store.grant(UserId::new(), perm.id).await.unwrap_err(),
            StoreError::NotFound("user")
        );
        assert_eq!(
            store.grant(user.id, PermissionId::new()).await.unwrap_err(),
            StoreError::NotFound("permission")
        );

        store.soft_delete_user(user.id).await.unwrap();
        assert_eq!(
            store.grant(user.id, perm.id).await.unwrap_err(),
            StoreError::NotFound("user")
        );
    }

    #[tokio::test]
    async fn soft_deleted_users_keep_grants_but_resolve_to_not_found() {
        let store = InMemoryStore::new();
        let user = store.create_user("alice", "hash").await.unwrap();
        let perm = store
            .create_permission("View courses", &codes::COURSES_VIEW)
            .await
            .unwrap();
        store.grant(user.id, perm.id).await.unwrap();
        store.soft_delete_user(user.id).await.unwrap();

        assert_eq!(
            store.granted_codes(user.id).await.unwrap_err(),
            StoreError::NotFound("user")
        );
        assert_eq!(store.permissions_of(user.id).await.unwrap(), vec![perm]);
    }

    #[tokio::test]
    async fn ensure_permission_leaves_existing_entries_untouched() {
        let store = InMemoryStore::new();
        let first = store
            .ensure_permission("Original label", &codes::USERS_VIEW)
            .await
            .unwrap();
        let second = store
            .ensure_permission("Another label", &codes::USERS_VIEW)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_permissions().await.unwrap().len(), 1);
        assert!(matches!(
            store.create_permission("Dup", &codes::USERS_VIEW).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn permissions_are_listed_by_code() {
        let store = InMemoryStore::new();
        store.ensure_permission("b", &codes::USERS_VIEW).await.unwrap();
        store.ensure_permission("a", &codes::COURSES_VIEW).await.unwrap();

        let listed: Vec<_> = store
            .list_permissions()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(listed, vec![codes::COURSES_VIEW, codes::USERS_VIEW]);
    }

    #[tokio::test]
    async fn records_reject_dangling_references() {
        let store = InMemoryStore::new();
        let err = RecordStore::<Student>::insert(
            &store,
            StudentDraft {
                name: "Ahmed".into(),
                email: "a@example.com".into(),
                dept_id: DepartmentId::new(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidReference(messages::MISSING_DEPARTMENT.into())
        );
    }

    #[tokio::test]
    async fn deletes_are_restricted_while_referenced() {
        let store = InMemoryStore::new();
        let dept = department(&store, "Computer Science").await;
        let s = student(&store, dept.id, "a@example.com").await;
        let c = course(&store, dept.id).await;
        let enrollment = RecordStore::<Enrollment>::insert(
            &store,
            EnrollmentDraft {
                student_id: s.id,
                course_id: c.id,
                grade: None,
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            RecordStore::<Department>::delete(&store, dept.id).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            RecordStore::<Student>::delete(&store, s.id).await,
            Err(StoreError::Conflict(_))
        ));

        RecordStore::<Enrollment>::delete(&store, enrollment.id).await.unwrap();
        RecordStore::<Student>::delete(&store, s.id).await.unwrap();
        RecordStore::<Course>::delete(&store, c.id).await.unwrap();
        RecordStore::<Department>::delete(&store, dept.id).await.unwrap();
        assert!(RecordStore::<Department>::list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn uniqueness_is_checked_against_other_rows_only() {
        let store = InMemoryStore::new();
        let dept = department(&store, "Physics").await;
        department(&store, "Chemistry").await;

        // Re-saving a record with its own name is not a conflict.
        let same = RecordStore::<Department>::update(
            &store,
            dept.id,
            DepartmentDraft {
                name: "Physics".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(same, dept);

        let err = RecordStore::<Department>::update(
            &store,
            dept.id,
            DepartmentDraft {
                name: "Chemistry".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict(messages::DEPARTMENT_NAME_TAKEN.into())
        );

        student(&store, dept.id, "a@example.com").await;
        let dup = RecordStore::<Student>::insert(
            &store,
            StudentDraft {
                name: "Other".into(),
                email: "a@example.com".into(),
                dept_id: dept.id,
            },
        )
        .await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn a_student_enrolls_in_a_course_once() {
        let store = InMemoryStore::new();
        let dept = department(&store, "Mathematics").await;
        let s = student(&store, dept.id, "m@example.com").await;
        let c = course(&store, dept.id).await;
        let draft = EnrollmentDraft {
            student_id: s.id,
            course_id: c.id,
            grade: Some(88.5),
        };

        RecordStore::<Enrollment>::insert(&store, draft.clone()).await.unwrap();
        assert_eq!(
            RecordStore::<Enrollment>::insert(&store, draft).await.unwrap_err(),
            StoreError::Conflict(messages::ALREADY_ENROLLED.into())
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = InMemoryStore::new();
        assert_eq!(
            RecordStore::<Course>::get(&store, CourseId::new()).await.unwrap_err(),
            StoreError::NotFound("course")
        );
        assert_eq!(
            RecordStore::<Course>::delete(&store, CourseId::new()).await.unwrap_err(),
            StoreError::NotFound("course")
        );
    }
}
