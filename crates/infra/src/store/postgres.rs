//! Postgres-backed store.
//!
//! Constraints live in the schema (`migrations/0001_schema.sql`); this module
//! maps their violations onto [`StoreError`] by Postgres error code and
//! constraint name so that callers see the same errors as with the in-memory
//! store.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use registrar_academics::{
    Course, CourseDraft, Department, DepartmentDraft, Enrollment, EnrollmentDraft, Student,
    StudentDraft,
};
use registrar_auth::PermissionCode;
use registrar_core::{CourseId, DepartmentId, EnrollmentId, PermissionId, StudentId, UserId};

use super::messages::{self, still_referenced};
use super::{
    Grant, PermissionRecord, PermissionStore, RecordStore, StoreError, UserChanges, UserRecord,
    UserStore,
};

const SCHEMA: &str = include_str!("../../migrations/0001_schema.sql");

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and return a store. Does not touch the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the schema. Every statement is idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: UserId::from_uuid(row.try_get("id")?),
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        exists: row.try_get("exist")?,
        created_at: row.try_get("created_at")?,
    })
}

fn permission_from_row(row: &PgRow) -> Result<PermissionRecord, StoreError> {
    let code: String = row.try_get("code").map_err(|e| map_sqlx_error("decode", e))?;
    Ok(PermissionRecord {
        id: PermissionId::from_uuid(row.try_get("id").map_err(|e| map_sqlx_error("decode", e))?),
        name: row.try_get("name").map_err(|e| map_sqlx_error("decode", e))?,
        code: PermissionCode::parse(code)
            .map_err(|e| StoreError::Storage(format!("stored permission code is invalid: {e}")))?,
    })
}

fn department_from_row(row: &PgRow) -> Result<Department, sqlx::Error> {
    Ok(Department {
        id: DepartmentId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
    })
}

fn student_from_row(row: &PgRow) -> Result<Student, sqlx::Error> {
    Ok(Student {
        id: StudentId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        dept_id: DepartmentId::from_uuid(row.try_get("dept_id")?),
    })
}

fn course_from_row(row: &PgRow) -> Result<Course, sqlx::Error> {
    Ok(Course {
        id: CourseId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        credits: row.try_get("credits")?,
        dept_id: DepartmentId::from_uuid(row.try_get("dept_id")?),
    })
}

fn enrollment_from_row(row: &PgRow) -> Result<Enrollment, sqlx::Error> {
    Ok(Enrollment {
        id: EnrollmentId::from_uuid(row.try_get("id")?),
        student_id: StudentId::from_uuid(row.try_get("student_id")?),
        course_id: CourseId::from_uuid(row.try_get("course_id")?),
        grade: row.try_get("grade")?,
    })
}

fn decode_all<T>(
    rows: &[PgRow],
    decode: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, StoreError> {
    rows.iter()
        .map(|row| decode(row).map_err(|e| map_sqlx_error("decode", e)))
        .collect()
}

const USER_COLUMNS: &str = "id, username, password_hash, exist, created_at";

#[async_trait::async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, password_hash), err)]
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::new().as_uuid())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        user_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), err)]
    async fn find_active_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND exist"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_active_by_username", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_username", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_active_user(&self, id: UserId) -> Result<UserRecord, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND exist"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_active_user", e))?
            .ok_or(StoreError::NotFound("user"))?;
        user_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), err)]
    async fn list_active_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE exist ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_active_users", e))?;
        decode_all(&rows, user_from_row)
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<UserRecord, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $1 AND exist
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(changes.username)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?
        .ok_or(StoreError::NotFound("user"))?;
        user_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn soft_delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET exist = FALSE WHERE id = $1 AND exist")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("soft_delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PermissionStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn create_permission(
        &self,
        name: &str,
        code: &PermissionCode,
    ) -> Result<PermissionRecord, StoreError> {
        let row = sqlx::query(
            "INSERT INTO permissions (id, name, code) VALUES ($1, $2, $3) RETURNING id, name, code",
        )
        .bind(PermissionId::new().as_uuid())
        .bind(name)
        .bind(code.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_permission", e))?;
        permission_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn ensure_permission(
        &self,
        name: &str,
        code: &PermissionCode,
    ) -> Result<PermissionRecord, StoreError> {
        sqlx::query(
            "INSERT INTO permissions (id, name, code) VALUES ($1, $2, $3) ON CONFLICT (code) DO NOTHING",
        )
        .bind(PermissionId::new().as_uuid())
        .bind(name)
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_permission", e))?;

        let row = sqlx::query("SELECT id, name, code FROM permissions WHERE code = $1")
            .bind(code.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_permission", e))?;
        permission_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, StoreError> {
        let rows = sqlx::query("SELECT id, name, code FROM permissions ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_permissions", e))?;
        rows.iter().map(permission_from_row).collect()
    }

    #[instrument(skip(self), fields(user_id = %user_id, permission_id = %permission_id), err)]
    async fn grant(&self, user_id: UserId, permission_id: PermissionId) -> Result<Grant, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("grant", e))?;

        // Lock the user row so a concurrent soft delete cannot slip in between.
        let active = sqlx::query("SELECT 1 FROM users WHERE id = $1 AND exist FOR SHARE")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("grant", e))?;
        if active.is_none() {
            return Err(StoreError::NotFound("user"));
        }

        let known = sqlx::query("SELECT 1 FROM permissions WHERE id = $1")
            .bind(permission_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("grant", e))?;
        if known.is_none() {
            return Err(StoreError::NotFound("permission"));
        }

        sqlx::query("INSERT INTO user_permissions (user_id, permission_id) VALUES ($1, $2)")
            .bind(user_id.as_uuid())
            .bind(permission_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("grant", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("grant", e))?;
        Ok(Grant {
            user_id,
            permission_id,
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id, permission_id = %permission_id), err)]
    async fn revoke(&self, user_id: UserId, permission_id: PermissionId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND permission_id = $2")
            .bind(user_id.as_uuid())
            .bind(permission_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("grant"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn permissions_of(&self, user_id: UserId) -> Result<Vec<PermissionRecord>, StoreError> {
        let known = sqlx::query("SELECT 1 FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("permissions_of", e))?;
        if known.is_none() {
            return Err(StoreError::NotFound("user"));
        }

        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.code
            FROM user_permissions up
            JOIN permissions p ON p.id = up.permission_id
            WHERE up.user_id = $1
            ORDER BY p.code
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("permissions_of", e))?;
        rows.iter().map(permission_from_row).collect()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn granted_codes(&self, user_id: UserId) -> Result<Vec<PermissionCode>, StoreError> {
        // One round trip: the user row always comes back, with a NULL code when
        // nothing is granted.
        let rows = sqlx::query(
            r#"
            SELECT u.exist, p.code
            FROM users u
            LEFT JOIN user_permissions up ON up.user_id = u.id
            LEFT JOIN permissions p ON p.id = up.permission_id
            WHERE u.id = $1
            ORDER BY p.code
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("granted_codes", e))?;

        let active = match rows.first() {
            Some(row) => row
                .try_get::<bool, _>("exist")
                .map_err(|e| map_sqlx_error("decode", e))?,
            None => false,
        };
        if !active {
            return Err(StoreError::NotFound("user"));
        }

        let mut codes = Vec::with_capacity(rows.len());
        for row in &rows {
            let code: Option<String> = row.try_get("code").map_err(|e| map_sqlx_error("decode", e))?;
            if let Some(code) = code {
                codes.push(PermissionCode::parse(code).map_err(|e| {
                    StoreError::Storage(format!("stored permission code is invalid: {e}"))
                })?);
            }
        }
        Ok(codes)
    }
}

#[async_trait::async_trait]
impl RecordStore<Department> for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Department>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM departments ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_departments", e))?;
        decode_all(&rows, department_from_row)
    }

    #[instrument(skip(self), fields(department_id = %id), err)]
    async fn get(&self, id: DepartmentId) -> Result<Department, StoreError> {
        let row = sqlx::query("SELECT id, name FROM departments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_department", e))?
            .ok_or(StoreError::NotFound("department"))?;
        department_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), err)]
    async fn insert(&self, draft: DepartmentDraft) -> Result<Department, StoreError> {
        let row = sqlx::query("INSERT INTO departments (id, name) VALUES ($1, $2) RETURNING id, name")
            .bind(DepartmentId::new().as_uuid())
            .bind(&draft.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_department", e))?;
        department_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(department_id = %id), err)]
    async fn update(&self, id: DepartmentId, draft: DepartmentDraft) -> Result<Department, StoreError> {
        let row = sqlx::query("UPDATE departments SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id.as_uuid())
            .bind(&draft.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_department", e))?
            .ok_or(StoreError::NotFound("department"))?;
        department_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(department_id = %id), err)]
    async fn delete(&self, id: DepartmentId) -> Result<(), StoreError> {
        delete_by_id(&self.pool, "departments", "department", *id.as_uuid()).await
    }
}

#[async_trait::async_trait]
impl RecordStore<Student> for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        let rows = sqlx::query("SELECT id, name, email, dept_id FROM students ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_students", e))?;
        decode_all(&rows, student_from_row)
    }

    #[instrument(skip(self), fields(student_id = %id), err)]
    async fn get(&self, id: StudentId) -> Result<Student, StoreError> {
        let row = sqlx::query("SELECT id, name, email, dept_id FROM students WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_student", e))?
            .ok_or(StoreError::NotFound("student"))?;
        student_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), err)]
    async fn insert(&self, draft: StudentDraft) -> Result<Student, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO students (id, name, email, dept_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, dept_id
            "#,
        )
        .bind(StudentId::new().as_uuid())
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(draft.dept_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_student", e))?;
        student_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(student_id = %id), err)]
    async fn update(&self, id: StudentId, draft: StudentDraft) -> Result<Student, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE students SET name = $2, email = $3, dept_id = $4
            WHERE id = $1
            RETURNING id, name, email, dept_id
            "#,
        )
        .bind(id.as_uuid())
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(draft.dept_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_student", e))?
        .ok_or(StoreError::NotFound("student"))?;
        student_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(student_id = %id), err)]
    async fn delete(&self, id: StudentId) -> Result<(), StoreError> {
        delete_by_id(&self.pool, "students", "student", *id.as_uuid()).await
    }
}

#[async_trait::async_trait]
impl RecordStore<Course> for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Course>, StoreError> {
        let rows = sqlx::query("SELECT id, title, credits, dept_id FROM courses ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_courses", e))?;
        decode_all(&rows, course_from_row)
    }

    #[instrument(skip(self), fields(course_id = %id), err)]
    async fn get(&self, id: CourseId) -> Result<Course, StoreError> {
        let row = sqlx::query("SELECT id, title, credits, dept_id FROM courses WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_course", e))?
            .ok_or(StoreError::NotFound("course"))?;
        course_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), err)]
    async fn insert(&self, draft: CourseDraft) -> Result<Course, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO courses (id, title, credits, dept_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, credits, dept_id
            "#,
        )
        .bind(CourseId::new().as_uuid())
        .bind(&draft.title)
        .bind(draft.credits)
        .bind(draft.dept_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_course", e))?;
        course_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(course_id = %id), err)]
    async fn update(&self, id: CourseId, draft: CourseDraft) -> Result<Course, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE courses SET title = $2, credits = $3, dept_id = $4
            WHERE id = $1
            RETURNING id, title, credits, dept_id
            "#,
        )
        .bind(id.as_uuid())
        .bind(&draft.title)
        .bind(draft.credits)
        .bind(draft.dept_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_course", e))?
        .ok_or(StoreError::NotFound("course"))?;
        course_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(course_id = %id), err)]
    async fn delete(&self, id: CourseId) -> Result<(), StoreError> {
        delete_by_id(&self.pool, "courses", "course", *id.as_uuid()).await
    }
}

#[async_trait::async_trait]
impl RecordStore<Enrollment> for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Enrollment>, StoreError> {
        let rows = sqlx::query("SELECT id, student_id, course_id, grade FROM enrollments ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_enrollments", e))?;
        decode_all(&rows, enrollment_from_row)
    }

    #[instrument(skip(self), fields(enrollment_id = %id), err)]
    async fn get(&self, id: EnrollmentId) -> Result<Enrollment, StoreError> {
        let row = sqlx::query("SELECT id, student_id, course_id, grade FROM enrollments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_enrollment", e))?
            .ok_or(StoreError::NotFound("enrollment"))?;
        enrollment_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), err)]
    async fn insert(&self, draft: EnrollmentDraft) -> Result<Enrollment, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO enrollments (id, student_id, course_id, grade)
            VALUES ($1, $2, $3, $4)
            RETURNING id, student_id, course_id, grade
            "#,
        )
        .bind(EnrollmentId::new().as_uuid())
        .bind(draft.student_id.as_uuid())
        .bind(draft.course_id.as_uuid())
        .bind(draft.grade)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_enrollment", e))?;
        enrollment_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(enrollment_id = %id), err)]
    async fn update(&self, id: EnrollmentId, draft: EnrollmentDraft) -> Result<Enrollment, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE enrollments SET student_id = $2, course_id = $3, grade = $4
            WHERE id = $1
            RETURNING id, student_id, course_id, grade
            "#,
        )
        .bind(id.as_uuid())
        .bind(draft.student_id.as_uuid())
        .bind(draft.course_id.as_uuid())
        .bind(draft.grade)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_enrollment", e))?
        .ok_or(StoreError::NotFound("enrollment"))?;
        enrollment_from_row(&row).map_err(|e| map_sqlx_error("decode", e))
    }

    #[instrument(skip(self), fields(enrollment_id = %id), err)]
    async fn delete(&self, id: EnrollmentId) -> Result<(), StoreError> {
        delete_by_id(&self.pool, "enrollments", "enrollment", *id.as_uuid()).await
    }
}

/// `table` is always a literal from this module, never caller input.
async fn delete_by_id(
    pool: &PgPool,
    table: &'static str,
    kind: &'static str,
    id: Uuid,
) -> Result<(), StoreError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| match map_sqlx_error("delete", e) {
            StoreError::InvalidReference(_) => StoreError::Conflict(still_referenced(kind)),
            other => other,
        })?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(kind));
    }
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => StoreError::Conflict(
                    match constraint.as_str() {
                        "users_username_key" => messages::USERNAME_TAKEN,
                        "permissions_code_key" => messages::PERMISSION_CODE_TAKEN,
                        "user_permissions_pkey" => messages::ALREADY_GRANTED,
                        "departments_name_key" => messages::DEPARTMENT_NAME_TAKEN,
                        "students_email_key" => messages::STUDENT_EMAIL_TAKEN,
                        "enrollments_student_course_key" => messages::ALREADY_ENROLLED,
                        _ => "record already exists",
                    }
                    .to_string(),
                ),
                // Foreign key violation; delete_by_id turns it into a conflict.
                Some("23503") => StoreError::InvalidReference(
                    match constraint.as_str() {
                        "students_dept_id_fkey" | "courses_dept_id_fkey" => messages::MISSING_DEPARTMENT,
                        "enrollments_student_id_fkey" => messages::MISSING_STUDENT,
                        "enrollments_course_id_fkey" => messages::MISSING_COURSE,
                        _ => "referenced record does not exist",
                    }
                    .to_string(),
                ),
                _ => StoreError::Storage(format!(
                    "database error in {}: {}",
                    operation,
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Storage(format!("{} failed: {}", operation, other)),
    }
}
