use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- Core Records (Mapped to Database) ---

/// Role
///
/// The account role. Learners join courses, instructors own them. Stored as
/// lowercase text; the legacy form values `Student` / `Teacher` are accepted
/// when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "Student", alias = "student", alias = "Learner")]
    Learner,
    #[serde(alias = "Teacher", alias = "teacher", alias = "Instructor")]
    Instructor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Instructor => "instructor",
        }
    }

    /// Path of the landing page for this role after login.
    pub fn index_path(&self) -> &'static str {
        match self {
            Role::Learner => "/student/index",
            Role::Instructor => "/teacher/index",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "learner" | "student" => Ok(Role::Learner),
            "instructor" | "teacher" => Ok(Role::Instructor),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Account
///
/// A registered user as stored in the `accounts` table, without its
/// credential. `courses` holds enrolled course ids for learners and owned
/// course ids for instructors, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct Account {
    pub id: Uuid,
    // Display name.
    pub fullname: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    // Unique login handle.
    pub username: String,
    pub courses: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Builds a fresh account ready to be registered.
    pub fn new(fullname: impl Into<String>, role: Role, username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fullname: fullname.into(),
            role,
            username: username.into(),
            courses: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Credential
///
/// An account paired with its bcrypt hash. Only the credential store and the
/// repositories ever see this type; handlers work with plain `Account`s.
#[derive(Debug, Clone)]
pub struct Credential {
    pub account: Account,
    pub password_hash: String,
}

/// Course
///
/// A course record from the `courses` table. `author` / `author_id` name the
/// owning instructor; `students` lists enrolled learner ids (duplicates are
/// possible, see the enrollment workflow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub author: String,
    pub author_id: Uuid,
    pub students: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// Builds a new course owned by `owner`.
    pub fn new(form: &CreateCourseForm, owner: &Account) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: form.course_name.trim().to_string(),
            description: form.description.clone(),
            price: form.price,
            author: owner.fullname.clone(),
            author_id: owner.id,
            students: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

// --- Form Payloads (Input Schemas) ---

/// RegisterForm
///
/// Submitted by the registration page (POST /register).
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RegisterForm {
    #[serde(default)]
    pub fullname: String,
    pub usertype: Role,
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    // Confirmation copy of `password`.
    pub password2: String,
}

/// LoginForm
///
/// Submitted by the login page (POST /login).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// CreateCourseForm
///
/// Submitted by the instructor's course form (POST /teacher/create).
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateCourseForm {
    #[serde(rename = "courseName")]
    #[validate(length(min = 1, message = "course name is required"))]
    pub course_name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
}

/// FindQuery
///
/// Query string of the course search (GET /courses/find?key=...).
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FindQuery {
    /// Text to look for inside course names.
    pub key: Option<String>,
}
