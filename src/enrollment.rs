use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Account, Course},
    repository::{AccountRepository, CourseRepository, RepoError},
};

#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
    #[error("learner {0} not found")]
    LearnerNotFound(Uuid),
    #[error("course {0} not found")]
    CourseNotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl From<EnrollError> for AppError {
    fn from(err: EnrollError) -> Self {
        match err {
            EnrollError::CourseNotFound(_) => AppError::NotFound,
            EnrollError::LearnerNotFound(id) => AppError::Repository(RepoError::NotFound(id)),
            EnrollError::Repository(e) => AppError::Repository(e),
        }
    }
}

/// Enrolls a learner in a course.
///
/// Checks that both records exist, then appends the course id to the learner
/// and the learner id to the course. Each append is a single store write, so
/// concurrent enrollments never overwrite each other. Existing membership is
/// not checked, so repeating the call appends duplicates. The two appends are
/// independent writes: a failure between them leaves the membership recorded
/// on the learner side only.
pub async fn enroll(
    accounts: &dyn AccountRepository,
    courses: &dyn CourseRepository,
    learner_id: Uuid,
    course_id: Uuid,
) -> Result<(Account, Course), EnrollError> {
    accounts
        .find_by_id(learner_id)
        .await?
        .ok_or(EnrollError::LearnerNotFound(learner_id))?;
    courses
        .find_by_id(course_id)
        .await?
        .ok_or(EnrollError::CourseNotFound(course_id))?;

    let learner = accounts.append_course(learner_id, course_id).await?;
    let course = courses.append_student(course_id, learner_id).await?;

    tracing::info!(%learner_id, %course_id, "learner enrolled");
    Ok((learner, course))
}
