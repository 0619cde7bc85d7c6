/// Router Module Index
///
/// Routes are grouped by who may reach them. The learner and instructor
/// routers carry their role guard as a route layer, so a handler in those
/// modules always runs with a resolved `Principal` of the right role.

/// Routes accessible to everyone (landing, login, registration).
pub mod public;

/// Routes restricted to learner accounts.
pub mod student;

/// Routes restricted to instructor accounts.
pub mod teacher;
