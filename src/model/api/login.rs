use serde::{Deserialize, Serialize};

use super::admin::AdminCredentials;

/// A login attempt. Which kind it is gets decided when the request body is
/// parsed, from its `kind` tag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoginRequest {
    Student { student_number: String },
    Admin(AdminCredentials),
}

/// The session state reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionInfo {
    pub role: String,
}
