use serde::{Deserialize, Serialize};

/// Student numbers to register as eligible voters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StudentNumbers {
    pub student_numbers: Vec<String>,
}

/// How many of the submitted student numbers were new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProvisionSummary {
    pub added: u64,
}
