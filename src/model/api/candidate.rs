use rocket::{
    data::ToByteUnit,
    form::{self, error::ErrorKind, DataField, FromFormField},
};

use crate::model::{manage::CandidateUpload, mongodb::Id};

/// Limit used for photo uploads when `limits.file` is not configured.
const DEFAULT_PHOTO_LIMIT_MIB: u64 = 2;

/// An uploaded photo, read fully into memory, with the file name the client
/// gave it. The file name is untrusted.
#[derive(Debug)]
pub struct Photo {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for Photo {
    async fn from_data(field: DataField<'r, '_>) -> form::Result<'r, Self> {
        let limit = field
            .request
            .limits()
            .get("file")
            .unwrap_or_else(|| DEFAULT_PHOTO_LIMIT_MIB.mebibytes());
        let file_name = field
            .file_name
            .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string());
        let bytes = field.data.open(limit).into_bytes().await?;
        if !bytes.is_complete() {
            return Err(ErrorKind::InvalidLength {
                min: None,
                max: Some(limit.as_u64()),
            }
            .into());
        }
        Ok(Self {
            file_name,
            bytes: bytes.into_inner(),
        })
    }
}

/// The admin panel's "add candidate" form.
#[derive(Debug, FromForm)]
pub struct CandidateForm {
    pub name: String,
    pub category: Id,
    pub photo: Photo,
}

impl CandidateForm {
    /// View this form as an upload for the management service.
    pub fn as_upload(&self) -> CandidateUpload<'_> {
        CandidateUpload {
            name: &self.name,
            category_id: self.category,
            photo_bytes: &self.photo.bytes,
            photo_file_name: self.photo.file_name.as_deref().unwrap_or_default(),
        }
    }
}
