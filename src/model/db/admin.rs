use std::ops::{Deref, DerefMut};

use log::warn;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ADMIN_LOGIN_FAILED};
use crate::model::{
    api::admin::AdminCredentials,
    mongodb::{is_duplicate_key_error, Coll, Id},
};

/// Username of the admin created on first launch.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Password of the admin created on first launch. Must be rotated out-of-band.
pub const DEFAULT_ADMIN_PASSWORD: &str = "password";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> Result<bool> {
        Ok(argon2::verify_encoded(&self.password_hash, password.as_ref())?)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Admin {
    /// Find the admin with the given username and check their password.
    ///
    /// An unknown username and a wrong password fail identically.
    pub async fn authenticate(admins: &Coll<Admin>, credentials: &AdminCredentials) -> Result<Self> {
        let with_username = doc! {
            "username": &credentials.username,
        };
        let admin = admins.find_one(with_username, None).await?;
        match admin {
            Some(admin) if admin.verify_password(&credentials.password)? => Ok(admin),
            _ => Err(Error::InvalidCredentials(ADMIN_LOGIN_FAILED)),
        }
    }
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// If there are no admins, create the default one.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>) -> Result<()> {
    if admins.count_documents(None, None).await? > 0 {
        return Ok(());
    }

    let credentials = AdminCredentials {
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        password: DEFAULT_ADMIN_PASSWORD.to_string(),
    };
    let admin = NewAdmin::try_from(credentials)?;
    let result = admins.insert_one(admin, None).await;
    // Lost a race with another bootstrap; the admin exists either way.
    if is_duplicate_key_error(result.as_ref()) {
        return Ok(());
    }
    result?;
    warn!(
        "Created default admin '{}'; rotate its password before the election",
        DEFAULT_ADMIN_USERNAME
    );
    Ok(())
}
