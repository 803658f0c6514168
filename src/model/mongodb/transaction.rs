use std::future::Future;
use std::time::Duration;

use log::debug;
use rocket::tokio::time::sleep;

use crate::error::{Error, Result};

use super::errors::is_transient_transaction_error;

/// How many times a transaction is attempted before transient failures are
/// given up on.
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Run `attempt` again while it fails with a transient transaction error,
/// such as a write conflict with a concurrent transaction.
///
/// Each call to `attempt` must run a whole transaction in a fresh session, so
/// a retry observes whatever the conflicting transaction committed.
pub async fn retry_transient<T, F, Fut>(what: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(Error::Db(err))
                if is_transient_transaction_error(&err) && tries < MAX_TRANSACTION_ATTEMPTS =>
            {
                debug!("Retrying {what} after transient error: {err}");
                sleep(Duration::from_millis(20 * u64::from(tries))).await;
                tries += 1;
            }
            result => return result,
        }
    }
}
