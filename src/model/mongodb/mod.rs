mod bson;
mod collection;
mod counter;
mod errors;
mod transaction;

pub use bson::Id;
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{
    ensure_position_counters_exist, Counter, CANDIDATE_POSITION_COUNTER_ID,
    CATEGORY_POSITION_COUNTER_ID,
};
pub use errors::{is_duplicate_key_error, is_transient_transaction_error};
pub use transaction::{retry_transient, MAX_TRANSACTION_ATTEMPTS};
