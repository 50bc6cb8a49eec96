pub mod sample_store;
pub mod user_store;

pub use sample_store::{ensure_directory, SampleStore};
pub use user_store::{UserRecord, UserStore};
