pub mod date;
pub mod diary;
pub mod diary_backend;
pub mod diary_store;
pub mod error;
pub mod manager;
pub mod refresh;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use date::{parse_diary_date, DatePeriod};
pub use diary::{DeletedDiary, DiaryEntry, DiaryInfo, NewDiaryEntry};
pub use diary_backend::{validate_text, DiaryStore, StoreResult, MAX_TEXT_LENGTH};
pub use diary_store::SqliteDiaryStore;
pub use error::{DiaryError, DiaryResult};
pub use manager::DiaryManager;
pub use refresh::{next_run_after, RefreshScheduler};
pub use retry::{with_retry, RetryConfig};
