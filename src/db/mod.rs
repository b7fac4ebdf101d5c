//! Database layer (Firestore and in-memory document stores).

pub mod firestore;
pub mod memory;
pub mod store;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;
pub use store::{
    CollectionPath, CollectionRef, Direction, Document, DocumentStore, Fields, FilterOp, Query,
    StoreError, StoreResult, WriteBatch, MAX_BATCH_OPS,
};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const RESPONDER_STATUS: &str = "responder_status";
    /// Sub-collection of each `responder_status` document.
    pub const CHECK_INS: &str = "check_ins";
    pub const QUESTION_PACKS: &str = "question_packs";
    pub const TOKEN_EVENTS: &str = "token_events";
    pub const DAILY_METRICS: &str = "daily_metrics";
    /// Journals of user deletions that did not fit one atomic batch.
    pub const USER_DELETIONS: &str = "user_deletions";
}
