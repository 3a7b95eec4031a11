pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod user;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;
pub use store::{StoreError, UserStore, WriteBatch, MAX_TRANSACTION_WRITES, MAX_USERS_SIZE};
pub use user::UserRecord;
