pub mod layout;
pub mod locker;
pub mod naming;

// Remote storage and document database clients
pub mod drive;
pub mod mongo;

// Trait-based abstractions for testability
pub mod drive_ops;
pub mod mongo_ops;

// Re-export commonly used types and traits (used by test crate)
pub use drive::DriveClient;
pub use drive_ops::{DriveFile, DriveOperations};
pub use layout::LocalLayout;
pub use mongo::MongoSource;
pub use mongo_ops::MongoOperations;
