pub mod backup;
pub mod context;
pub mod logging;
pub mod retention;
pub mod scheduler;
pub mod tree;
