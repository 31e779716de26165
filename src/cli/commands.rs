pub mod backup;
pub mod departments;
pub mod initdb;
pub mod optimize;
pub mod serve;
pub mod users;

pub use backup::backup_database;
pub use departments::seed_departments;
pub use initdb::{init_database, init_database_with_admin};
pub use optimize::optimize_database;
pub use serve::serve;
pub use users::{create_admin, create_user};
