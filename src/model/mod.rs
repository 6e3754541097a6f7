pub mod fetch_log;
pub mod freshness;
pub mod store_read;
pub mod store_write;
pub mod types;
pub mod utils;

pub use fetch_log::*;
pub use freshness::*;
pub use store_read::*;
pub use store_write::*;
pub use types::*;
pub use utils::*;
