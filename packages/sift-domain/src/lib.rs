pub mod category;
pub mod identity;
pub mod item;
pub mod query_guard;
pub mod timestamp;

pub use category::categories_of;
pub use identity::{IdentityResolver, Resolution};
pub use item::{display_name, get_path, get_str, strong_identifier};
pub use query_guard::{QueryGuardError, check_query};
pub use timestamp::modified_at;
