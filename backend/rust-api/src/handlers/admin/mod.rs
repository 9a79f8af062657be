mod users;

pub use users::{delete_user, get_user, list_users, update_user_role};
