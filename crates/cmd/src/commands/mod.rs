pub mod cat;
pub mod list;
pub mod mount;

pub use cat::cat_command;
pub use list::list_command;
pub use mount::mount_command;
