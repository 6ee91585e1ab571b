pub mod access;
pub mod revalidate;
pub mod thread;
pub mod treds;
pub mod users;
