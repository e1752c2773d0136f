pub mod notifications;
pub mod requests;
pub mod users;
