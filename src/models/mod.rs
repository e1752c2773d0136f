pub mod request;
pub mod user;

pub use request::{MaintenanceRequest, RequestStatus};
pub use user::{Role, User};
