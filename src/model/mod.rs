pub mod attendance;
pub mod enrollment;
pub mod role;
pub mod user;
