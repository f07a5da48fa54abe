pub mod attendance;
pub mod scheduler;
pub mod sweep_hook;
