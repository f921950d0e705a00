pub mod alert;
pub mod delivery;
pub mod panel;
pub mod reminder;
pub mod rss;
pub mod scheduler;
pub mod subscription;
