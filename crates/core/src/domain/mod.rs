pub mod entry;
pub mod standup;
