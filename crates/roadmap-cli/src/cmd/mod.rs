pub mod completions;
pub mod config;
pub mod init;
pub mod list;
pub mod show;
pub mod subscribe;
pub mod vote;
