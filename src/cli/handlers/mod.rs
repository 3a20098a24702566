pub mod backup;
pub mod delete;
pub mod domains;
pub mod export;
pub mod import;
pub mod list;
pub mod record;
pub mod resolve;
pub mod restore;
pub mod show;
pub mod stats;
pub mod verify;
