pub mod admins;
pub mod auth;
pub mod bans;
pub mod chats;
pub mod ratings;
pub mod settings;
pub mod stats;
