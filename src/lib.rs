pub mod anilist;
pub mod config;
pub mod season;
pub mod store;
pub mod sync;
