pub mod item;
pub mod profile;
