pub mod books;
pub mod health;
pub mod misc;
pub mod types;
pub mod users;
