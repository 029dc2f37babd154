pub mod career;
pub mod contact;
pub mod learning_path;
pub mod progress;
pub mod roadmap;
pub mod user;
