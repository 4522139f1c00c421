mod helpers;
mod logger;
mod utils;

pub use helpers::{create_folder, delete_file};
pub use logger::get_logger;
pub use utils::get_env;
