pub mod resolver;
pub mod search_paths;

pub use resolver::{find_in_directory, Resolution, SearchPathResolver};
pub use search_paths::{search_paths_for_prefix, BuildTarget};
