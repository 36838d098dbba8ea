pub mod allocate;
pub mod archive;
pub mod root;
pub mod tree;

pub use allocate::{allocate_dir, allocate_file};
pub use root::UploadRoot;
pub use tree::{list_tree, total_files, total_size, Entry};
