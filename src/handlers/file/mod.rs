pub mod io;
pub mod list;
pub mod types;
pub mod upload;

pub use io::{delete_file, download_file, file_info, rename_file};
pub use list::list_files;
pub use upload::{create_folder, upload_binary, upload_multipart};
