pub mod get;
pub mod info;

pub use get::FilesGetTool;
pub use info::FileInfoTool;
