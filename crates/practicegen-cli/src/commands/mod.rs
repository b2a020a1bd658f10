pub mod evaluate;
pub mod generate;
pub mod init;
pub mod list_types;
pub mod validate;
