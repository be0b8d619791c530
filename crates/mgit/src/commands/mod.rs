pub mod init;
pub mod commit;
pub mod log;
pub mod show;
pub mod verify;
pub mod rev_parse;
pub mod reconstruct;
pub mod mappings;
pub mod config;
