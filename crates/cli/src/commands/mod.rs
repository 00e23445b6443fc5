pub mod classify;
pub mod doctor;
pub mod extract;
pub mod gateway;
pub mod init;
