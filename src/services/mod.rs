pub mod multipart;
pub mod naming;
pub mod source;
pub mod storage;
pub mod upload_service;
