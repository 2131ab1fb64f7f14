pub mod archive;
pub mod charset;
pub mod command;
pub mod dispatcher;
pub mod fetcher;
pub mod memory_store;
pub mod storage;
pub mod token;
pub mod unzip_service;
