pub mod config;
pub mod db;
pub mod extraction;
pub mod http;
pub mod repositories;
pub mod storage;
