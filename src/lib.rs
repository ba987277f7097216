#![forbid(unsafe_code)]

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod comicinfo;
pub mod commands;
pub mod config;
pub mod credits;
pub mod description;
pub mod filename;
pub mod logging;
pub mod organize;
pub mod resolve;
pub mod sync;
