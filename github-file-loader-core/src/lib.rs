#![doc = "github-file-loader-core: core logic library for github-file-loader."]

//! This crate turns a remote repository's files into a content collection: it lists the
//! default branch's tree, downloads every file, renders it with a processor chosen by file
//! extension and upserts one record per file into a host-supplied store.
//!
//! # Usage
//! Build a [`loader::LoaderConfig`] with a [`processor::ProcessorRegistry`], create the loader
//! with [`loader::github_file_loader`] and call `load` with a [`loader::LoaderContext`].

pub mod cache;
pub mod contract;
pub mod error;
pub mod loader;
pub mod processor;
pub mod record;
pub mod remote;
pub mod store;

pub use error::LoaderError;
pub use loader::{github_file_loader, Loader, LoaderConfig, LoaderContext};
pub use processor::{HostConfig, ProcessorRegistry};
pub use record::{FileRecord, RenderedContent};
