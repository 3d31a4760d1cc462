pub mod app;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod output;
pub mod resume;
pub mod store;
pub mod uniparc;
