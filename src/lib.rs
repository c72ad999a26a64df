//! PDF Analyzer Server Library
//!
//! Upload a PDF, get back one SVG per page with every word framed in green
//! and every embedded image framed in red.
//!
//! # Modules
//!
//! - `pdf`: word and image extraction (MuPDF + lopdf)
//! - `svg`: page overlay rendering
//! - `db`: SQLite persistence of extracted text and images
//! - `analyzer`: the per-upload pipeline
//! - `routes`: HTTP surface

pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod storage;
pub mod svg;
