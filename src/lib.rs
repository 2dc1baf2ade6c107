//! webmirror: concurrent web-page downloader and offline mirroring engine.

pub mod assets;
pub mod cli;
pub mod css;
pub mod fetch;
pub mod html_doc;
pub mod logging;
pub mod mirror;
pub mod model;
pub mod options;
pub mod orchestrator;
pub mod pathmap;
pub mod pool;
pub mod summary;
pub mod writer;
