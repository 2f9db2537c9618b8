// Adapters layer: concrete implementations for external systems (filesystem, browser).

pub mod download_dir;
pub mod keyword_explorer;
pub mod storage;
pub mod webdriver;
