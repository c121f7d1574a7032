// src/config/mod.rs
pub mod scraper;
pub mod sources;

pub use scraper::{ScraperConfig, ENV_SCRAPER_CONFIG_PATH};
pub use sources::{
    categories_of, load_sources_default, load_sources_from, ENV_SOURCES_CONFIG_PATH,
};
