pub mod browser;
pub mod configurator;
