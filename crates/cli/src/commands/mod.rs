pub mod build;
pub mod clean;
pub mod pages;
pub mod preview;
pub mod scan;
