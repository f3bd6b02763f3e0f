//! Service tests for webserver

pub mod helpers;
