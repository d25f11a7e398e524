mod support;

pub mod config_tests;
