
mod expand_tests;
mod fetch_tests;
