#[path = "../support/mod.rs"]
mod support;

mod import_run;
