mod auth;
mod categories;
mod common;
mod geocode;
mod reports;
mod root;

pub(crate) use root::get_args;
