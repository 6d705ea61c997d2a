mod common;

mod routing;
mod service;
