mod plan;
mod service;
