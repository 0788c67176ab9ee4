mod bootstrap;
mod config;
mod demo_scene;
mod input;
mod loop_runner;
mod metrics;
mod presenter;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
