mod app;
mod catalog;
mod config;
mod engine;
mod library;
mod logging;
mod mpris;
mod player;
mod runtime;
mod scrobble;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
