use clap::Parser;
use log::error;

mod app;
mod args;

use app::App;
use args::Args;

fn init_logging() {
    let mut builder = env_logger::Builder::new();

    if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }

    builder.init();
}

fn main() {
    init_logging();

    // clion needs help in trait annotation
    let args = <Args as Parser>::parse();

    let config = match args.surface_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(-1);
        }
    };

    let app = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Could not start renderer: {e}");
            std::process::exit(-1);
        }
    };

    app.run();
}
