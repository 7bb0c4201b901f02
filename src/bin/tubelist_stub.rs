use log::error;

use tubelist::{config, server};

#[tokio::main]
async fn main() {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    clog.init();

    let config = config::load_or_create();
    if let Err(err) = server::run(&config).await {
        error!("Server: exited with error: {}", err);
        std::process::exit(1);
    }
}
