// src/main.rs

use crontask::{cli, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run(cli::parse()).await {
        eprintln!("crontask error: {err:?}");
        std::process::exit(1);
    }
}
