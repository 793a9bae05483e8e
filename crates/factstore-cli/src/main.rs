#[tokio::main]
async fn main() {
    if let Err(e) = factstore_cli::run(std::env::args().collect()).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
