#[tokio::main]
async fn main() {
    if let Err(e) = dosewise::run().await {
        eprintln!("dosewise: {e}");
        std::process::exit(1);
    }
}
