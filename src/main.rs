#[tokio::main]
async fn main() {
    if let Err(err) = triamtest_rust::run().await {
        eprintln!("triamtest-rust fatal: {err:#}");
        std::process::exit(1);
    }
}
