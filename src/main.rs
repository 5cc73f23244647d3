#[tokio::main]
async fn main() {
    codeathon_backend::start_server().await;
}
