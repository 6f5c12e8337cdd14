//! `pubsub` binary entry point.

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_pubsub::init().await
}
