#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    certify_server::run().await
}
