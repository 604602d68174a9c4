#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pdf_report_server::run().await
}
