//! parlor-app – desktop shell for the parlor chat service.
//!
//! The UI thread owns the [`parlor_client::SessionController`]; all network
//! work runs on a tokio runtime constructed here, and results cross back
//! into the UI as session events drained once per frame.

mod app;
mod views;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let server_url =
        std::env::var("PARLOR_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_owned());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 700.0])
            .with_title("parlor"),
        ..Default::default()
    };

    eframe::run_native(
        "parlor",
        options,
        Box::new(move |cc| Ok(Box::new(app::ParlorApp::new(cc, &server_url, handle)))),
    )
}
