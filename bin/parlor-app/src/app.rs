use std::path::Path;
use std::time::Duration;

use eframe::CreationContext;
use parlor_client::{ApiClient, SessionController};

use crate::views;

/// Client-side mirror of the server's upload ceiling; checking here saves a
/// round trip that would be rejected anyway.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub struct ParlorApp {
    pub session: SessionController,
    pub dark: bool,
    last_error: Option<String>,
}

impl ParlorApp {
    pub fn new(cc: &CreationContext<'_>, server_url: &str, rt: tokio::runtime::Handle) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        Self {
            session: SessionController::new(ApiClient::new(server_url), rt),
            dark: true,
            last_error: None,
        }
    }

    fn submit_dropped_file(&mut self, path: &Path) {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.bin")
            .to_owned();
        match std::fs::read(path) {
            Ok(bytes) if bytes.len() > MAX_UPLOAD_BYTES => {
                self.last_error = Some(format!("{name} is larger than 5 MiB"));
            }
            Ok(bytes) => {
                self.session.submit_image(name, bytes);
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "dropped file unreadable");
                self.last_error = Some(format!("could not read {name}: {e}"));
            }
        }
    }
}

impl eframe::App for ParlorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.poll();
        if let Some(error) = self.session.take_error() {
            self.last_error = Some(error);
        }

        // Dropping an image file anywhere in the window sends it.
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                self.submit_dropped_file(&path);
            }
        }

        views::sidebar::show(ctx, &mut self.session, &mut self.dark);
        views::composer::show(ctx, &mut self.session, self.last_error.as_deref());
        views::messages::show(ctx, &self.session);

        // The poll-driven model needs a steady repaint cadence even while
        // nothing on screen is animating.
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}
