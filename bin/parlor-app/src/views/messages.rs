//! Transcript rendering: message bubbles and the typing indicator.

use parlor_client::{Delivery, LocalMessage, MessageKind, Role, SessionController};

pub fn show(ctx: &egui::Context, session: &SessionController) {
    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical()
            .auto_shrink(false)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for message in session.messages() {
                    bubble(ui, message);
                }
                if session.is_composing() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.weak("assistant is typing…");
                    });
                }
            });
    });
}

fn bubble(ui: &mut egui::Ui, message: &LocalMessage) {
    let align = if message.role == Role::User {
        egui::Align::Max
    } else {
        egui::Align::Min
    };
    ui.with_layout(egui::Layout::top_down(align), |ui| {
        egui::Frame::group(ui.style())
            .fill(bubble_fill(ui, message.role))
            .show(ui, |ui| {
                ui.set_max_width(ui.available_width() * 0.6);
                match message.kind {
                    MessageKind::Image => {
                        ui.hyperlink_to(
                            format!("🖼 {}", file_label(&message.content)),
                            &message.content,
                        );
                    }
                    MessageKind::Text => {
                        ui.label(&message.content);
                    }
                }
                match message.delivery {
                    Delivery::Pending => {
                        ui.weak("sending…");
                    }
                    Delivery::Failed => {
                        ui.colored_label(
                            egui::Color32::from_rgb(0xcc, 0x44, 0x44),
                            "failed to send",
                        );
                    }
                    Delivery::Confirmed => {}
                }
            });
    });
    ui.add_space(6.0);
}

fn bubble_fill(ui: &egui::Ui, role: Role) -> egui::Color32 {
    if role == Role::User {
        ui.visuals().selection.bg_fill
    } else {
        ui.visuals().faint_bg_color
    }
}

fn file_label(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
