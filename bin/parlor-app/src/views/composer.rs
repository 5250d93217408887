//! Input bar: draft editor, send button, error banner.

use parlor_client::{SessionController, SubmitOutcome};

pub fn show(ctx: &egui::Context, session: &mut SessionController, error: Option<&str>) {
    egui::TopBottomPanel::bottom("composer").show(ctx, |ui| {
        ui.add_space(4.0);
        if let Some(error) = error {
            ui.colored_label(egui::Color32::from_rgb(0xcc, 0x44, 0x44), error);
        }
        ui.horizontal(|ui| {
            let editor = egui::TextEdit::singleline(&mut session.draft)
                .hint_text("Type your message…  (drop an image file to send it)")
                .desired_width(ui.available_width() - 70.0);
            let response = ui.add(editor);
            let enter_pressed =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            // Disabled while composing; the controller rejects a concurrent
            // submit regardless.
            let send_clicked = ui
                .add_enabled(!session.is_composing(), egui::Button::new("Send"))
                .clicked();

            if (enter_pressed || send_clicked)
                && session.submit_text() == SubmitOutcome::Accepted
            {
                response.request_focus();
            }
        });
        ui.add_space(4.0);
    });
}
