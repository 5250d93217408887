//! Conversation list, new-chat button, theme toggle.

use parlor_client::SessionController;

pub fn show(ctx: &egui::Context, session: &mut SessionController, dark: &mut bool) {
    egui::SidePanel::left("conversations")
        .default_width(240.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("parlor");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .button(if *dark { "☀" } else { "🌙" })
                        .on_hover_text("Toggle theme")
                        .clicked()
                    {
                        *dark = !*dark;
                        ctx.set_visuals(if *dark {
                            egui::Visuals::dark()
                        } else {
                            egui::Visuals::light()
                        });
                    }
                    if ui.button("＋").on_hover_text("New chat").clicked() {
                        session.new_conversation();
                    }
                });
            });
            ui.separator();

            egui::ScrollArea::vertical().auto_shrink(false).show(ui, |ui| {
                let entries: Vec<(String, String)> = session
                    .conversations()
                    .iter()
                    .map(|c| (c.id.clone(), c.preview.clone()))
                    .collect();
                let active = session.active().map(ToOwned::to_owned);

                let mut select: Option<String> = None;
                let mut remove: Option<String> = None;
                for (id, preview) in &entries {
                    ui.horizontal(|ui| {
                        let selected = active.as_deref() == Some(id.as_str());
                        if ui.selectable_label(selected, truncated(preview)).clicked() {
                            select = Some(id.clone());
                        }
                        ui.with_layout(
                            egui::Layout::right_to_left(egui::Align::Center),
                            |ui| {
                                if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                                    remove = Some(id.clone());
                                }
                            },
                        );
                    });
                }

                if let Some(id) = select {
                    session.select(Some(id));
                }
                if let Some(id) = remove {
                    session.delete(&id);
                }
            });
        });
}

fn truncated(preview: &str) -> String {
    const MAX_CHARS: usize = 28;
    let mut out: String = preview.chars().take(MAX_CHARS).collect();
    if preview.chars().count() > MAX_CHARS {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_previews_pass_through() {
        assert_eq!(truncated("hello"), "hello");
    }

    #[test]
    fn long_previews_get_an_ellipsis() {
        let long = "a".repeat(40);
        let t = truncated(&long);
        assert!(t.ends_with('…'));
        assert_eq!(t.chars().count(), 29);
    }
}
