pub mod chat_view;
pub mod main_window;
pub mod markdown_view;
pub mod settings_dialog;
pub mod sidebar;

use crate::controller::ConversationController;
use adw::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;

pub type SharedController = Rc<RefCell<ConversationController>>;

/// Modal yes/no question. `on_confirm` only runs on the affirmative answer.
pub fn confirm<W, F>(parent: &W, prompt: &str, action_label: &str, on_confirm: F)
where
    W: IsA<gtk::Window>,
    F: Fn() + 'static,
{
    let dialog = gtk::Dialog::builder().title("Confirm").transient_for(parent).modal(true).build();
    let label = gtk::Label::new(Some(prompt));
    label.set_wrap(true);
    label.set_margin_top(12);
    label.set_margin_bottom(12);
    label.set_margin_start(12);
    label.set_margin_end(12);
    dialog.content_area().append(&label);

    let _ = dialog.add_button("Cancel", gtk::ResponseType::Cancel);
    let ok_btn = dialog.add_button(action_label, gtk::ResponseType::Accept);
    ok_btn.add_css_class("destructive-action");
    dialog.connect_response(move |dlg, resp| {
        if resp == gtk::ResponseType::Accept {
            on_confirm();
        }
        dlg.close();
    });
    dialog.present();
}

/// Blocking notice with a single OK button.
pub fn alert<W: IsA<gtk::Window>>(parent: &W, message: &str) {
    let dialog = gtk::Dialog::builder().transient_for(parent).modal(true).build();
    let label = gtk::Label::new(Some(message));
    label.set_wrap(true);
    label.set_margin_top(12);
    label.set_margin_bottom(12);
    label.set_margin_start(12);
    label.set_margin_end(12);
    dialog.content_area().append(&label);
    let _ = dialog.add_button("OK", gtk::ResponseType::Ok);
    dialog.connect_response(|dlg, _| dlg.close());
    dialog.present();
}
