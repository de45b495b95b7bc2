use crate::api::models::{Message, Role};
use crate::config::FontSize;
use crate::controller::EXAMPLE_PROMPTS;
use crate::markdown::escape_markup;
use gtk4::prelude::*;
use gtk4 as gtk;
use std::rc::Rc;

pub struct ChatActions {
    pub send: Rc<dyn Fn(String)>,
    pub regenerate: Rc<dyn Fn()>,
    pub copy: Rc<dyn Fn(String)>,
    pub example: Rc<dyn Fn(usize)>,
}

/// What the message list needs to know to draw itself.
pub struct ChatState<'a> {
    pub messages: &'a [Message],
    pub font: FontSize,
    pub busy: bool,
    pub online: bool,
}

pub struct ChatView {
    root: gtk::Box,
    scroller: gtk::ScrolledWindow,
    messages_box: gtk::Box,
    entry: gtk::Entry,
    send_btn: gtk::Button,
    error_label: gtk::Label,
    actions: ChatActions,
}

impl ChatView {
    pub fn new(actions: ChatActions) -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let scroller = gtk::ScrolledWindow::builder().vexpand(true).hexpand(true).build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 12);
        messages_box.set_margin_start(8);
        messages_box.set_margin_end(8);
        scroller.set_child(Some(&messages_box));
        root.append(&scroller);

        let error_label = gtk::Label::new(None);
        error_label.add_css_class("error");
        error_label.set_halign(gtk::Align::Start);
        error_label.set_visible(false);
        root.append(&error_label);

        // Input row
        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Ask me to send an email…"));
        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        input_row.append(&entry);
        input_row.append(&send_btn);
        root.append(&input_row);

        {
            let send = actions.send.clone();
            let entry_for_send = entry.clone();
            send_btn.connect_clicked(move |_| send(entry_for_send.text().to_string()));
        }
        {
            let send = actions.send.clone();
            entry.connect_activate(move |e| send(e.text().to_string()));
        }
        {
            let error_label = error_label.clone();
            entry.connect_changed(move |_| error_label.set_visible(false));
        }

        Self { root, scroller, messages_box, entry, send_btn, error_label, actions }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn clear_input(&self) {
        self.entry.set_text("");
    }

    pub fn set_input(&self, text: &str) {
        self.entry.set_text(text);
        self.entry.grab_focus();
        self.entry.set_position(-1);
    }

    pub fn show_error(&self, message: &str) {
        self.error_label.set_text(message);
        self.error_label.set_visible(true);
    }

    pub fn render(&self, state: &ChatState<'_>) {
        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }

        let ready = state.online && !state.busy;
        self.send_btn.set_sensitive(ready);
        self.entry.set_placeholder_text(Some(if state.online {
            "Ask me to send an email…"
        } else {
            "Backend offline…"
        }));

        if state.messages.is_empty() {
            self.messages_box.append(&self.welcome());
            return;
        }

        let last = state.messages.len() - 1;
        for (i, message) in state.messages.iter().enumerate() {
            let can_regenerate = i == last && ready && message.role == Role::Assistant;
            self.messages_box.append(&self.message_widget(message, state.font, can_regenerate));
        }

        if state.busy {
            let row = gtk::Box::new(gtk::Orientation::Horizontal, 8);
            let spinner = gtk::Spinner::new();
            spinner.start();
            row.append(&spinner);
            let label = gtk::Label::new(Some("Thinking…"));
            label.add_css_class("dim-label");
            row.append(&label);
            self.messages_box.append(&row);
        }

        let scroller = self.scroller.clone();
        glib::idle_add_local_once(move || {
            let adj = scroller.vadjustment();
            adj.set_value(adj.upper());
        });
    }

    fn welcome(&self) -> gtk::Widget {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
        root.set_valign(gtk::Align::Center);
        root.set_vexpand(true);

        let title = gtk::Label::new(Some("Email Agent"));
        title.add_css_class("title-1");
        root.append(&title);
        let hint = gtk::Label::new(Some("Describe the email you want to send and I'll take care of the rest."));
        hint.add_css_class("dim-label");
        hint.set_wrap(true);
        root.append(&hint);

        for (i, example) in EXAMPLE_PROMPTS.iter().enumerate() {
            let btn = gtk::Button::new();
            let label = gtk::Label::new(None);
            label.set_markup(&format!(
                "<b>{}</b>\n<small>{}</small>",
                escape_markup(example.title),
                escape_markup(example.prompt)
            ));
            label.set_wrap(true);
            label.set_xalign(0.0);
            btn.set_child(Some(&label));
            btn.set_halign(gtk::Align::Center);
            let pick = self.actions.example.clone();
            btn.connect_clicked(move |_| pick(i));
            root.append(&btn);
        }
        root.upcast()
    }

    fn message_widget(&self, message: &Message, font: FontSize, can_regenerate: bool) -> gtk::Widget {
        if message.role == Role::User {
            let label = gtk::Label::new(None);
            label.set_markup(&format!("<span size=\"{}\">{}</span>", font.pango_size(), escape_markup(&message.content)));
            label.set_wrap(true);
            label.set_wrap_mode(gtk::pango::WrapMode::WordChar);
            label.set_xalign(0.0);
            label.set_selectable(true);
            label.set_halign(gtk::Align::End);
            label.add_css_class("message-user");
            return label.upcast();
        }

        let root = gtk::Box::new(gtk::Orientation::Vertical, 4);
        root.set_halign(gtk::Align::Fill);
        let body = super::markdown_view::build(&message.content, font);
        if message.is_error {
            body.add_css_class("message-error");
        }
        root.append(&body);

        let actions_row = gtk::Box::new(gtk::Orientation::Horizontal, 4);
        let copy_btn = gtk::Button::from_icon_name("edit-copy-symbolic");
        copy_btn.add_css_class("flat");
        copy_btn.set_tooltip_text(Some("Copy"));
        {
            let copy = self.actions.copy.clone();
            let text = message.content.clone();
            copy_btn.connect_clicked(move |btn| {
                btn.clipboard().set_text(&text);
                copy(text.clone());
            });
        }
        actions_row.append(&copy_btn);

        if can_regenerate {
            let regen_btn = gtk::Button::from_icon_name("view-refresh-symbolic");
            regen_btn.add_css_class("flat");
            regen_btn.set_tooltip_text(Some("Regenerate"));
            let regenerate = self.actions.regenerate.clone();
            regen_btn.connect_clicked(move |_| regenerate());
            actions_row.append(&regen_btn);
        }
        root.append(&actions_row);
        root.upcast()
    }
}
