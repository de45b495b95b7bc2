use crate::api::models::Conversation;
use crate::utils::format_relative;
use chrono::Utc;
use gtk4::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;

pub struct SidebarActions {
    pub select: Rc<dyn Fn(String)>,
    pub delete: Rc<dyn Fn(String)>,
}

pub struct Sidebar {
    root: gtk::Box,
    list: gtk::ListBox,
    empty: gtk::Label,
    ids: Rc<RefCell<Vec<String>>>,
    delete: Rc<dyn Fn(String)>,
}

impl Sidebar {
    pub fn new(actions: SidebarActions) -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_width_request(260);

        let title = gtk::Label::new(Some("Conversations"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let empty = gtk::Label::new(Some("No conversations yet"));
        empty.add_css_class("dim-label");
        empty.set_margin_top(12);
        root.append(&empty);

        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::Single);
        list.add_css_class("navigation-sidebar");
        let scroller = gtk::ScrolledWindow::builder().vexpand(true).build();
        scroller.set_child(Some(&list));
        root.append(&scroller);

        let ids: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let ids = ids.clone();
            let select = actions.select.clone();
            list.connect_row_activated(move |_, row| {
                let id = usize::try_from(row.index()).ok().and_then(|i| ids.borrow().get(i).cloned());
                if let Some(id) = id {
                    select(id);
                }
            });
        }

        Self { root, list, empty, ids, delete: actions.delete }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn set_items(&self, items: &[Conversation], current: Option<&str>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        self.empty.set_visible(items.is_empty());
        let now = Utc::now();
        let mut ids = self.ids.borrow_mut();
        ids.clear();
        for conv in items {
            let row = gtk::ListBoxRow::new();
            let line = gtk::Box::new(gtk::Orientation::Horizontal, 6);
            line.set_margin_top(6);
            line.set_margin_bottom(6);
            line.set_margin_start(6);
            line.set_margin_end(6);

            let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
            text.set_hexpand(true);
            let title = gtk::Label::new(Some(&conv.title));
            title.set_halign(gtk::Align::Start);
            title.set_ellipsize(gtk::pango::EllipsizeMode::End);
            let age = gtk::Label::new(Some(&format_relative(conv.updated_at, now)));
            age.set_halign(gtk::Align::Start);
            age.add_css_class("caption");
            age.add_css_class("dim-label");
            text.append(&title);
            text.append(&age);
            line.append(&text);

            let delete_btn = gtk::Button::from_icon_name("user-trash-symbolic");
            delete_btn.add_css_class("flat");
            delete_btn.set_tooltip_text(Some("Delete conversation"));
            delete_btn.set_valign(gtk::Align::Center);
            {
                let delete = self.delete.clone();
                let id = conv.id.clone();
                delete_btn.connect_clicked(move |_| delete(id.clone()));
            }
            line.append(&delete_btn);

            row.set_child(Some(&line));
            self.list.append(&row);
            if current == Some(conv.id.as_str()) {
                self.list.select_row(Some(&row));
            }
            ids.push(conv.id.clone());
        }
    }
}
