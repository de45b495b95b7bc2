use super::main_window::MainWindow;
use super::{alert, confirm};
use crate::config::FontSize;
use crate::controller::CLEAR_ALL_PROMPT;
use crate::settings_panel::{
    run_connection_test, SettingsPanel, SettingsTab, IMPORT_FAILURE_MESSAGE, IMPORT_SUCCESS_MESSAGE,
};
use crate::storage::default_data_dir;
use crate::utils::run_async_to_main;
use adw::prelude::*;
use directories::UserDirs;
use gtk4 as gtk;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type SharedPanel = Rc<RefCell<SettingsPanel>>;

fn page() -> gtk::Box {
    let page = gtk::Box::new(gtk::Orientation::Vertical, 12);
    page.set_margin_top(12);
    page.set_margin_bottom(12);
    page.set_margin_start(12);
    page.set_margin_end(12);
    page
}

fn caption(text: &str) -> gtk::Label {
    let label = gtk::Label::new(Some(text));
    label.set_halign(gtk::Align::Start);
    label.add_css_class("heading");
    label
}

fn export_dir() -> Option<PathBuf> {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .or_else(default_data_dir)
}

pub fn show_settings_dialog(win: &Rc<MainWindow>) {
    let panel: SharedPanel = Rc::new(RefCell::new(SettingsPanel::open(&win.controller.borrow())));

    let dialog = gtk::Window::builder()
        .title("Settings")
        .transient_for(&win.window)
        .modal(true)
        .default_width(560)
        .default_height(480)
        .build();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let notebook = gtk::Notebook::new();
    notebook.set_vexpand(true);

    let recipients_tab = gtk::Label::new(None);
    for tab in SettingsTab::ALL {
        let (content, label) = match tab {
            SettingsTab::Account => (account_page(&panel), gtk::Label::new(Some(tab.label()))),
            SettingsTab::Recipients => (recipients_page(win, &recipients_tab), recipients_tab.clone()),
            SettingsTab::Api => (api_page(win, &panel), gtk::Label::new(Some(tab.label()))),
            SettingsTab::Appearance => (appearance_page(&panel), gtk::Label::new(Some(tab.label()))),
            SettingsTab::Data => (data_page(win, &panel, &dialog), gtk::Label::new(Some(tab.label()))),
        };
        notebook.append_page(&content, Some(&label));
    }
    {
        let panel = panel.clone();
        notebook.connect_switch_page(move |_, _, idx| {
            if let Some(tab) = SettingsTab::ALL.get(idx as usize) {
                panel.borrow_mut().select_tab(*tab);
            }
        });
    }
    root.append(&notebook);

    let error_label = gtk::Label::new(None);
    error_label.add_css_class("error");
    error_label.set_visible(false);
    error_label.set_margin_start(12);
    error_label.set_halign(gtk::Align::Start);
    root.append(&error_label);

    let footer = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    footer.set_halign(gtk::Align::End);
    footer.set_margin_top(12);
    footer.set_margin_bottom(12);
    footer.set_margin_start(12);
    footer.set_margin_end(12);
    let cancel_btn = gtk::Button::with_label("Cancel");
    let save_btn = gtk::Button::with_label("Save");
    save_btn.add_css_class("suggested-action");
    footer.append(&cancel_btn);
    footer.append(&save_btn);
    root.append(&footer);

    {
        let dialog = dialog.clone();
        cancel_btn.connect_clicked(move |_| dialog.close());
    }
    {
        let dialog = dialog.clone();
        let win = win.clone();
        let panel = panel.clone();
        save_btn.connect_clicked(move |_| {
            let draft = panel.borrow().clone();
            if let Err(e) = draft.validate() {
                error_label.set_text(&e.to_string());
                error_label.set_visible(true);
                return;
            }
            let backend_changed = draft.save(&mut win.controller.borrow_mut());
            dialog.close();
            win.refresh();
            if backend_changed {
                win.check_connection();
            }
        });
    }

    dialog.set_child(Some(&root));
    dialog.present();
}

fn account_page(panel: &SharedPanel) -> gtk::Widget {
    let page = page();
    let draft = panel.borrow().draft().clone();

    page.append(&caption("Name"));
    let name = gtk::Entry::new();
    name.set_text(&draft.user_name);
    {
        let panel = panel.clone();
        name.connect_changed(move |e| panel.borrow_mut().set_user_name(&e.text()));
    }
    page.append(&name);

    page.append(&caption("User ID"));
    let id = gtk::Label::new(Some(&draft.user_id));
    id.set_halign(gtk::Align::Start);
    id.set_selectable(true);
    id.add_css_class("dim-label");
    page.append(&id);
    page.upcast()
}

fn recipients_page(win: &Rc<MainWindow>, tab_label: &gtk::Label) -> gtk::Widget {
    let page = page();
    let hint = gtk::Label::new(Some("Emails sent by the agent will go to these addresses."));
    hint.set_halign(gtk::Align::Start);
    hint.set_wrap(true);
    hint.add_css_class("dim-label");
    page.append(&hint);

    let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    let entry = gtk::Entry::new();
    entry.set_hexpand(true);
    entry.set_placeholder_text(Some("name@example.com"));
    let add_btn = gtk::Button::with_label("Add");
    row.append(&entry);
    row.append(&add_btn);
    page.append(&row);

    let error_label = gtk::Label::new(None);
    error_label.add_css_class("error");
    error_label.set_halign(gtk::Align::Start);
    error_label.set_visible(false);
    page.append(&error_label);

    let list = gtk::ListBox::new();
    list.set_selection_mode(gtk::SelectionMode::None);
    list.add_css_class("boxed-list");
    let scroller = gtk::ScrolledWindow::builder().vexpand(true).build();
    scroller.set_child(Some(&list));
    page.append(&scroller);
    fill_recipients(&list, tab_label, win);

    {
        let error_label = error_label.clone();
        entry.connect_changed(move |_| error_label.set_visible(false));
    }
    let add: Rc<dyn Fn()> = {
        let entry = entry.clone();
        let list = list.clone();
        let tab_label = tab_label.clone();
        let win = win.clone();
        Rc::new(move || {
            let added = win.controller.borrow_mut().add_recipient(&entry.text());
            match added {
                Ok(_) => {
                    entry.set_text("");
                    fill_recipients(&list, &tab_label, &win);
                }
                Err(e) => {
                    error_label.set_text(&e.to_string());
                    error_label.set_visible(true);
                }
            }
            win.sync_toasts();
        })
    };
    {
        let add = add.clone();
        add_btn.connect_clicked(move |_| add());
    }
    entry.connect_activate(move |_| add());
    page.upcast()
}

fn fill_recipients(list: &gtk::ListBox, tab_label: &gtk::Label, win: &Rc<MainWindow>) {
    while let Some(child) = list.first_child() {
        list.remove(&child);
    }
    let recipients = win.controller.borrow().recipients().to_vec();
    tab_label.set_text(&if recipients.is_empty() {
        SettingsTab::Recipients.label().to_string()
    } else {
        format!("{} ({})", SettingsTab::Recipients.label(), recipients.len())
    });
    if recipients.is_empty() {
        let empty = gtk::Label::new(Some("No recipients yet"));
        empty.add_css_class("dim-label");
        empty.set_margin_top(12);
        empty.set_margin_bottom(12);
        list.append(&empty);
        return;
    }
    for email in recipients {
        let line = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        line.set_margin_top(6);
        line.set_margin_bottom(6);
        line.set_margin_start(8);
        line.set_margin_end(8);
        let label = gtk::Label::new(Some(&email));
        label.set_hexpand(true);
        label.set_halign(gtk::Align::Start);
        line.append(&label);
        let remove_btn = gtk::Button::from_icon_name("list-remove-symbolic");
        remove_btn.add_css_class("flat");
        remove_btn.set_tooltip_text(Some("Remove"));
        {
            let list = list.clone();
            let tab_label = tab_label.clone();
            let win = win.clone();
            remove_btn.connect_clicked(move |_| {
                win.controller.borrow_mut().remove_recipient(&email);
                fill_recipients(&list, &tab_label, &win);
                win.sync_toasts();
            });
        }
        line.append(&remove_btn);
        list.append(&line);
    }
}

fn api_page(win: &Rc<MainWindow>, panel: &SharedPanel) -> gtk::Widget {
    let page = page();
    page.append(&caption("Backend URL"));
    let url = gtk::Entry::new();
    url.set_text(&panel.borrow().draft().backend_url);
    {
        let panel = panel.clone();
        url.connect_changed(move |e| panel.borrow_mut().set_backend_url(&e.text()));
    }
    page.append(&url);

    let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    let status = gtk::Label::new(None);
    status.set_hexpand(true);
    status.set_halign(gtk::Align::Start);
    let set_status = |status: &gtk::Label, online: bool| {
        status.set_text(if online { "Connected" } else { "Disconnected" });
    };
    set_status(&status, win.controller.borrow().is_online());
    let test_btn = gtk::Button::with_label("Test Connection");
    row.append(&status);
    row.append(&test_btn);
    page.append(&row);

    {
        let win = win.clone();
        let panel = panel.clone();
        test_btn.connect_clicked(move |btn| {
            if !panel.borrow_mut().begin_connection_test() {
                return;
            }
            btn.set_label("Testing...");
            btn.set_sensitive(false);
            let probe = win.controller.borrow().connection_probe();
            let rx = run_async_to_main(run_connection_test(probe));
            let btn = btn.clone();
            let win = win.clone();
            let panel = panel.clone();
            let status = status.clone();
            rx.attach(None, move |online| {
                win.controller.borrow_mut().set_online(online);
                panel.borrow_mut().end_connection_test();
                btn.set_label("Test Connection");
                btn.set_sensitive(true);
                set_status(&status, online);
                win.refresh();
                glib::ControlFlow::Break
            });
        });
    }
    page.upcast()
}

fn appearance_page(panel: &SharedPanel) -> gtk::Widget {
    let page = page();
    page.append(&caption("Font Size"));
    let labels: Vec<&str> = FontSize::ALL.iter().map(|f| f.label()).collect();
    let dropdown = gtk::DropDown::from_strings(&labels);
    let current = panel.borrow().draft().font_size;
    if let Some(idx) = FontSize::ALL.iter().position(|f| *f == current) {
        dropdown.set_selected(idx as u32);
    }
    {
        let panel = panel.clone();
        dropdown.connect_selected_notify(move |dd| {
            if let Some(size) = FontSize::ALL.get(dd.selected() as usize) {
                panel.borrow_mut().set_font_size(*size);
            }
        });
    }
    page.append(&dropdown);
    page.upcast()
}

fn data_page(win: &Rc<MainWindow>, panel: &SharedPanel, dialog: &gtk::Window) -> gtk::Widget {
    let page = page();
    let location = panel.borrow().storage_location();
    let where_label = gtk::Label::new(Some(&format!("Your conversations are stored {}.", location.describe())));
    where_label.set_halign(gtk::Align::Start);
    where_label.set_wrap(true);
    page.append(&where_label);

    page.append(&caption("Export"));
    let export_btn = gtk::Button::with_label("Export Data");
    export_btn.set_halign(gtk::Align::Start);
    {
        let win = win.clone();
        let panel = panel.clone();
        export_btn.connect_clicked(move |_| {
            let exported = match export_dir() {
                Some(dir) => panel.borrow().export_data(&win.controller.borrow(), &dir),
                None => Err(crate::error::StorageError::NoDataDir),
            };
            let ctl = win.controller.borrow();
            match exported {
                Ok(path) => ctl.toasts().success(format!("Exported to {}", path.display()), crate::toast::DEFAULT_DURATION),
                Err(e) => {
                    log::error!("export failed: {e}");
                    ctl.toasts().error(format!("Export failed: {e}"))
                }
            };
        });
    }
    page.append(&export_btn);

    page.append(&caption("Import"));
    let import_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    let path_entry = gtk::Entry::new();
    path_entry.set_hexpand(true);
    path_entry.set_placeholder_text(Some("Path to a backup .json file"));
    let import_btn = gtk::Button::with_label("Import Data");
    import_row.append(&path_entry);
    import_row.append(&import_btn);
    page.append(&import_row);
    {
        let win = win.clone();
        let panel = panel.clone();
        let dialog = dialog.clone();
        import_btn.connect_clicked(move |_| {
            let path = PathBuf::from(path_entry.text().trim());
            let imported = panel.borrow_mut().import_data(&mut win.controller.borrow_mut(), &path);
            match imported {
                Ok(_) => {
                    dialog.close();
                    win.refresh();
                    alert(&win.window, IMPORT_SUCCESS_MESSAGE);
                }
                Err(e) => {
                    log::warn!("import from {} failed: {e}", path.display());
                    alert(&dialog, IMPORT_FAILURE_MESSAGE);
                }
            }
        });
    }

    page.append(&caption("Danger Zone"));
    let clear_btn = gtk::Button::with_label("Clear All Conversations");
    clear_btn.add_css_class("destructive-action");
    clear_btn.set_halign(gtk::Align::Start);
    {
        let win = win.clone();
        let panel = panel.clone();
        let dialog = dialog.clone();
        clear_btn.connect_clicked(move |_| {
            let win = win.clone();
            let panel = panel.clone();
            let settings_dialog = dialog.clone();
            confirm(&dialog, CLEAR_ALL_PROMPT, "Delete All", move || {
                panel.borrow().clear_all(&mut win.controller.borrow_mut(), |_| true);
                settings_dialog.close();
                win.refresh();
            });
        });
    }
    page.append(&clear_btn);
    page.upcast()
}
