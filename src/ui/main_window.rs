use super::chat_view::{ChatActions, ChatState, ChatView};
use super::sidebar::{Sidebar, SidebarActions};
use super::SharedController;
use crate::controller::{PendingSend, DELETE_CONVERSATION_PROMPT};
use crate::error::SendRejected;
use crate::markdown::escape_markup;
use crate::toast::ToastId;
use crate::utils::run_async_to_main;
use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

const TOAST_POLL: Duration = Duration::from_millis(250);

const CSS: &str = "
.message-user { background-color: alpha(@accent_bg_color, 0.15); border-radius: 12px; padding: 8px 12px; }
.message-error { color: @error_color; }
.code-block { background-color: #2b303b; border-radius: 8px; padding: 8px; }
.blockquote { border-left: 3px solid @accent_color; padding-left: 8px; }
";

pub struct MainWindow {
    pub(crate) window: adw::ApplicationWindow,
    pub(crate) controller: SharedController,
    overlay: adw::ToastOverlay,
    status: gtk::Label,
    sidebar: Sidebar,
    chat: ChatView,
    shown_toasts: RefCell<HashMap<ToastId, adw::Toast>>,
}

fn action<A: 'static>(weak: &Weak<MainWindow>, f: impl Fn(&Rc<MainWindow>, A) + 'static) -> Rc<dyn Fn(A)> {
    let weak = weak.clone();
    Rc::new(move |arg| {
        if let Some(win) = weak.upgrade() {
            f(&win, arg);
        }
    })
}

pub fn show_main_window(app: &Application, controller: SharedController) {
    install_css();

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Email Agent")
        .default_width(960)
        .default_height(640)
        .build();

    let win = Rc::new_cyclic(|weak: &Weak<MainWindow>| {
        let sidebar = Sidebar::new(SidebarActions {
            select: action(weak, |win, id: String| win.switch_conversation(&id)),
            delete: action(weak, |win, id: String| win.delete_conversation(id)),
        });
        let regenerate = action(weak, |win, ()| win.regenerate());
        let chat = ChatView::new(ChatActions {
            send: action(weak, |win, text: String| win.send(&text)),
            regenerate: Rc::new(move || regenerate(())),
            copy: action(weak, |win, _text: String| {
                win.controller.borrow().notify_copied();
                win.sync_toasts();
            }),
            example: action(weak, |win, index: usize| win.use_example(index)),
        });
        MainWindow {
            window: window.clone(),
            controller,
            overlay: adw::ToastOverlay::new(),
            status: gtk::Label::new(None),
            sidebar,
            chat,
            shown_toasts: RefCell::new(HashMap::new()),
        }
    });

    let split = adw::Flap::builder()
        .reveal_flap(true)
        .locked(true)
        .modal(false)
        .build();
    split.set_flap(Some(&win.sidebar.widget()));
    split.set_content(Some(&win.chat.widget()));
    win.overlay.set_child(Some(&split));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title_box = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let title = gtk::Label::new(Some("Email Agent"));
    title.add_css_class("title");
    win.status.add_css_class("caption");
    title_box.append(&title);
    title_box.append(&win.status);
    header.set_title_widget(Some(&title_box));

    let sidebar_btn = gtk::ToggleButton::builder()
        .icon_name("sidebar-show-symbolic")
        .active(true)
        .tooltip_text("Toggle sidebar")
        .build();
    {
        let split = split.clone();
        sidebar_btn.connect_toggled(move |b| split.set_reveal_flap(b.is_active()));
    }
    header.pack_start(&sidebar_btn);

    let settings_btn = gtk::Button::from_icon_name("emblem-system-symbolic");
    settings_btn.set_tooltip_text(Some("Settings"));
    {
        let weak = Rc::downgrade(&win);
        settings_btn.connect_clicked(move |_| {
            if let Some(win) = weak.upgrade() {
                super::settings_dialog::show_settings_dialog(&win);
            }
        });
    }
    header.pack_end(&settings_btn);

    let new_chat_btn = gtk::Button::with_label("New Chat");
    new_chat_btn.add_css_class("suggested-action");
    {
        let weak = Rc::downgrade(&win);
        new_chat_btn.connect_clicked(move |_| {
            if let Some(win) = weak.upgrade() {
                win.controller.borrow_mut().start_new_chat();
                win.chat.clear_input();
                win.refresh();
            }
        });
    }
    header.pack_end(&new_chat_btn);

    container.append(&header);
    container.append(&win.overlay);
    win.overlay.set_vexpand(true);
    window.set_content(Some(&container));
    window.present();

    {
        let weak = Rc::downgrade(&win);
        glib::timeout_add_local(TOAST_POLL, move || match weak.upgrade() {
            Some(win) => {
                win.sync_toasts();
                glib::ControlFlow::Continue
            }
            None => glib::ControlFlow::Break,
        });
    }

    win.refresh();
    win.check_connection();
}

fn install_css() {
    let provider = gtk::CssProvider::new();
    provider.load_from_data(CSS);
    if let Some(display) = gtk::gdk::Display::default() {
        gtk::style_context_add_provider_for_display(&display, &provider, gtk::STYLE_PROVIDER_PRIORITY_APPLICATION);
    }
}

impl MainWindow {
    /// Redraws everything derived from controller state.
    pub fn refresh(&self) {
        let ctl = self.controller.borrow();
        let online = ctl.is_online();
        self.status.set_text(if online { "Connected" } else { "Disconnected" });
        if online {
            self.status.remove_css_class("error");
            self.status.add_css_class("success");
        } else {
            self.status.remove_css_class("success");
            self.status.add_css_class("error");
        }
        self.sidebar.set_items(ctl.conversations(), ctl.current_conversation_id());
        self.chat.render(&ChatState {
            messages: ctl.messages(),
            font: ctl.settings().font_size,
            busy: ctl.is_busy(),
            online,
        });
    }

    /// Mirrors the notifier's queue into the overlay.
    pub fn sync_toasts(&self) {
        let notifier = self.controller.borrow().toasts().clone();
        let active = notifier.active();
        let mut shown = self.shown_toasts.borrow_mut();
        shown.retain(|id, toast| {
            let alive = active.iter().any(|t| t.id == *id);
            if !alive {
                toast.dismiss();
            }
            alive
        });
        for t in active {
            if shown.contains_key(&t.id) {
                continue;
            }
            let toast = adw::Toast::new(&escape_markup(&t.message));
            toast.set_timeout(0);
            if t.kind.is_urgent() {
                toast.set_priority(adw::ToastPriority::High);
            }
            {
                let notifier = notifier.clone();
                let id = t.id;
                toast.connect_dismissed(move |_| notifier.remove(id));
            }
            self.overlay.add_toast(toast.clone());
            shown.insert(t.id, toast);
        }
    }

    pub fn send(self: &Rc<Self>, text: &str) {
        let started = self.controller.borrow_mut().begin_send(text);
        match started {
            Ok(pending) => {
                self.chat.clear_input();
                self.dispatch(pending);
            }
            Err(SendRejected::Invalid(e)) => self.chat.show_error(&e.to_string()),
            Err(e) => log::debug!("send ignored: {e}"),
        }
    }

    pub fn regenerate(self: &Rc<Self>) {
        let started = self.controller.borrow_mut().begin_regenerate();
        match started {
            Ok(Some(pending)) => self.dispatch(pending),
            Ok(None) => {}
            Err(e) => log::debug!("regenerate ignored: {e}"),
        }
    }

    fn dispatch(self: &Rc<Self>, pending: PendingSend) {
        self.refresh();
        let rx = run_async_to_main(pending.dispatch());
        let weak = Rc::downgrade(self);
        rx.attach(None, move |outcome| {
            if let Some(win) = weak.upgrade() {
                win.controller.borrow_mut().finish_send(outcome);
                win.refresh();
                win.sync_toasts();
            }
            glib::ControlFlow::Break
        });
    }

    /// Probes the backend off the main loop and updates the status.
    pub fn check_connection(self: &Rc<Self>) {
        let probe = self.controller.borrow().connection_probe();
        let rx = run_async_to_main(probe.run());
        let weak = Rc::downgrade(self);
        rx.attach(None, move |online| {
            if let Some(win) = weak.upgrade() {
                win.controller.borrow_mut().set_online(online);
                win.refresh();
            }
            glib::ControlFlow::Break
        });
    }

    fn use_example(&self, index: usize) {
        let text = {
            let mut ctl = self.controller.borrow_mut();
            ctl.use_example_prompt(index);
            ctl.input().to_string()
        };
        self.chat.set_input(&text);
    }

    fn switch_conversation(&self, id: &str) {
        let switched = self.controller.borrow_mut().switch_conversation(id);
        if switched {
            self.chat.clear_input();
            self.refresh();
        }
    }

    fn delete_conversation(self: &Rc<Self>, id: String) {
        let weak = Rc::downgrade(self);
        super::confirm(&self.window, DELETE_CONVERSATION_PROMPT, "Delete", move || {
            if let Some(win) = weak.upgrade() {
                win.controller.borrow_mut().delete_conversation(&id, |_| true);
                win.refresh();
            }
        });
    }
}
