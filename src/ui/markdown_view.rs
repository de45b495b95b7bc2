use crate::config::FontSize;
use crate::markdown::{
    code_markup, heading_markup, inline_markup, render, Block, CodeBlock, ColumnAlign, Table, COPY_FEEDBACK,
};
use gtk4::prelude::*;
use gtk4 as gtk;

/// Builds the widget tree for an assistant reply.
pub fn build(content: &str, font: FontSize) -> gtk::Widget {
    let root = gtk::Box::new(gtk::Orientation::Vertical, 8);
    for block in &render(content).blocks {
        root.append(&block_widget(block, font));
    }
    root.upcast()
}

fn sized(markup: &str, font: FontSize) -> String {
    format!("<span size=\"{}\">{markup}</span>", font.pango_size())
}

fn markup_label(markup: &str) -> gtk::Label {
    let label = gtk::Label::new(None);
    label.set_markup(markup);
    label.set_wrap(true);
    label.set_wrap_mode(gtk::pango::WrapMode::WordChar);
    label.set_xalign(0.0);
    label.set_halign(gtk::Align::Start);
    label.set_selectable(true);
    label
}

fn block_widget(block: &Block, font: FontSize) -> gtk::Widget {
    match block {
        Block::Paragraph(inlines) => markup_label(&sized(&inline_markup(inlines), font)).upcast(),
        Block::Heading { level, content } => markup_label(&heading_markup(*level, content)).upcast(),
        Block::Code(code) => code_widget(code),
        Block::Quote(inner) => {
            let quote = gtk::Box::new(gtk::Orientation::Vertical, 6);
            quote.add_css_class("blockquote");
            quote.add_css_class("dim-label");
            for b in inner {
                quote.append(&block_widget(b, font));
            }
            quote.upcast()
        }
        Block::List { start, items } => {
            let list = gtk::Box::new(gtk::Orientation::Vertical, 4);
            list.set_margin_start(8);
            for (i, item) in items.iter().enumerate() {
                let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
                let marker = match start {
                    Some(n) => format!("{}.", n + i as u64),
                    None => "•".to_string(),
                };
                let marker = markup_label(&sized(&marker, font));
                marker.set_valign(gtk::Align::Start);
                marker.set_selectable(false);
                row.append(&marker);
                let body = gtk::Box::new(gtk::Orientation::Vertical, 4);
                body.set_hexpand(true);
                for b in item {
                    body.append(&block_widget(b, font));
                }
                row.append(&body);
                list.append(&row);
            }
            list.upcast()
        }
        Block::Table(table) => table_widget(table, font),
        Block::Rule => gtk::Separator::new(gtk::Orientation::Horizontal).upcast(),
    }
}

fn code_widget(code: &CodeBlock) -> gtk::Widget {
    let frame = gtk::Box::new(gtk::Orientation::Vertical, 4);
    frame.add_css_class("code-block");

    let header = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    let lang = gtk::Label::new(Some(code.language.as_deref().unwrap_or("code")));
    lang.add_css_class("caption");
    lang.add_css_class("dim-label");
    lang.set_hexpand(true);
    lang.set_halign(gtk::Align::Start);
    header.append(&lang);

    let copy_btn = gtk::Button::with_label("Copy");
    copy_btn.add_css_class("flat");
    {
        let text = code.code.clone();
        copy_btn.connect_clicked(move |btn| {
            btn.clipboard().set_text(&text);
            btn.set_label("Copied!");
            let btn = btn.clone();
            glib::timeout_add_local_once(COPY_FEEDBACK, move || btn.set_label("Copy"));
        });
    }
    header.append(&copy_btn);
    frame.append(&header);

    let body = gtk::Label::new(None);
    body.set_markup(&code_markup(code));
    body.set_xalign(0.0);
    body.set_selectable(true);
    let scroller = gtk::ScrolledWindow::builder()
        .vscrollbar_policy(gtk::PolicyType::Never)
        .hscrollbar_policy(gtk::PolicyType::Automatic)
        .build();
    scroller.set_child(Some(&body));
    frame.append(&scroller);
    frame.upcast()
}

fn table_widget(table: &Table, font: FontSize) -> gtk::Widget {
    let grid = gtk::Grid::new();
    grid.set_column_spacing(16);
    grid.set_row_spacing(4);
    grid.add_css_class("md-table");

    let xalign = |col: usize| match table.alignments.get(col) {
        Some(ColumnAlign::Center) => 0.5,
        Some(ColumnAlign::Right) => 1.0,
        _ => 0.0,
    };

    for (col, cell) in table.header.iter().enumerate() {
        let label = markup_label(&sized(&format!("<b>{}</b>", inline_markup(cell)), font));
        label.set_xalign(xalign(col));
        label.set_halign(gtk::Align::Fill);
        grid.attach(&label, col as i32, 0, 1, 1);
    }
    for (r, row) in table.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            let label = markup_label(&sized(&inline_markup(cell), font));
            label.set_xalign(xalign(col));
            label.set_halign(gtk::Align::Fill);
            grid.attach(&label, col as i32, r as i32 + 1, 1, 1);
        }
    }
    grid.upcast()
}
