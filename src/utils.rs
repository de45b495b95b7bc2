use chrono::{DateTime, Local, Utc};
#[cfg(feature = "gui")]
use once_cell::sync::Lazy;

#[cfg(feature = "gui")]
pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

#[cfg(feature = "gui")]
pub fn spawn_async<F>(fut: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    RUNTIME.spawn(fut);
}

#[cfg(feature = "gui")]
pub fn glib_channel<T: Send + 'static>() -> (glib::Sender<T>, glib::Receiver<T>) {
    glib::MainContext::channel(glib::Priority::default())
}

/// Runs `fut` on the shared runtime and delivers its output on the GTK
/// main loop.
#[cfg(feature = "gui")]
pub fn run_async_to_main<T, Fut>(fut: Fut) -> glib::Receiver<T>
where
    T: Send + 'static,
    Fut: std::future::Future<Output = T> + Send + 'static,
{
    let (tx, rx) = glib_channel::<T>();
    spawn_async(async move {
        let res = fut.await;
        let _ = tx.send(res);
    });
    rx
}

/// Short age label for the conversation sidebar.
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        timestamp.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}

/// First `max` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
