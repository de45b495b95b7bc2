use adw::prelude::*;
use adw::Application;
use tracing_subscriber::EnvFilter;

fn main() -> adw::glib::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("email_agent=info,warn")),
        )
        .init();

    let app = Application::builder()
        .application_id("com.example.EmailAgent")
        .build();
    app.connect_activate(email_agent::app::build_ui);
    app.run()
}
