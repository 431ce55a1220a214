use std::io;
use configs::Environment;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing subscriber with sensible defaults and stdout writer.
/// - Respects `RUST_LOG` if set
/// - Falls back to `info,tower_http=info,axum=info`
/// - Writes to stdout to improve visibility in environments that hide stderr
pub fn init_logging_default() {
    init_compact("info,tower_http=info,axum=info");
}

/// Initialize tracing subscriber with JSON structured output.
/// - Respects `RUST_LOG` if set, defaults to `info`
/// - Emits structured JSON logs for better machine parsing
pub fn init_logging_json() {
    init_json("info,tower_http=info");
}

/// Pick format and verbosity from the deployment profile.
///
/// `local` is human-readable at debug, `dev` is JSON at debug, `prod` is
/// JSON at info. `RUST_LOG` still wins when present.
pub fn init_logging_for(env: Environment) {
    match env {
        Environment::Local => init_compact("debug,sqlx=warn,tower_http=debug"),
        Environment::Dev => init_json("debug,sqlx=warn,tower_http=debug"),
        Environment::Prod => init_logging_json(),
    }
}

fn init_compact(default_directives: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .try_init();
}

fn init_json(default_directives: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .json()
        .with_writer(io::stdout)
        .try_init();
}
