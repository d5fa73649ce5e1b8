//! Logging setup for RallyHub binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose spans and events are shown at the default level.
const LOGGED_CRATES: [&str; 3] = ["rallyhub_server", "rallyhub_shared", "tower_http"];

/// Build the default `EnvFilter` directive string used when `RUST_LOG` is unset.
///
/// Binary names are normalised the same way cargo normalises crate names
/// (`rallyhub-server` becomes `rallyhub_server`).
pub fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    let mut directives: Vec<String> = LOGGED_CRATES
        .iter()
        .map(|target| format!("{}={}", target, default_log_level))
        .collect();
    if !LOGGED_CRATES.contains(&binary_target.as_str()) {
        directives.push(format!("{}={}", binary_target, default_log_level));
    }
    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Examples
///
/// ```no_run
/// use rallyhub_shared::logger::setup_logger;
///
/// setup_logger("rallyhub-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_normalises_binary_name() {
        // テスト項目: バイナリ名のハイフンがアンダースコアに正規化され、重複しない
        // given (前提条件):
        let binary_name = "rallyhub-server";

        // when (操作):
        let filter = default_filter(binary_name, "debug");

        // then (期待する結果):
        assert_eq!(
            filter,
            "rallyhub_server=debug,rallyhub_shared=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_default_filter_appends_unknown_binary() {
        // テスト項目: 既知のクレート以外のバイナリ名はフィルタに追加される
        // given (前提条件):
        let binary_name = "load-tester";

        // when (操作):
        let filter = default_filter(binary_name, "info");

        // then (期待する結果):
        assert!(filter.ends_with(",load_tester=info"));
        assert!(filter.starts_with("rallyhub_server=info"));
    }
}
