use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 預設的日誌過濾字串
pub fn default_filter(verbose: bool, configured_level: Option<&str>) -> String {
    if verbose {
        return "twit=debug".to_string();
    }
    match configured_level {
        Some(level) => format!("twit={}", level),
        None => "twit=warn".to_string(),
    }
}

/// 初始化 CLI 日誌；輸出到 stderr，stdout 只保留命令結果
pub fn init_cli_logger(verbose: bool, configured_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, configured_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
