use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use twit::app::{run, CommandContext};
use twit::utils::{logger, validation::Validate};
use twit::{Cli, Settings, TwitError};

fn main() {
    let cli = Cli::parse();

    // 設定檔有問題時仍要能初始化日誌，先載入再回報
    let settings = Settings::load();
    let log_level = settings
        .as_ref()
        .ok()
        .and_then(|s| s.log_level().map(str::to_string));
    logger::init_cli_logger(cli.debug, log_level.as_deref());

    if cli.debug {
        tracing::debug!("CLI arguments: {:?}", cli);
    }

    let settings = match settings.and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => fail(e),
    };

    let cwd = match cli.directory.clone() {
        Some(dir) => dir,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => fail(e.into()),
        },
    };
    let ceiling = std::env::var_os("TWIT_CEILING_DIRECTORY").map(PathBuf::from);
    let ctx = CommandContext::new(cwd, settings).with_ceiling(ceiling);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = run(&cli.command, &ctx, &mut out).and_then(|_| out.flush().map_err(Into::into));

    if let Err(e) = result {
        fail(e);
    }
}

fn fail(e: TwitError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::debug!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    std::process::exit(e.exit_code().max(1))
}
