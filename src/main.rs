//! Validator Sentinel CLI

use validator_sentinel::AppContext;

#[tokio::main]
async fn main() {
    if let Err(e) = validator_sentinel::logging::init_logging() {
        eprintln!("[WARN] Failed to initialize structured logging: {}", e);
    }

    let context = AppContext::from_env();
    if let Err(e) = validator_sentinel::run_with_ctrl_c(std::env::args(), &context).await {
        validator_sentinel::log_error!("{:#}", e);
        std::process::exit(1);
    }
}
