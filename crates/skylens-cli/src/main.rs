#![forbid(unsafe_code)]

fn main() {
    let wants_json = std::env::args().any(|arg| arg == "--log-json");
    if let Err(error) = skylens_cli::run_from_env() {
        if wants_json {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "error": error.to_string(),
                    "exit_code": error.exit_code(),
                })
            );
        } else {
            eprintln!("{error}");
        }
        std::process::exit(error.exit_code());
    }
}
