use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use skylens_core::FieldConfig;

use crate::error::Result;

#[derive(Debug, Clone, Default, Args)]
pub struct PrintConfigArgs {
    /// Print JSON instead of TOML.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CheckConfigArgs {
    /// TOML or JSON config file.
    pub config: PathBuf,
}

/// Write the default configuration, ready to be edited and loaded back.
pub fn run_print_config(args: &PrintConfigArgs, out: &mut dyn Write) -> Result<()> {
    let config = FieldConfig::default();
    if args.json {
        serde_json::to_writer_pretty(&mut *out, &config)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", config.to_toml_string()?)?;
    }
    Ok(())
}

/// Load a config file and print the values the engine would actually use.
/// Adjusted fields are reported on the `skylens.config` log target.
pub fn run_check_config(args: &CheckConfigArgs, out: &mut dyn Write) -> Result<FieldConfig> {
    let config = FieldConfig::from_path(&args.config)?;
    serde_json::to_writer_pretty(
        &mut *out,
        &serde_json::json!({
            "status": "ok",
            "path": args.config.display().to_string(),
            "config": &config,
        }),
    )?;
    writeln!(out)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printed_toml_loads_back_to_defaults() {
        let mut out = Vec::new();
        run_print_config(&PrintConfigArgs::default(), &mut out).expect("print");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(FieldConfig::from_toml_str(&text).expect("parse"), FieldConfig::default());
    }

    #[test]
    fn printed_json_loads_back_to_defaults() {
        let mut out = Vec::new();
        run_print_config(&PrintConfigArgs { json: true }, &mut out).expect("print");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(FieldConfig::from_json_str(&text).expect("parse"), FieldConfig::default());
    }

    #[test]
    fn check_reports_clamped_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wild.json");
        std::fs::write(&path, r#"{"art_points": 1e9, "target_mass": 2.0}"#).expect("write");
        let mut out = Vec::new();
        let config = run_check_config(&CheckConfigArgs { config: path }, &mut out).expect("check");
        assert_eq!(config.art_points, 5000);
        assert_eq!(config.target_mass, 0.95);
        let doc: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(doc["config"]["art_points"], 5000);
    }

    #[test]
    fn unknown_extension_fails_with_usage_code() {
        let mut out = Vec::new();
        let error = run_check_config(
            &CheckConfigArgs {
                config: PathBuf::from("field.yaml"),
            },
            &mut out,
        )
        .expect_err("yaml unsupported");
        assert_eq!(error.exit_code(), 64);
    }
}
