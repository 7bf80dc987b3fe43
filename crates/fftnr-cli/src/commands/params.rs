//! Params command

use crate::ParamsArgs;
use anyhow::{Context, Result};

pub fn run(args: ParamsArgs) -> Result<()> {
    let params = super::load_params(args.config.as_deref())?;
    params.validate().context("Invalid parameters")?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::commands::load_params;
    use fftnr_ops::ColorMode;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "mode": "rgb", "sigma_luma": 4.5 }"#).unwrap();

        let params = load_params(Some(&path)).unwrap();
        assert_eq!(params.mode, ColorMode::Rgb);
        assert_eq!(params.sigma_luma, 4.5);
        assert_eq!(params.beta, 1.0);
    }

    #[test]
    fn test_bad_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ sigma").unwrap();

        let err = load_params(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
