mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Analysis, Config, Consolidation, Display};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if !cfg.analysis.high_cost_threshold.is_finite() {
		return Err(Error::Validation {
			message: "analysis.high_cost_threshold must be a finite number.".to_string(),
		});
	}
	if cfg.analysis.high_cost_threshold <= 0.0 {
		return Err(Error::Validation {
			message: "analysis.high_cost_threshold must be greater than zero.".to_string(),
		});
	}
	if cfg.analysis.max_plans == 0 {
		return Err(Error::Validation {
			message: "analysis.max_plans must be greater than zero.".to_string(),
		});
	}
	if !cfg.consolidation.similarity_threshold.is_finite() {
		return Err(Error::Validation {
			message: "consolidation.similarity_threshold must be a finite number.".to_string(),
		});
	}
	if !(cfg.consolidation.similarity_threshold > 0.0
		&& cfg.consolidation.similarity_threshold <= 1.0)
	{
		return Err(Error::Validation {
			message: "consolidation.similarity_threshold must be in the range (0.0, 1.0]."
				.to_string(),
		});
	}
	if let Some(max_results) = cfg.consolidation.max_results
		&& max_results == 0
	{
		return Err(Error::Validation {
			message: "consolidation.max_results must be greater than zero when set.".to_string(),
		});
	}
	if cfg.display.max_categories == 0 {
		return Err(Error::Validation {
			message: "display.max_categories must be greater than zero.".to_string(),
		});
	}

	Ok(())
}
