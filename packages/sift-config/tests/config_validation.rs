use sift_config::{Config, Error, validate};

fn sample_toml(similarity_threshold: f64, high_cost_threshold: f64, max_plans: i64) -> String {
	format!(
		r#"
[analysis]
high_cost_threshold = {high_cost_threshold}
max_plans = {max_plans}

[consolidation]
similarity_threshold = {similarity_threshold}

[display]
max_categories = 5
"#
	)
}

fn parse(raw: &str) -> Config {
	toml::from_str(raw).expect("Failed to parse sample config.")
}

#[test]
fn defaults_are_valid() {
	let cfg = Config::default();

	assert!(validate(&cfg).is_ok());
	assert_eq!(cfg.consolidation.similarity_threshold, 0.85);
	assert_eq!(cfg.analysis.high_cost_threshold, 1_000.0);
	assert_eq!(cfg.analysis.max_plans, 5);
	assert_eq!(cfg.display.max_categories, 5);
}

#[test]
fn empty_toml_falls_back_to_defaults() {
	let cfg = parse("");

	assert!(validate(&cfg).is_ok());
	assert_eq!(cfg.analysis.max_plans, 5);
}

#[test]
fn sample_config_passes_validation() {
	let cfg = parse(&sample_toml(0.85, 1_000.0, 5));

	assert!(validate(&cfg).is_ok());
}

#[test]
fn rejects_out_of_range_similarity_threshold() {
	for threshold in [0.0, -0.2, 1.5] {
		let cfg = parse(&sample_toml(threshold, 1_000.0, 5));
		let err = validate(&cfg).unwrap_err();

		assert!(matches!(err, Error::Validation { .. }), "threshold {threshold} must be rejected");
	}
}

#[test]
fn rejects_non_positive_cost_threshold() {
	let cfg = parse(&sample_toml(0.85, 0.0, 5));

	assert!(validate(&cfg).is_err());
}

#[test]
fn rejects_zero_max_plans() {
	let cfg = parse(&sample_toml(0.85, 1_000.0, 0));

	assert!(validate(&cfg).is_err());
}

#[test]
fn rejects_zero_max_results() {
	let mut cfg = Config::default();

	cfg.consolidation.max_results = Some(0);

	assert!(validate(&cfg).is_err());

	cfg.consolidation.max_results = Some(25);

	assert!(validate(&cfg).is_ok());
}
