use netsim_cli::scenario_runner::run_scenario;
use netsim_types::TestScenario;

fn load(path: &str) -> TestScenario {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {path}: {e}"));
    toml::from_str(&text).unwrap_or_else(|e| panic!("parsing {path}: {e}"))
}

#[test]
fn clean_transfer_fixture_passes() {
    let scenario = load(concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/clean_transfer.toml"));
    let outcome = run_scenario(&scenario).unwrap();
    assert!(outcome.passed, "failures: {:?}", outcome.failures);
}

#[test]
fn single_drop_recovered_fixture_passes() {
    let scenario = load(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/scenarios/single_drop_recovered.toml"
    ));
    let outcome = run_scenario(&scenario).unwrap();
    assert!(outcome.passed, "failures: {:?}", outcome.failures);
}
