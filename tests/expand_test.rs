//! Tests for placeholder expansion

use std::sync::Arc;

use rstest::{fixture, rstest};

use ytree::application::services::VariableExpander;
use ytree::application::ApplicationError;
use ytree::domain::{DomainError, ExpandOptions, TreeNode, MAX_LOOP_COUNT};
use ytree::infrastructure::traits::MapEnvironment;

const VEHICLE: &str = r#"
vehicle:
  suv:
    fuel: [disel, gasoline]
    tires: 4
  sedan:
    name: Sedan
    tires: 4
    transmission: cvt
paths:
  root: $HOME/app
  bin: "@paths.root/bin"
loop:
  a: "@loop.b"
  b: "@loop.a"
  grow: "x@loop.grow"
"#;

#[fixture]
fn vehicle() -> TreeNode {
    serde_yaml::from_str(VEHICLE).unwrap()
}

#[fixture]
fn expander() -> VariableExpander {
    let env = MapEnvironment::new()
        .with("KEY", "ABC")
        .with("HOME", "/home/ytree");
    VariableExpander::new(Arc::new(env))
}

#[rstest]
#[case("$KEY.Value", "ABC.Value")]
#[case("My${KEY}_Value", "MyABC_Value")]
#[case("My$KEY_Value", "My$KEY_Value")]
#[case("$UNSET stays", "$UNSET stays")]
#[case("${UNSET} stays", "${UNSET} stays")]
fn given_environment_when_expanding_then_matches_expected(
    expander: VariableExpander,
    #[case] input: &str,
    #[case] expected: &str,
) {
    assert_eq!(expander.environ_vars(input), expected);
}

#[rstest]
fn given_default_when_variable_unset_then_default_used(expander: VariableExpander) {
    let expander = expander.with_options(ExpandOptions {
        default: Some("none".to_string()),
        ..ExpandOptions::default()
    });
    assert_eq!(expander.environ_vars("$KEY-$UNSET"), "ABC-none");
}

#[rstest]
#[case("Engine is @{vehicle.suv.fuel}.", "Engine is disel,gasoline.")]
#[case("@vehicle.sedan.name has @vehicle.sedan.tires tires.", "Sedan has 4 tires.")]
#[case("gear: @{vehicle.sedan.transmission}", "gear: cvt")]
#[case("@vehicle.truck.name is unknown", "@vehicle.truck.name is unknown")]
fn given_config_references_when_expanding_then_resolved_from_tree(
    expander: VariableExpander,
    vehicle: TreeNode,
    #[case] input: &str,
    #[case] expected: &str,
) {
    assert_eq!(expander.config_vars(input, &vehicle).unwrap(), expected);
}

#[rstest]
fn given_mapping_reference_when_expanding_then_unsupported_type(
    expander: VariableExpander,
    vehicle: TreeNode,
) {
    let result = expander.config_vars("@{vehicle.suv}", &vehicle);
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::UnsupportedType { kind: "mapping", .. }))
    ));
}

#[rstest]
fn given_chained_references_when_converting_then_reaches_fixed_point(
    expander: VariableExpander,
    vehicle: TreeNode,
) {
    assert_eq!(
        expander.convert("@paths.bin", Some(&vehicle)).unwrap(),
        "/home/ytree/app/bin"
    );
}

#[rstest]
fn given_no_tree_when_converting_then_only_environment_pass_runs(expander: VariableExpander) {
    assert_eq!(
        expander.convert("$HOME @paths.bin", None).unwrap(),
        "/home/ytree @paths.bin"
    );
}

#[rstest]
#[case::cycle("@loop.a")]
#[case::self_growing("@loop.grow")]
fn given_self_referencing_value_when_converting_then_loop_limit_exceeded(
    expander: VariableExpander,
    vehicle: TreeNode,
    #[case] input: &str,
) {
    let result = expander.convert(input, Some(&vehicle));
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::LoopLimitExceeded { passes, .. }))
            if passes == MAX_LOOP_COUNT
    ));
}

#[rstest]
fn given_lower_ceiling_when_converting_cycle_then_reports_configured_passes(
    expander: VariableExpander,
    vehicle: TreeNode,
) {
    let expander = expander.with_options(ExpandOptions {
        max_passes: 5,
        ..ExpandOptions::default()
    });
    let result = expander.convert("@loop.a", Some(&vehicle));
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::LoopLimitExceeded { passes: 5, .. }))
    ));
}

#[rstest]
fn given_escaped_reference_when_skip_escaped_then_kept_verbatim(expander: VariableExpander) {
    let expander = expander.with_options(ExpandOptions {
        skip_escaped: true,
        ..ExpandOptions::default()
    });
    assert_eq!(
        expander.convert(r"\$KEY and $KEY", None).unwrap(),
        r"\$KEY and ABC"
    );
}
