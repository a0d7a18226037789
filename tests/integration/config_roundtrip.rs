//! Writing an option tree and parsing it back.

use fbexec::config::{
    parse_input, render_input, GeneralOptions, InputOptions, OptionValue, TargetOptions,
};
use fbexec::ExecError;

fn full_tree() -> InputOptions {
    let mut options = InputOptions::default();
    options.general.set("jobtype", "NEWTONRAPHSON");
    options.general.set(
        "forcefield",
        OptionValue::List(vec!["water.itp".into(), "ions.frcmod".into()]),
    );
    options.general.set("maxstep", 25i64);
    options.general.set("trust0", 0.1);
    options.general.set("penalty_type", "L1");
    options.general.set("backup", false);
    options.general.set(
        "scanindex_num",
        OptionValue::List(vec![OptionValue::Int(0), OptionValue::Int(3)]),
    );
    options.priors.insert("BONDSK".to_string(), 100.0);
    options.priors.insert("VDWS:sigma".to_string(), 0.1);
    options.priors.insert("PDIHS/k".to_string(), 0.004);

    options.upsert_target(
        TargetOptions::new("cluster-02")
            .with("type", "ABINITIO_GMX")
            .with("weight", 0.5)
            .with("energy", true)
            .with("force", false)
            .with("w_energy", 1.0)
            .with(
                "fd_ptypes",
                OptionValue::List(vec!["VDWS".into(), "BONDSK".into()]),
            ),
    );
    options.upsert_target(
        TargetOptions::new("liquid")
            .with("type", "LIQUID_OPENMM")
            .with("weight", 2.0)
            .with("liquid_md_steps", 10000i64)
            .with("quantities", OptionValue::List(vec!["density".into()])),
    );
    options
}

/// Strip the keys the writer forces on every file.
fn without_forced_keys(mut options: InputOptions) -> InputOptions {
    options.general.remove("writechk");
    options.general.remove("writechk_step");
    for target in &mut options.targets {
        target.values.remove("writelevel");
    }
    options
}

#[test]
fn test_parse_of_written_tree_is_semantically_equal() {
    let tree = full_tree();
    let text = render_input(&tree, "checkpoint.p");
    let parsed = parse_input(&text).unwrap();

    assert_eq!(without_forced_keys(parsed.clone()), tree);
    assert_eq!(
        parsed.general.get("writechk"),
        Some(&OptionValue::Str("checkpoint.p".into()))
    );
    assert_eq!(
        parsed.general.get("writechk_step"),
        Some(&OptionValue::Bool(true))
    );
    for target in &parsed.targets {
        assert_eq!(target.values.get("writelevel"), Some(&OptionValue::Int(3)));
    }
}

#[test]
fn test_written_output_is_stable_under_reparse() {
    let once = render_input(&full_tree(), "checkpoint.p");
    let twice = render_input(&parse_input(&once).unwrap(), "checkpoint.p");
    assert_eq!(once, twice);
}

#[test]
fn test_every_written_line_passes_the_schema() {
    let text = render_input(&full_tree(), "checkpoint.p");
    // Each line on its own inside the right block must parse without a schema error.
    let mut in_target = false;
    for line in text.lines() {
        match line.trim() {
            "$target" => in_target = true,
            "$options" | "$end" | "priors" | "/priors" | "" => {}
            content if content.contains(" : ") => {}
            content => {
                let snippet = if in_target {
                    format!("$options\nforcefield a.itp\n$end\n$target\nname x\n{content}\n$end\n")
                } else {
                    format!("$options\nforcefield a.itp\n{content}\n$end\n")
                };
                if let Err(ExecError::Schema { key, .. }) = parse_input(&snippet) {
                    panic!("written line '{content}' rejected by schema ({key})");
                }
            }
        }
    }
}

#[test]
fn test_scalar_forcefield_round_trips_as_list() {
    let mut tree = InputOptions::default();
    tree.general.set("forcefield", "single.xml");
    let parsed = parse_input(&render_input(&tree, "checkpoint.p")).unwrap();
    assert_eq!(
        parsed.general.get("forcefield"),
        Some(&OptionValue::List(vec!["single.xml".into()]))
    );
}

#[test]
fn test_merged_tree_round_trips() {
    let mut tree = full_tree();
    let mut general = GeneralOptions::default();
    general.set("maxstep", 50i64);
    tree.merge(
        general,
        Default::default(),
        vec![TargetOptions::new("liquid").with("type", "LIQUID_OPENMM").with("weight", 3.0)],
    );

    let parsed = without_forced_keys(parse_input(&render_input(&tree, "checkpoint.p")).unwrap());
    assert_eq!(parsed.general.get("maxstep"), Some(&OptionValue::Int(50)));
    assert_eq!(parsed.target("liquid").map(|t| t.weight()), Some(3.0));
    assert_eq!(parsed.target_names().collect::<Vec<_>>(), vec!["cluster-02", "liquid"]);
}

#[test]
fn test_duplicate_target_name_keeps_last_block() {
    let content = "\
$options
forcefield a.itp
$end
$target
name t
weight 1.0
$end
$target
name other
$end
$target
name t
weight 4.0
$end
";
    let parsed = parse_input(content).unwrap();
    assert_eq!(parsed.target_names().collect::<Vec<_>>(), vec!["t", "other"]);
    assert_eq!(parsed.target("t").map(|t| t.weight()), Some(4.0));
}
