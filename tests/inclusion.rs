//! Template inclusion: splicing, cache replay, scan-count behavior, and
//! the cycle-breaking iteration cap.

use std::fs;

use pretty_assertions::assert_eq;
use weft::{scan, Diagnostics, DirLoader, Engine, Interp, UserMap, UserValue};

fn template_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (name, content) in files {
        fs::write(dir.path().join(name), content).expect("write template");
    }
    dir
}

#[test]
fn engine_splices_an_included_template() {
    let dir = template_dir(&[("greet.tpl", "hello {= name =}")]);
    let mut engine = Engine::new();
    engine.set_template_directory(dir.path()).unwrap();
    engine.prepare_source("[{% insert \"greet.tpl\" %}]");

    let mut seed = UserMap::default();
    seed.insert("name".to_string(), UserValue::from("ann"));
    assert_eq!(engine.render(seed), "[hello ann]");
    assert!(engine.diagnostics().is_empty());
}

#[test]
fn engine_prepares_the_root_template_from_disk() {
    let dir = template_dir(&[("root.tpl", "A{% insert \"leaf.tpl\" %}"), ("leaf.tpl", "B")]);
    let mut engine = Engine::new();
    engine.set_template_directory(dir.path()).unwrap();
    engine.prepare_template("root.tpl").unwrap();
    assert_eq!(engine.render(UserMap::default()), "AB");
}

#[test]
fn repeat_inclusion_is_scanned_only_once() {
    let dir = template_dir(&[("x.tpl", "X")]);
    let loader = DirLoader::new(dir.path());

    let mut diags = Diagnostics::default();
    let mut program = scan("{% insert \"x.tpl\" %}{% insert \"x.tpl\" %}", &mut diags);
    let mut interp = Interp::with_loader(&mut diags, &loader);
    let out = interp.run(&mut program, UserMap::default());

    assert_eq!(out, "XX");
    assert_eq!(interp.scan_count(), 1);
    drop(interp);
    assert!(diags.is_empty());
}

#[test]
fn inclusion_inside_a_loop_is_spliced_once() {
    let dir = template_dir(&[("dot.tpl", ".")]);
    let loader = DirLoader::new(dir.path());

    let mut diags = Diagnostics::default();
    let mut program = scan(
        "{% for i in range(0,4,1) %}{% insert \"dot.tpl\" %}{% endfor %}",
        &mut diags,
    );
    let mut interp = Interp::with_loader(&mut diags, &loader);
    let out = interp.run(&mut program, UserMap::default());

    assert_eq!(out, "....");
    assert_eq!(interp.scan_count(), 1);
}

#[test]
fn cyclic_inclusion_terminates_at_the_cap() {
    let dir = template_dir(&[
        ("a.tpl", "A{% insert \"b.tpl\" %}"),
        ("b.tpl", "B{% insert \"a.tpl\" %}"),
    ]);
    let loader = DirLoader::new(dir.path());

    let mut diags = Diagnostics::default();
    let mut program = scan("{% insert \"a.tpl\" %}", &mut diags);
    let mut interp = Interp::with_loader(&mut diags, &loader);
    let out = interp.run(&mut program, UserMap::default());

    assert_eq!(out, "AB".repeat(16));
    assert_eq!(interp.scan_count(), 2);
    drop(interp);
    assert!(diags.any_contains("more than 16"));
}

#[test]
fn inclusion_cap_bounds_explicit_repeats() {
    let dir = template_dir(&[("x.tpl", "x")]);
    let loader = DirLoader::new(dir.path());

    let src = "{% insert \"x.tpl\" %}".repeat(20);
    let mut diags = Diagnostics::default();
    let mut program = scan(&src, &mut diags);
    let mut interp = Interp::with_loader(&mut diags, &loader);
    let out = interp.run(&mut program, UserMap::default());

    assert_eq!(out, "x".repeat(16));
    assert_eq!(interp.scan_count(), 1);
    drop(interp);
    assert_eq!(diags.len(), 4);
}

#[test]
fn empty_template_inserts_are_consumed() {
    let dir = template_dir(&[("empty.tpl", "")]);
    let loader = DirLoader::new(dir.path());

    let mut diags = Diagnostics::default();
    let mut program = scan(
        "a{% insert \"empty.tpl\" %}b{% insert \"empty.tpl\" %}c",
        &mut diags,
    );
    let mut interp = Interp::with_loader(&mut diags, &loader);
    let out = interp.run(&mut program, UserMap::default());

    assert_eq!(out, "abc");
    assert_eq!(interp.scan_count(), 1);
    drop(interp);
    assert!(diags.is_empty());
    // Both insert blocks were removed, not left behind as dead no-ops.
    assert_eq!(program.len(), 3);
}

#[test]
fn unreadable_inclusion_is_a_logged_no_op() {
    let dir = template_dir(&[]);
    let mut engine = Engine::new();
    engine.set_template_directory(dir.path()).unwrap();
    engine.prepare_source("{% insert \"missing.tpl\" %}rest");
    assert_eq!(engine.render(UserMap::default()), "rest");
    assert!(engine.diagnostics().any_contains("cannot read"));
}

#[test]
fn inclusion_under_a_false_branch_is_skipped() {
    let dir = template_dir(&[("x.tpl", "X")]);
    let mut engine = Engine::new();
    engine.set_template_directory(dir.path()).unwrap();
    engine.prepare_source("{% if false %}{% insert \"x.tpl\" %}{% endif %}done");
    assert_eq!(engine.render(UserMap::default()), "done");
    assert!(engine.diagnostics().is_empty());
}

#[test]
fn render_without_a_configured_loader_logs() {
    let (out, diags) = weft::render("{% insert \"x.tpl\" %}rest", UserMap::default());
    assert_eq!(out, "rest");
    assert!(diags.any_contains("loader"));
}
