//! Tests for descriptor deserialization.

use super::*;
use rstest::rstest;

const PATH: &str = "/scratch/release.MF";

fn release_yaml() -> String {
    concat!(
        "name: demo\n",
        "version: 0+dev.3\n",
        "commit_hash: abc1234\n",
        "uncommitted_changes: true\n",
        "jobs:\n",
        "- name: worker\n",
        "  version: '1'\n",
        "  fingerprint: f1\n",
        "  sha1: s1\n",
        "packages:\n",
        "- name: libfoo\n",
        "  version: '2'\n",
        "  fingerprint: f2\n",
        "  sha1: s2\n",
        "  dependencies: [libbar]\n",
    )
    .to_owned()
}

#[test]
fn parses_full_release_descriptor() {
    let manifest = parse_release_manifest(&release_yaml(), Utf8Path::new(PATH)).expect("valid");

    assert_eq!(manifest.name, "demo");
    assert_eq!(manifest.version, "0+dev.3");
    assert_eq!(manifest.commit_hash.as_deref(), Some("abc1234"));
    assert!(manifest.uncommitted_changes);
    assert_eq!(manifest.jobs.len(), 1);
    assert_eq!(manifest.jobs[0].name, "worker");
    assert_eq!(manifest.jobs[0].fingerprint, "f1");
    assert_eq!(manifest.packages[0].record.name, "libfoo");
    assert_eq!(manifest.packages[0].dependencies, vec!["libbar"]);
}

#[rstest]
#[case::integer("version: 3", "3")]
#[case::float("version: 1.5", "1.5")]
#[case::trailing_zero_minor("version: 1.10", "1.10")]
#[case::trailing_zero("version: 2.0", "2.0")]
#[case::beyond_i64("version: 99999999999999999999", "99999999999999999999")]
#[case::quoted("version: '7'", "7")]
fn unquoted_versions_keep_their_text(#[case] line: &str, #[case] expected: &str) {
    let yaml = format!("name: demo\n{line}\n");
    let manifest = parse_release_manifest(&yaml, Utf8Path::new(PATH)).expect("valid");
    assert_eq!(manifest.version, expected);
}

#[rstest]
#[case::missing_version("name: demo\n", "version")]
#[case::missing_name("version: '1'\n", "name")]
#[case::empty_document("", "name")]
fn missing_top_level_fields_are_named(#[case] yaml: &str, #[case] field: &str) {
    let err = parse_release_manifest(yaml, Utf8Path::new(PATH)).expect_err("should fail");
    assert_eq!(err.field(), Some(field), "{err}");
    assert!(err.to_string().contains(field));
}

#[test]
fn empty_values_are_accepted_for_later_validation() {
    let yaml = "name: ''\nversion: ''\n";
    let manifest = parse_release_manifest(yaml, Utf8Path::new(PATH)).expect("valid");
    assert!(manifest.name.is_empty());
    assert!(manifest.version.is_empty());
}

#[test]
fn entry_versions_keep_their_text() {
    let yaml = "name: demo\nversion: '1'\njobs:\n- name: worker\n  version: 0.10\n";
    let manifest = parse_release_manifest(yaml, Utf8Path::new(PATH)).expect("valid");
    assert_eq!(manifest.jobs[0].version, "0.10");
}

#[test]
fn entries_without_names_are_rejected_with_index() {
    let yaml = "name: demo\nversion: '1'\njobs:\n- name: ok\n- version: '1'\n";
    let err = parse_release_manifest(yaml, Utf8Path::new(PATH)).expect_err("should fail");
    assert_eq!(err.field(), Some("jobs[1].name"));
}

#[test]
fn entry_metadata_defaults_to_empty() {
    let yaml = "name: demo\nversion: '1'\npackages:\n- name: libfoo\n";
    let manifest = parse_release_manifest(yaml, Utf8Path::new(PATH)).expect("valid");
    let record = &manifest.packages[0].record;
    assert!(record.version.is_empty());
    assert!(record.fingerprint.is_empty());
    assert!(record.sha1.is_empty());
}

#[rstest]
#[case::slash("../evil")]
#[case::backslash("a\\b")]
#[case::dot_dot("..")]
#[case::dot(".")]
fn entry_names_must_be_file_names(#[case] name: &str) {
    let yaml = format!("name: demo\nversion: '1'\npackages:\n- name: '{name}'\n");
    let err = parse_release_manifest(&yaml, Utf8Path::new(PATH)).expect_err("should fail");
    assert!(matches!(err, ParseError::InvalidField { .. }), "{err:?}");
    assert_eq!(err.field(), Some("packages[0].name"));
}

#[rstest]
#[case::syntax("name: [unclosed\n")]
#[case::wrong_type("name: demo\nversion: '1'\njobs: 12\n")]
#[case::not_a_map("- just\n- a list\n")]
fn malformed_yaml_is_an_invalid_descriptor(#[case] yaml: &str) {
    let err = parse_release_manifest(yaml, Utf8Path::new(PATH)).expect_err("should fail");
    assert!(matches!(err, ParseError::InvalidDescriptor { .. }), "{err:?}");
    assert_eq!(err.path(), Utf8Path::new(PATH));
}

#[test]
fn parses_job_descriptor() {
    let yaml = concat!(
        "name: worker\n",
        "templates:\n",
        "  ctl.erb: bin/ctl\n",
        "packages: [libfoo]\n",
        "properties:\n",
        "  worker.port:\n",
        "    description: Listen port\n",
        "    default: 8080\n",
        "  worker.debug:\n",
    );
    let manifest = parse_job_manifest(yaml, Utf8Path::new("job.MF")).expect("valid");

    assert_eq!(manifest.name.as_deref(), Some("worker"));
    assert_eq!(
        manifest.templates.get("ctl.erb").map(String::as_str),
        Some("bin/ctl")
    );
    assert_eq!(manifest.packages, vec!["libfoo"]);
    let port = manifest.properties.get("worker.port").expect("port property");
    assert_eq!(port.description.as_deref(), Some("Listen port"));
    assert_eq!(
        port.default.as_ref().and_then(serde_yml::Value::as_u64),
        Some(8080)
    );
    assert_eq!(
        manifest.properties.get("worker.debug"),
        Some(&RawProperty::default())
    );
}

#[test]
fn empty_job_descriptor_is_allowed() {
    let manifest = parse_job_manifest("", Utf8Path::new("job.MF")).expect("valid");
    assert_eq!(manifest, JobManifest::default());
}

#[rstest]
#[case::parent_dirs("../../../release.MF")]
#[case::nested_parent("conf/../../job.MF")]
#[case::absolute("/etc/passwd")]
#[case::current_dir("./ctl.erb")]
fn template_sources_must_stay_inside_templates(#[case] source: &str) {
    let yaml = format!("name: worker\ntemplates:\n  '{source}': bin/ctl\n");
    let err = parse_job_manifest(&yaml, Utf8Path::new("job.MF")).expect_err("should fail");

    assert!(matches!(err, ParseError::InvalidField { .. }), "{err:?}");
    assert_eq!(err.field(), Some(format!("templates.{source}").as_str()));
}

#[test]
fn nested_template_sources_are_accepted() {
    let yaml = "templates:\n  conf/app.yml.erb: config/app.yml\n";
    let manifest = parse_job_manifest(yaml, Utf8Path::new("job.MF")).expect("valid");
    assert!(manifest.templates.contains_key("conf/app.yml.erb"));
}
