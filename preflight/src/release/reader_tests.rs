//! Tests for reading release archives.

use super::*;
use crate::release::extraction::{MockReleaseExtractor, TarballExtractor};
use crate::test_utils::{JobFixture, PackageFixture, ReleaseFixture, utf8_tempdir};
use rstest::rstest;

/// Write `fixture` to `<dir>/release.tgz`, read it into `<dir>/root`, and
/// return the outcome.
fn read_fixture(dir: &Utf8Path, fixture: &ReleaseFixture) -> Result<Release, ReadError> {
    let archive = dir.join("release.tgz");
    fixture
        .write_to(archive.as_std_path())
        .expect("write fixture");
    let root = dir.join("root");
    std::fs::create_dir_all(&root).expect("create root");
    ArchiveReader::new(&TarballExtractor).read(&archive, &root)
}

#[test]
fn reads_valid_release() {
    let (_temp, dir) = utf8_tempdir();
    let release = read_fixture(&dir, &ReleaseFixture::valid()).expect("valid release");

    assert_eq!(release.name, "demo");
    assert_eq!(release.version, "1.0.0");
    assert_eq!(release.commit_hash.as_deref(), Some("abc1234"));
    assert_eq!(release.extracted_path(), dir.join("root"));

    let worker = release.find_job("worker").expect("worker job");
    assert_eq!(worker.manifest_name.as_deref(), Some("worker"));
    assert_eq!(worker.packages, vec!["libfoo"]);
    assert_eq!(worker.fingerprint, "fp-worker");
    assert!(worker.extracted_path.join("job.MF").is_file());
    assert!(worker.extracted_path.ends_with("extracted_jobs/worker"));

    let libfoo = release.find_package("libfoo").expect("libfoo package");
    assert_eq!(libfoo.sha1, "sha1-libfoo");
    assert!(libfoo.extracted_path.join("packaging").is_file());
}

#[test]
fn dangling_dependencies_parse_permissively() {
    let (_temp, dir) = utf8_tempdir();
    let fixture = ReleaseFixture::new("demo", "1")
        .with_job(JobFixture::new("worker").depends_on(&["libfoo"]))
        .with_package(PackageFixture::new("libbar").depends_on(&["libbaz"]));

    let release = read_fixture(&dir, &fixture).expect("parse succeeds");
    assert!(release.find_package("libfoo").is_none());
    assert_eq!(release.packages[0].dependencies, vec!["libbaz"]);
}

#[test]
fn missing_version_names_the_field() {
    let (_temp, dir) = utf8_tempdir();
    let err = read_fixture(&dir, &ReleaseFixture::valid().without_version())
        .expect_err("should fail");

    match err {
        ReadError::Parse(parse) => assert_eq!(parse.field(), Some("version")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn missing_descriptor_is_not_a_release() {
    let (_temp, dir) = utf8_tempdir();
    let err = read_fixture(&dir, &ReleaseFixture::valid().without_descriptor())
        .expect_err("should fail");

    assert!(
        matches!(err, ReadError::Parse(ParseError::MissingDescriptor { .. })),
        "{err:?}"
    );
    assert!(err.to_string().contains("not a recognizable release"));
}

#[rstest]
#[case::job_archive(
    ReleaseFixture::new("demo", "1").with_job(JobFixture::new("worker").without_archive()),
    "jobs/worker.tgz"
)]
#[case::template(
    ReleaseFixture::new("demo", "1").with_job(JobFixture::new("worker").without_template_files()),
    "templates/ctl.erb"
)]
#[case::job_descriptor(
    ReleaseFixture::new("demo", "1").with_job(JobFixture::new("worker").without_descriptor()),
    "extracted_jobs/worker/job.MF"
)]
#[case::package_archive(
    ReleaseFixture::new("demo", "1").with_package(PackageFixture::new("libfoo").without_archive()),
    "packages/libfoo.tgz"
)]
fn missing_sub_paths_are_named(#[case] fixture: ReleaseFixture, #[case] suffix: &str) {
    let (_temp, dir) = utf8_tempdir();
    let err = read_fixture(&dir, &fixture).expect_err("should fail");

    match err {
        ReadError::Parse(ParseError::MissingPath { path }) => {
            assert!(path.ends_with(suffix), "{path}");
        }
        other => panic!("expected MissingPath, got {other:?}"),
    }
}

#[rstest]
#[case::parent_dirs("../../../release.MF")]
#[case::absolute("/etc/passwd")]
fn template_sources_outside_templates_are_rejected(#[case] source: &str) {
    let (_temp, dir) = utf8_tempdir();
    let job = JobFixture::new("worker")
        .with_template(source, "x")
        .without_template_files();
    let fixture = ReleaseFixture::new("demo", "1").with_job(job);

    let err = read_fixture(&dir, &fixture).expect_err("should fail");

    match err {
        ReadError::Parse(parse @ ParseError::InvalidField { .. }) => {
            assert_eq!(parse.field(), Some(format!("templates.{source}").as_str()));
            assert!(parse.path().ends_with("extracted_jobs/worker/job.MF"));
        }
        other => panic!("expected InvalidField, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn unreadable_descriptor_is_reported() {
    use std::os::unix::fs::PermissionsExt;

    // Root bypasses file permissions.
    if unsafe { libc::geteuid() } == 0 {
        return;
    }

    let (_temp, dir) = utf8_tempdir();
    let mut extractor = MockReleaseExtractor::new();
    extractor.expect_extract().returning(|_, destination| {
        let descriptor = destination.join("release.MF");
        std::fs::write(&descriptor, b"name: demo\nversion: '1'\n").expect("write descriptor");
        std::fs::set_permissions(&descriptor, std::fs::Permissions::from_mode(0o000))
            .expect("lock descriptor");
        Ok(())
    });

    let err = ArchiveReader::new(&extractor)
        .read(&dir.join("release.tgz"), &dir)
        .expect_err("should fail");

    match err {
        ReadError::Parse(ParseError::Unreadable { path, .. }) => {
            assert!(path.ends_with("release.MF"), "{path}");
        }
        other => panic!("expected Unreadable, got {other:?}"),
    }
}

#[test]
fn outer_extraction_failure_is_passed_through() {
    let (_temp, dir) = utf8_tempdir();
    let mut extractor = MockReleaseExtractor::new();
    extractor
        .expect_extract()
        .times(1)
        .returning(|_, _| Err(ExtractionError::EmptyArchive));

    let err = ArchiveReader::new(&extractor)
        .read(&dir.join("release.tgz"), &dir)
        .expect_err("should fail");

    assert!(
        matches!(
            err,
            ReadError::Extraction {
                source: ExtractionError::EmptyArchive,
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn nested_extraction_failure_names_the_archive() {
    let (_temp, dir) = utf8_tempdir();
    let fixture = ReleaseFixture::new("demo", "1").with_package(PackageFixture::new("libfoo"));
    let entries = fixture.entries().expect("entries");

    let mut extractor = MockReleaseExtractor::new();
    extractor
        .expect_extract()
        .withf(|archive, _| archive.as_str().ends_with("release.tgz"))
        .returning(move |_, destination| {
            for (path, contents) in &entries {
                let target = destination.join(path);
                std::fs::create_dir_all(target.parent().expect("parent")).expect("mkdir");
                std::fs::write(target, contents).expect("write entry");
            }
            Ok(())
        });
    extractor
        .expect_extract()
        .withf(|archive, _| archive.as_str().ends_with("libfoo.tgz"))
        .returning(|_, _| {
            Err(ExtractionError::PathTraversal {
                path: "../escape".to_owned(),
            })
        });

    let err = ArchiveReader::new(&extractor)
        .read(&dir.join("release.tgz"), &dir)
        .expect_err("should fail");

    match err {
        ReadError::Parse(ParseError::NestedArchive { path, source }) => {
            assert!(path.ends_with("packages/libfoo.tgz"), "{path}");
            assert!(matches!(source, ExtractionError::PathTraversal { .. }));
        }
        other => panic!("expected NestedArchive, got {other:?}"),
    }
}
