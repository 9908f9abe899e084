//! Behavioural coverage for `Acquirer::acquire` against a scripted transport.
//!
//! Each test works in its own temporary cache directory and ages the cached
//! archive by rewriting its modification time, so no network access or clock
//! manipulation is needed.

use std::fs;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Result, ensure, eyre};
use rstest::{fixture, rstest};
use sch_datasets::test_support::{
    ScriptedResponse, ScriptedTransport, age_file, days, staging_residue,
};
use sch_datasets::{
    AcquireError, AcquireErrorKind, AcquireOptions, Acquirer, RemoteDataset, RetryPolicy,
};
use tempfile::TempDir;

const OLD_PAYLOAD: &[u8] = b"previous archive";
const NEW_PAYLOAD: &[u8] = b"refreshed archive";

struct Sandbox {
    _temp: TempDir,
    cache_dir: Utf8PathBuf,
    dataset: RemoteDataset,
}

impl Sandbox {
    fn canonical(&self) -> Utf8PathBuf {
        self.cache_dir.join(self.dataset.filename())
    }

    fn seed(&self, age_in_days: u64) -> Result<Utf8PathBuf> {
        let canonical = self.canonical();
        fs::write(&canonical, OLD_PAYLOAD)?;
        age_file(&canonical, days(age_in_days))?;
        Ok(canonical)
    }

    fn options(&self) -> AcquireOptions {
        AcquireOptions::new(&self.cache_dir)
            .with_retry_policy(RetryPolicy::new(3, std::time::Duration::ZERO))
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let temp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let cache_dir = Utf8Path::from_path(temp.path())
        .unwrap_or_else(|| panic!("temp dir should be UTF-8"))
        .to_path_buf();
    Sandbox {
        _temp: temp,
        cache_dir,
        dataset: RemoteDataset::new("https://example.test/datasets", "archive.zip"),
    }
}

fn modified(path: &Utf8Path) -> Result<SystemTime> {
    Ok(fs::metadata(path)?.modified()?)
}

#[rstest]
#[case::well_inside_grace(10)]
#[case::one_day_before_grace(179)]
#[case::exactly_grace(180)]
fn fresh_archive_is_returned_without_network(
    sandbox: Sandbox,
    #[case] age_in_days: u64,
) -> Result<()> {
    let canonical = sandbox.seed(age_in_days)?;
    let transport = ScriptedTransport::default();

    let path = Acquirer::new(&transport).acquire(&sandbox.dataset, &sandbox.options())?;

    ensure!(path == canonical, "unexpected path {path}");
    ensure!(transport.calls() == 0, "fresh archive must not be fetched");
    ensure!(fs::read(&path)? == OLD_PAYLOAD, "archive contents changed");
    Ok(())
}

#[rstest]
#[case::one_day_past_grace(181)]
#[case::long_expired(400)]
fn expired_archive_is_refreshed(sandbox: Sandbox, #[case] age_in_days: u64) -> Result<()> {
    let canonical = sandbox.seed(age_in_days)?;
    let before = modified(&canonical)?;
    let transport = ScriptedTransport::new([ScriptedResponse::body(NEW_PAYLOAD)]);

    let path = Acquirer::new(&transport).acquire(&sandbox.dataset, &sandbox.options())?;

    ensure!(transport.calls() == 1, "expected one download");
    ensure!(fs::read(&path)? == NEW_PAYLOAD, "archive was not replaced");
    ensure!(modified(&path)? > before, "modification time was not updated");
    ensure!(
        staging_residue(&sandbox.cache_dir).is_empty(),
        "staging files were left behind"
    );
    Ok(())
}

#[rstest]
fn custom_grace_period_is_honoured(sandbox: Sandbox) -> Result<()> {
    sandbox.seed(8)?;
    let transport = ScriptedTransport::new([ScriptedResponse::body(NEW_PAYLOAD)]);
    let options = sandbox.options().with_grace_period_days(7);

    let path = Acquirer::new(&transport).acquire(&sandbox.dataset, &options)?;

    ensure!(transport.calls() == 1, "expected one download");
    ensure!(fs::read(&path)? == NEW_PAYLOAD, "archive was not replaced");
    Ok(())
}

#[rstest]
fn forced_refresh_downloads_exactly_once(sandbox: Sandbox) -> Result<()> {
    sandbox.seed(0)?;
    let transport = ScriptedTransport::new([
        ScriptedResponse::body(NEW_PAYLOAD),
        ScriptedResponse::body("unexpected second download"),
    ]);
    let options = sandbox.options().with_force_download(true);

    let path = Acquirer::new(&transport).acquire(&sandbox.dataset, &options)?;

    ensure!(transport.calls() == 1, "forced refresh should fetch once");
    ensure!(
        transport.requested_urls() == vec!["https://example.test/datasets/archive.zip".to_owned()],
        "unexpected download URL"
    );
    ensure!(fs::read(&path)? == NEW_PAYLOAD, "archive was not replaced");
    Ok(())
}

#[rstest]
fn missing_archive_is_downloaded_into_new_cache_dir(sandbox: Sandbox) -> Result<()> {
    let cache_dir = sandbox.cache_dir.join("nested").join("sch");
    let transport = ScriptedTransport::new([ScriptedResponse::body(NEW_PAYLOAD)]);
    let options = AcquireOptions::new(&cache_dir);

    let path = Acquirer::new(&transport).acquire(&sandbox.dataset, &options)?;

    ensure!(path == cache_dir.join("archive.zip"), "unexpected canonical path");
    ensure!(fs::read(&path)? == NEW_PAYLOAD, "archive was not replaced");
    ensure!(
        staging_residue(&cache_dir).is_empty(),
        "staging files were left behind"
    );
    Ok(())
}

#[rstest]
fn missing_archive_without_download_creates_nothing(sandbox: Sandbox) -> Result<()> {
    let cache_dir = sandbox.cache_dir.join("absent");
    let transport = ScriptedTransport::new([ScriptedResponse::body(NEW_PAYLOAD)]);
    let options = AcquireOptions::new(&cache_dir).with_download_if_missing(false);

    let err = Acquirer::new(&transport)
        .acquire(&sandbox.dataset, &options)
        .err()
        .ok_or_else(|| eyre!("acquire should fail when download is disabled"))?;

    match err {
        AcquireError::NotFoundLocally { path } => {
            ensure!(path == cache_dir.join("archive.zip"), "unexpected path {path}");
        }
        other => return Err(eyre!("expected NotFoundLocally, got {other:?}")),
    }
    ensure!(!cache_dir.exists(), "no directory should be created");
    ensure!(transport.calls() == 0, "no download expected");
    Ok(())
}

#[rstest]
fn download_disabled_still_refreshes_expired_archive(sandbox: Sandbox) -> Result<()> {
    sandbox.seed(365)?;
    let transport = ScriptedTransport::new([ScriptedResponse::body(NEW_PAYLOAD)]);
    let options = sandbox.options().with_download_if_missing(false);

    let path = Acquirer::new(&transport).acquire(&sandbox.dataset, &options)?;

    ensure!(transport.calls() == 1, "stale archives are refreshed regardless");
    ensure!(fs::read(&path)? == NEW_PAYLOAD, "archive was not replaced");
    Ok(())
}

#[rstest]
#[case::one(1)]
#[case::three(3)]
fn transient_failures_are_recovered(sandbox: Sandbox, #[case] failures: usize) -> Result<()> {
    let script = std::iter::repeat_with(ScriptedResponse::transient)
        .take(failures)
        .chain([ScriptedResponse::body(NEW_PAYLOAD)]);
    let transport = ScriptedTransport::new(script);

    let path = Acquirer::new(&transport).acquire(&sandbox.dataset, &sandbox.options())?;

    ensure!(
        usize::try_from(transport.calls())? == failures + 1,
        "unexpected number of attempts"
    );
    ensure!(fs::read(&path)? == NEW_PAYLOAD, "archive was not replaced");
    ensure!(
        staging_residue(&sandbox.cache_dir).is_empty(),
        "staging files were left behind"
    );
    Ok(())
}

#[rstest]
fn exhausted_retries_keep_previous_archive(sandbox: Sandbox) -> Result<()> {
    let canonical = sandbox.seed(365)?;
    let before = modified(&canonical)?;
    let transport = ScriptedTransport::new(std::iter::repeat_n(ScriptedResponse::transient(), 4));

    let err = Acquirer::new(&transport)
        .acquire(&sandbox.dataset, &sandbox.options())
        .err()
        .ok_or_else(|| eyre!("acquire should exhaust its retries"))?;

    ensure!(err.kind() == AcquireErrorKind::DownloadFailed, "got {err:?}");
    ensure!(
        matches!(err, AcquireError::DownloadFailed { attempts: 4, .. }),
        "expected four recorded attempts"
    );
    ensure!(transport.calls() == 4, "expected four attempts");
    ensure!(fs::read(&canonical)? == OLD_PAYLOAD, "previous archive was modified");
    ensure!(modified(&canonical)? == before, "modification time changed");
    ensure!(
        staging_residue(&sandbox.cache_dir).is_empty(),
        "staging files were left behind"
    );
    Ok(())
}

#[rstest]
fn permanent_failure_keeps_previous_archive(sandbox: Sandbox) -> Result<()> {
    let canonical = sandbox.seed(365)?;
    let transport = ScriptedTransport::new([ScriptedResponse::permanent()]);

    let err = Acquirer::new(&transport)
        .acquire(&sandbox.dataset, &sandbox.options())
        .err()
        .ok_or_else(|| eyre!("acquire should fail"))?;

    ensure!(
        matches!(err, AcquireError::DownloadFailed { attempts: 1, .. }),
        "expected a single recorded attempt"
    );
    ensure!(fs::read(&canonical)? == OLD_PAYLOAD, "previous archive was modified");
    ensure!(
        staging_residue(&sandbox.cache_dir).is_empty(),
        "staging files were left behind"
    );
    Ok(())
}

#[rstest]
fn cache_dir_occupied_by_file_is_a_filesystem_error(sandbox: Sandbox) -> Result<()> {
    let blocked = sandbox.cache_dir.join("blocked");
    fs::write(&blocked, "not a directory")?;
    let transport = ScriptedTransport::new([ScriptedResponse::body(NEW_PAYLOAD)]);

    let err = Acquirer::new(&transport)
        .acquire(&sandbox.dataset, &AcquireOptions::new(&blocked))
        .err()
        .ok_or_else(|| eyre!("acquire should fail"))?;

    ensure!(err.kind() == AcquireErrorKind::Filesystem, "got {err:?}");
    ensure!(transport.calls() == 0, "no download expected");
    Ok(())
}
