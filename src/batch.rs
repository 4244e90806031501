use crate::client::ShrinkService;
use crate::error::Result;
use crate::utils::{
    calculate_compression_ratio, create_progress_spinner, derive_output_name, format_file_size,
};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Derived output name (`shrunk_<basename>`) to result URL.
pub type ResultMapping = BTreeMap<OsString, String>;

/// What to do with the result URLs once every upload has finished.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Download each result here instead of printing its URL.
    pub download_dir: Option<PathBuf>,
    /// Print URLs even when downloading.
    pub force_print: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ShrinkReport {
    pub results: ResultMapping,
    pub attempted: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub candidates: usize,
    pub uploaded: usize,
    pub downloaded: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

/// Upload every candidate in order, collecting the URLs of those that
/// succeed. A failed file is reported and skipped; it never stops the batch.
pub fn shrink_all<S>(service: &S, candidates: &[PathBuf]) -> ShrinkReport
where
    S: ShrinkService + ?Sized,
{
    let mut report = ShrinkReport::default();

    for path in candidates {
        let output_name = match derive_output_name(path) {
            Ok(name) => name,
            Err(e) => {
                crate::warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if report.results.contains_key(&output_name) {
            crate::warn!(
                "Skipping {:?}: another file already produces {}",
                path,
                output_name.to_string_lossy()
            );
            continue;
        }

        report.attempted += 1;
        let spinner = create_progress_spinner(&format!("Shrinking {}...", path.display()));
        let outcome = service.shrink(path);
        spinner.finish_and_clear();

        match outcome {
            Ok(result) => {
                match (result.input_size, result.output_size) {
                    (Some(before), Some(after)) => {
                        report.bytes_before += before;
                        report.bytes_after += after;
                        crate::info!(
                            "✅ {}: {} -> {} ({:.1}% smaller)",
                            path.display(),
                            format_file_size(before),
                            format_file_size(after),
                            calculate_compression_ratio(before, after)
                        );
                    }
                    _ => crate::info!("✅ {}", path.display()),
                }
                crate::verbose!("{} -> {}", output_name.to_string_lossy(), result.url);
                report.results.insert(output_name, result.url);
            }
            Err(e) => {
                crate::warn!("Failed to shrink {:?}: {}", path, e);
            }
        }
    }

    report
}

/// Download or print the collected results.
///
/// Returns how many files were downloaded. Individual download failures are
/// warnings; only a failure to write to `out` is an error.
pub fn dispatch_results<S, W>(
    service: &S,
    results: &ResultMapping,
    options: &DispatchOptions,
    out: &mut W,
) -> Result<usize>
where
    S: ShrinkService + ?Sized,
    W: Write,
{
    if results.is_empty() {
        return Ok(0);
    }

    let Some(download_dir) = &options.download_dir else {
        print_urls(results, out)?;
        return Ok(0);
    };

    let downloaded = download_all(service, results, download_dir);

    if options.force_print {
        print_urls(results, out)?;
    }

    Ok(downloaded)
}

fn download_all<S>(service: &S, results: &ResultMapping, download_dir: &Path) -> usize
where
    S: ShrinkService + ?Sized,
{
    if let Err(e) = fs::create_dir_all(download_dir) {
        crate::warn!("Cannot create download directory {:?}: {}", download_dir, e);
    }

    let mut downloaded = 0;
    for (name, url) in results {
        let destination = download_dir.join(name);
        let name = name.to_string_lossy();
        let spinner = create_progress_spinner(&format!("Downloading {}...", name));
        let outcome = service.download(url, &destination);
        spinner.finish_and_clear();

        match outcome {
            Ok(bytes) => {
                downloaded += 1;
                crate::info!("📥 {} ({})", destination.display(), format_file_size(bytes));
            }
            Err(e) => {
                crate::warn!("Failed to download {} from {}: {}", name, url, e);
            }
        }
    }

    downloaded
}

fn print_urls<W: Write>(results: &ResultMapping, out: &mut W) -> Result<()> {
    for url in results.values() {
        writeln!(out, "{}", url)?;
    }
    out.flush()?;
    Ok(())
}

/// The whole workflow after candidates and credential are settled:
/// probe, upload everything, then dispatch.
///
/// An unreachable service is the only fatal outcome; nothing is uploaded
/// in that case.
pub fn run_batch<S, W>(
    service: &S,
    candidates: &[PathBuf],
    options: &DispatchOptions,
    out: &mut W,
) -> Result<BatchSummary>
where
    S: ShrinkService + ?Sized,
    W: Write,
{
    let start_time = Instant::now();

    service.probe()?;
    crate::info!("🚀 Shrinking {} file(s)...", candidates.len());

    let report = shrink_all(service, candidates);
    let downloaded = dispatch_results(service, &report.results, options, out)?;

    let summary = BatchSummary {
        candidates: candidates.len(),
        uploaded: report.results.len(),
        downloaded,
        bytes_before: report.bytes_before,
        bytes_after: report.bytes_after,
    };
    print_summary(&summary, options, report.attempted, start_time);

    Ok(summary)
}

fn print_summary(
    summary: &BatchSummary,
    options: &DispatchOptions,
    attempted: usize,
    start_time: Instant,
) {
    crate::info!("\n📊 Summary:");
    crate::info!("  📁 Shrunk: {}/{}", summary.uploaded, summary.candidates);
    if options.download_dir.is_some() {
        crate::info!("  📥 Downloaded: {}/{}", summary.downloaded, summary.uploaded);
    }
    if summary.bytes_before > 0 {
        crate::info!(
            "  🎯 {} -> {} ({:.1}% saved)",
            format_file_size(summary.bytes_before),
            format_file_size(summary.bytes_after),
            calculate_compression_ratio(summary.bytes_before, summary.bytes_after)
        );
    }
    let failed = attempted.saturating_sub(summary.uploaded);
    if failed > 0 {
        crate::info!("  ⚠️  Failed uploads: {}", failed);
    }
    crate::info!("  ⏱️  Total time: {:.2?}", start_time.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ShrinkResult;
    use crate::error::ShrinkError;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::ffi::OsStr;
    use tempfile::TempDir;

    /// In-memory service: uploads of paths in `failing` fail, every other
    /// upload yields `https://service.test/output/<n>.png`.
    #[derive(Default)]
    struct FakeService {
        reachable: bool,
        failing: HashSet<PathBuf>,
        failing_downloads: HashSet<String>,
        uploads: RefCell<Vec<PathBuf>>,
        downloads: RefCell<Vec<(String, PathBuf)>>,
    }

    impl FakeService {
        fn reachable() -> Self {
            Self {
                reachable: true,
                ..Default::default()
            }
        }
    }

    impl ShrinkService for FakeService {
        fn probe(&self) -> Result<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(ShrinkError::ServiceUnreachable("service.test:443".into()))
            }
        }

        fn shrink(&self, path: &Path) -> Result<ShrinkResult> {
            self.uploads.borrow_mut().push(path.to_path_buf());
            if self.failing.contains(path) {
                return Err(ShrinkError::Api {
                    status: 401,
                    message: "Unauthorized".into(),
                });
            }
            let n = self.uploads.borrow().len();
            Ok(ShrinkResult {
                url: format!("https://service.test/output/{}.png", n),
                input_size: Some(1000),
                output_size: Some(400),
            })
        }

        fn download(&self, url: &str, destination: &Path) -> Result<u64> {
            self.downloads
                .borrow_mut()
                .push((url.to_string(), destination.to_path_buf()));
            if self.failing_downloads.contains(url) {
                return Err(ShrinkError::Api {
                    status: 404,
                    message: "gone".into(),
                });
            }
            fs::write(destination, url.as_bytes())?;
            Ok(url.len() as u64)
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn printed(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_shrink_all_records_only_successes() {
        let mut service = FakeService::reachable();
        service.failing.insert(PathBuf::from("dir/bad.png"));

        let report = shrink_all(&service, &paths(&["dir/a.png", "dir/bad.png", "b.png"]));

        assert_eq!(report.attempted, 3);
        assert_eq!(report.results.len(), 2);
        assert!(report.results.contains_key(OsStr::new("shrunk_a.png")));
        assert!(report.results.contains_key(OsStr::new("shrunk_b.png")));
        assert!(!report.results.contains_key(OsStr::new("shrunk_bad.png")));
        assert_eq!(report.bytes_before, 2000);
        assert_eq!(report.bytes_after, 800);
    }

    #[test]
    fn test_shrink_all_skips_colliding_output_names() {
        let service = FakeService::reachable();

        let report = shrink_all(&service, &paths(&["one/logo.png", "two/logo.png"]));

        assert_eq!(report.results.len(), 1);
        assert_eq!(*service.uploads.borrow(), paths(&["one/logo.png"]));
    }

    #[test]
    fn test_run_batch_unreachable_makes_no_calls() {
        let service = FakeService::default();
        let options = DispatchOptions {
            download_dir: Some(PathBuf::from("unused")),
            force_print: true,
        };
        let mut out = Vec::new();

        let result = run_batch(&service, &paths(&["a.png"]), &options, &mut out);

        assert!(matches!(result, Err(ShrinkError::ServiceUnreachable(_))));
        assert!(service.uploads.borrow().is_empty());
        assert!(service.downloads.borrow().is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_batch_prints_urls_without_download_dir() {
        let mut service = FakeService::reachable();
        service.failing.insert(PathBuf::from("bad.png"));
        let mut out = Vec::new();

        let summary = run_batch(
            &service,
            &paths(&["foo.png", "bad.png"]),
            &DispatchOptions::default(),
            &mut out,
        )
        .unwrap();

        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.downloaded, 0);
        assert_eq!(printed(out), vec!["https://service.test/output/1.png"]);
        assert!(service.downloads.borrow().is_empty());
    }

    #[test]
    fn test_run_batch_downloads_and_force_prints() {
        let temp_dir = TempDir::new().unwrap();
        let download_dir = temp_dir.path().join("out");
        let service = FakeService::reachable();
        let options = DispatchOptions {
            download_dir: Some(download_dir.clone()),
            force_print: true,
        };
        let mut out = Vec::new();

        let summary =
            run_batch(&service, &paths(&["src/a.png", "b.png"]), &options, &mut out).unwrap();

        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.downloaded, 2);
        assert!(download_dir.join("shrunk_a.png").is_file());
        assert!(download_dir.join("shrunk_b.png").is_file());

        let mut urls = printed(out);
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://service.test/output/1.png",
                "https://service.test/output/2.png"
            ]
        );
    }

    #[test]
    fn test_download_without_print_flag_writes_nothing_to_stdout() {
        let temp_dir = TempDir::new().unwrap();
        let service = FakeService::reachable();
        let options = DispatchOptions {
            download_dir: Some(temp_dir.path().to_path_buf()),
            force_print: false,
        };
        let mut out = Vec::new();

        let summary = run_batch(&service, &paths(&["a.png"]), &options, &mut out).unwrap();

        assert_eq!(summary.downloaded, 1);
        assert!(out.is_empty());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("shrunk_a.png")).unwrap(),
            "https://service.test/output/1.png"
        );
    }

    #[test]
    fn test_download_failure_does_not_stop_the_rest() {
        let temp_dir = TempDir::new().unwrap();
        let mut service = FakeService::reachable();
        service
            .failing_downloads
            .insert("https://service.test/output/1.png".into());
        let mut results = ResultMapping::new();
        results.insert("shrunk_a.png".into(), "https://service.test/output/1.png".into());
        results.insert("shrunk_b.png".into(), "https://service.test/output/2.png".into());
        let options = DispatchOptions {
            download_dir: Some(temp_dir.path().to_path_buf()),
            force_print: false,
        };
        let mut out = Vec::new();

        let downloaded = dispatch_results(&service, &results, &options, &mut out).unwrap();

        assert_eq!(downloaded, 1);
        assert_eq!(service.downloads.borrow().len(), 2);
        assert!(temp_dir.path().join("shrunk_b.png").is_file());
    }

    #[test]
    fn test_dispatch_empty_results_does_nothing() {
        let service = FakeService::reachable();
        let options = DispatchOptions {
            download_dir: Some(PathBuf::from("never-created")),
            force_print: true,
        };
        let mut out = Vec::new();

        let downloaded =
            dispatch_results(&service, &ResultMapping::new(), &options, &mut out).unwrap();

        assert_eq!(downloaded, 0);
        assert!(out.is_empty());
        assert!(!Path::new("never-created").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_file_name_is_shrunk_and_downloaded() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let service = FakeService::reachable();
        let candidate = PathBuf::from("in").join(OsStr::from_bytes(b"caf\xe9.png"));
        let options = DispatchOptions {
            download_dir: Some(temp_dir.path().to_path_buf()),
            force_print: false,
        };
        let mut out = Vec::new();

        let summary = run_batch(&service, &[candidate], &options, &mut out).unwrap();

        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.downloaded, 1);
        assert!(temp_dir
            .path()
            .join(OsStr::from_bytes(b"shrunk_caf\xe9.png"))
            .is_file());
    }
}
