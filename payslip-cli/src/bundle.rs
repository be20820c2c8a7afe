//! Upload and result bundles
//!
//! An upload is either an already-extracted archive directory or a zip of
//! one. Zips are unpacked into a scoped temporary directory that is removed
//! when the returned [`StagedInput`] is dropped, on every exit path.
//! Results go back out as a flat zip of the reconciled output directory.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive root ready for the pipeline, plus the workspace backing it
#[derive(Debug)]
pub struct StagedInput {
    root: PathBuf,
    // Removed on drop; `None` when the input was a plain directory
    workspace: Option<TempDir>,
}

impl StagedInput {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_extracted(&self) -> bool {
        self.workspace.is_some()
    }
}

/// Resolve `input` (zip file or directory) to an archive root.
pub fn stage_input(input: &Path, year_parent_dir: &str) -> Result<StagedInput> {
    if input.is_dir() {
        return Ok(StagedInput {
            root: resolve_archive_root(input, year_parent_dir)?,
            workspace: None,
        });
    }

    if !input.is_file() {
        return Err(anyhow!("input not found: {}", input.display()));
    }

    let workspace = tempfile::Builder::new()
        .prefix("payslip-upload-")
        .tempdir()
        .context("failed to create upload workspace")?;
    extract_upload(input, workspace.path())?;
    let root = resolve_archive_root(workspace.path(), year_parent_dir)?;

    info!(upload = %input.display(), root = %root.display(), "upload extracted");
    Ok(StagedInput {
        root,
        workspace: Some(workspace),
    })
}

/// Unpack a zip upload into `dest`
pub fn extract_upload(zip_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(zip_path)
        .with_context(|| format!("failed to open upload: {}", zip_path.display()))?;

    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("not a zip archive: {}", zip_path.display()))?;

    archive
        .extract(dest)
        .with_context(|| format!("failed to extract upload: {}", zip_path.display()))?;

    debug!(entries = archive.len(), dest = %dest.display(), "upload unpacked");
    Ok(())
}

/// Uploads are often zipped with their top-level folder included
/// (`payroll/HOLERITES/...`). When `extracted` has no year parent but exactly
/// one subdirectory that does, descend into it.
pub fn resolve_archive_root(extracted: &Path, year_parent_dir: &str) -> Result<PathBuf> {
    if extracted.join(year_parent_dir).is_dir() {
        return Ok(extracted.to_path_buf());
    }

    let subdirs: Vec<PathBuf> = fs::read_dir(extracted)
        .with_context(|| format!("failed to list {}", extracted.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();

    match subdirs.as_slice() {
        [only] if only.join(year_parent_dir).is_dir() => Ok(only.clone()),
        // Let the pipeline report the missing year parent
        _ => Ok(extracted.to_path_buf()),
    }
}

/// Zip every regular file directly in `dir` into `zip_path`, flat and
/// deflated. Returns the number of entries written.
pub fn package_output(dir: &Path, zip_path: &Path) -> Result<usize> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to list output directory: {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if let Some(parent) = zip_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let out = File::create(zip_path)
        .with_context(|| format!("failed to create bundle: {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("unnamed file in output: {}", path.display()))?;

        zip.start_file(name.as_str(), options)
            .with_context(|| format!("failed to add {name} to bundle"))?;
        let mut source = File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        io::copy(&mut source, &mut zip).with_context(|| format!("failed to write {name}"))?;
    }

    zip.finish()
        .with_context(|| format!("failed to finalize bundle: {}", zip_path.display()))?;

    info!(bundle = %zip_path.display(), files = files.len(), "bundle written");
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, FileOptions::default()).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    fn read_zip(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut body = Vec::new();
                entry.read_to_end(&mut body).unwrap();
                (entry.name().to_string(), body)
            })
            .collect()
    }

    #[test]
    fn test_extract_upload() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("uploaded.zip");
        write_zip(
            &upload,
            &[
                ("HOLERITES/", ""),
                ("HOLERITES/2019/", ""),
                ("HOLERITES/2019/jan.pdf", "%PDF"),
            ],
        );

        let dest = dir.path().join("x");
        fs::create_dir_all(&dest).unwrap();
        extract_upload(&upload, &dest).unwrap();
        assert!(dest.join("HOLERITES/2019/jan.pdf").is_file());
    }

    #[test]
    fn test_extract_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("uploaded.zip");
        fs::write(&upload, b"plain text").unwrap();
        assert!(extract_upload(&upload, dir.path()).is_err());
    }

    #[test]
    fn test_resolve_root_direct() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("HOLERITES")).unwrap();
        assert_eq!(
            resolve_archive_root(dir.path(), "HOLERITES").unwrap(),
            dir.path()
        );
    }

    #[test]
    fn test_resolve_root_descends_single_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let wrapper = dir.path().join("folha");
        fs::create_dir_all(wrapper.join("HOLERITES")).unwrap();
        assert_eq!(resolve_archive_root(dir.path(), "HOLERITES").unwrap(), wrapper);
    }

    #[test]
    fn test_resolve_root_ambiguous_keeps_extracted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a").join("HOLERITES")).unwrap();
        fs::create_dir_all(dir.path().join("b").join("HOLERITES")).unwrap();
        assert_eq!(
            resolve_archive_root(dir.path(), "HOLERITES").unwrap(),
            dir.path()
        );
    }

    #[test]
    fn test_stage_zip_input_is_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("uploaded.zip");
        write_zip(
            &upload,
            &[("payroll/HOLERITES/2020/fev.pdf", "%PDF")],
        );

        let staged = stage_input(&upload, "HOLERITES").unwrap();
        assert!(staged.is_extracted());
        let root = staged.root().to_path_buf();
        assert!(root.ends_with("payroll"));
        assert!(root.join("HOLERITES/2020/fev.pdf").is_file());

        drop(staged);
        assert!(!root.exists());
    }

    #[test]
    fn test_stage_directory_input() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("HOLERITES")).unwrap();
        let staged = stage_input(dir.path(), "HOLERITES").unwrap();
        assert!(!staged.is_extracted());
        assert_eq!(staged.root(), dir.path());
    }

    #[test]
    fn test_stage_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(stage_input(&dir.path().join("nope.zip"), "HOLERITES").is_err());
    }

    #[test]
    fn test_package_output_flat_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("John Doe");
        fs::create_dir_all(out.join("nested")).unwrap();
        fs::write(out.join("jan.pdf"), b"jan").unwrap();
        fs::write(out.join("dez.pdf"), b"dez").unwrap();
        fs::write(out.join("nested").join("skip.pdf"), b"x").unwrap();

        let bundle = dir.path().join("bundles").join("John Doe.zip");
        let written = package_output(&out, &bundle).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            read_zip(&bundle),
            vec![
                ("dez.pdf".to_string(), b"dez".to_vec()),
                ("jan.pdf".to_string(), b"jan".to_vec()),
            ]
        );
    }

    #[test]
    fn test_package_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty");
        fs::create_dir_all(&out).unwrap();
        let bundle = dir.path().join("empty.zip");

        assert_eq!(package_output(&out, &bundle).unwrap(), 0);
        assert!(read_zip(&bundle).is_empty());
    }
}
