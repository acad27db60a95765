//! Moving the bundle and the cookbooks onto the host.

use crate::bundle::archive_name;
use crate::error::{Error, Result};
use crate::session::Session;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Remote name of the generated configuration document.
pub const CONFIG_FILE: &str = "solo.rb";
/// Remote name of the generated attributes document.
pub const ATTRIBUTES_FILE: &str = "solo.json";
/// Remote name of the cookbook archive.
pub const COOKBOOK_ARCHIVE: &str = "cookbooks.tar.gz";

/// How the local cookbook archive is built.
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Leave out macOS metadata (`._*` AppleDouble files and `.DS_Store`).
    /// Only takes effect when archiving on macOS.
    pub copyfile_disable: bool,
    /// Directory for the temporary archive; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

impl ArchiveOptions {
    fn strips_metadata(&self) -> bool {
        self.copyfile_disable && cfg!(target_os = "macos")
    }
}

/// Upload `solo.rb` and `solo.json` into the working directory.
pub fn transfer_bundle(session: &mut Session<'_>, config: &str, attributes: &str) -> Result<()> {
    let config_path = session.working_path(CONFIG_FILE)?;
    session.transport().put(config.as_bytes(), &config_path)?;
    let attributes_path = session.working_path(ATTRIBUTES_FILE)?;
    session
        .transport()
        .put(attributes.as_bytes(), &attributes_path)?;
    Ok(())
}

/// Archive the cookbook directories, upload the archive and unpack it in
/// the working directory.
///
/// The local archive is a temporary file owned by this function; it is
/// removed before returning on every path, including packaging and
/// transport failures.
pub fn transfer_cookbooks(
    session: &mut Session<'_>,
    cookbook_paths: &[String],
    options: &ArchiveOptions,
) -> Result<()> {
    let archive = match &options.temp_dir {
        Some(dir) => tempfile::Builder::new()
            .prefix("cookbooks")
            .suffix(".tar.gz")
            .tempfile_in(dir),
        None => tempfile::Builder::new()
            .prefix("cookbooks")
            .suffix(".tar.gz")
            .tempfile(),
    }
    .map_err(|e| Error::packaging(format!("could not create temporary archive: {e}")))?;

    write_archive(&archive, cookbook_paths, options)?;
    log::debug!("Packaged cookbooks into {}", archive.path().display());

    let remote = session.working_path(COOKBOOK_ARCHIVE)?;
    session.transport().upload(archive.path(), &remote)?;
    let dir = session.working_path("")?;
    session.run(&format!("cd {dir} && tar -xzf {COOKBOOK_ARCHIVE}"))
}

fn write_archive(archive: &NamedTempFile, cookbook_paths: &[String], options: &ArchiveOptions) -> Result<()> {
    let file = archive
        .reopen()
        .map_err(|e| Error::packaging(format!("could not open temporary archive: {e}")))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for path in cookbook_paths {
        append_directory(&mut builder, Path::new(path), &archive_name(path), options)?;
    }
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(|e| Error::packaging(format!("could not finish archive: {e}")))?;
    Ok(())
}

fn append_directory(
    builder: &mut tar::Builder<GzEncoder<File>>,
    root: &Path,
    name: &str,
    options: &ArchiveOptions,
) -> Result<()> {
    let strip = options.strips_metadata();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(strip && is_macos_metadata(entry.file_name())));

    for entry in walker {
        let entry =
            entry.map_err(|e| Error::packaging(format!("cannot read {}: {e}", root.display())))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::packaging(e.to_string()))?;
        let entry_name = if relative.as_os_str().is_empty() {
            PathBuf::from(name)
        } else {
            Path::new(name).join(relative)
        };

        let result = if entry.file_type().is_dir() {
            builder.append_dir(&entry_name, entry.path())
        } else {
            builder.append_path_with_name(entry.path(), &entry_name)
        };
        result.map_err(|e| {
            Error::packaging(format!("cannot archive {}: {e}", entry.path().display()))
        })?;
    }
    Ok(())
}

fn is_macos_metadata(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with("._") || name == ".DS_Store"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Call, MockTransport};
    use flate2::read::GzDecoder;
    use std::fs;
    use tempfile::TempDir;

    fn cookbooks(dir: &TempDir) -> String {
        let root = dir.path().join("cookbooks");
        fs::create_dir_all(root.join("base/recipes")).unwrap();
        fs::write(root.join("base/recipes/default.rb"), "package 'git'\n").unwrap();
        fs::write(root.join("base/metadata.rb"), "name 'base'\n").unwrap();
        root.to_string_lossy().into_owned()
    }

    fn options(dir: &TempDir) -> ArchiveOptions {
        let temp = dir.path().join("tmp");
        fs::create_dir_all(&temp).unwrap();
        ArchiveOptions {
            copyfile_disable: false,
            temp_dir: Some(temp),
        }
    }

    fn temp_is_empty(opts: &ArchiveOptions) -> bool {
        fs::read_dir(opts.temp_dir.as_ref().unwrap())
            .unwrap()
            .next()
            .is_none()
    }

    #[test]
    fn test_transfer_bundle() {
        let mock = MockTransport::new();
        let mut session = Session::new(&mock, "/tmp/chef", false);
        transfer_bundle(&mut session, "cookbook_path []\n", "{}").unwrap();

        assert_eq!(
            mock.put_contents("/tmp/chef/solo.rb").unwrap(),
            b"cookbook_path []\n"
        );
        assert_eq!(mock.put_contents("/tmp/chef/solo.json").unwrap(), b"{}");
        assert_eq!(
            mock.commands(),
            vec!["mkdir -p /tmp/chef", "sudo chown -R deploy /tmp/chef"]
        );
    }

    #[test]
    fn test_transfer_cookbooks_uploads_and_extracts() {
        let dir = TempDir::new().unwrap();
        let path = cookbooks(&dir);
        let opts = options(&dir);
        let mock = MockTransport::new();
        let mut session = Session::new(&mock, "/tmp/chef", true);

        transfer_cookbooks(&mut session, &[path], &opts).unwrap();

        let calls = mock.calls();
        let upload = calls
            .iter()
            .find_map(|c| match c {
                Call::Upload {
                    local,
                    remote,
                    existed,
                } => Some((local.clone(), remote.clone(), *existed)),
                _ => None,
            })
            .unwrap();
        assert_eq!(upload.1, "/tmp/chef/cookbooks.tar.gz");
        assert!(upload.2, "archive should exist while uploading");
        assert!(!upload.0.exists(), "archive should be removed afterwards");
        assert!(temp_is_empty(&opts));
        assert_eq!(
            mock.commands().last().unwrap(),
            "cd /tmp/chef && tar -xzf cookbooks.tar.gz"
        );
    }

    #[test]
    fn test_archive_removed_on_remote_failure() {
        let dir = TempDir::new().unwrap();
        let path = cookbooks(&dir);
        let opts = options(&dir);
        let mock = MockTransport::new().fail_on("tar -xzf");
        let mut session = Session::new(&mock, "/tmp/chef", false);

        let err = transfer_cookbooks(&mut session, &[path], &opts).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert!(temp_is_empty(&opts));
    }

    #[test]
    fn test_archive_removed_on_upload_failure() {
        let dir = TempDir::new().unwrap();
        let path = cookbooks(&dir);
        let opts = options(&dir);
        let mock = MockTransport::new().fail_on("cookbooks.tar.gz");
        let mut session = Session::new(&mock, "/tmp/chef", false);

        assert!(transfer_cookbooks(&mut session, &[path], &opts).is_err());
        assert!(temp_is_empty(&opts));
    }

    #[test]
    fn test_archive_removed_on_packaging_failure() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        let missing = dir.path().join("nope").to_string_lossy().into_owned();
        let mock = MockTransport::new();
        let mut session = Session::new(&mock, "/tmp/chef", false);

        let err = transfer_cookbooks(&mut session, &[missing], &opts).unwrap_err();
        assert!(matches!(err, Error::Packaging { .. }));
        assert!(temp_is_empty(&opts));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_archive_layout() {
        let dir = TempDir::new().unwrap();
        let path = cookbooks(&dir);
        let archive = NamedTempFile::new_in(dir.path()).unwrap();
        write_archive(&archive, &[path.clone()], &ArchiveOptions::default()).unwrap();

        let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive.path()).unwrap()));
        let names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        let prefix = archive_name(&path);
        assert!(names.iter().any(|n| n.trim_end_matches('/') == prefix));
        assert!(names.contains(&format!("{prefix}/base/recipes/default.rb")));
        assert!(names.contains(&format!("{prefix}/base/metadata.rb")));
    }

    #[test]
    fn test_parent_relative_cookbook_path() {
        let dir = TempDir::new().unwrap();
        cookbooks(&dir);
        fs::create_dir_all(dir.path().join("app")).unwrap();
        let path = format!("{}/app/../cookbooks", dir.path().display());
        let opts = options(&dir);
        let mock = MockTransport::new();
        let mut session = Session::new(&mock, "/tmp/chef", false);

        transfer_cookbooks(&mut session, &[path.clone()], &opts).unwrap();
        assert!(temp_is_empty(&opts));

        let archive = NamedTempFile::new_in(dir.path()).unwrap();
        write_archive(&archive, &[path.clone()], &ArchiveOptions::default()).unwrap();
        let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive.path()).unwrap()));
        let names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        let prefix = archive_name(&path);
        assert!(!prefix.split('/').any(|part| part == ".."));
        assert!(names.contains(&format!("{prefix}/base/recipes/default.rb")));
    }

    #[test]
    fn test_macos_metadata_names() {
        assert!(is_macos_metadata(std::ffi::OsStr::new("._default.rb")));
        assert!(is_macos_metadata(std::ffi::OsStr::new(".DS_Store")));
        assert!(!is_macos_metadata(std::ffi::OsStr::new(".kitchen.yml")));
    }
}
