use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::{fs::File, io, path::Path};

/// Creates a gzipped tarball of the given directory trees. Entries are stored
/// relative to the filesystem root, so unpacking at `/` restores the trees in
/// place. Sources that don't exist are skipped.
pub fn create(archive: &Path, sources: &[&Path]) -> io::Result<()> {
    let file = File::create(archive)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    for source in sources {
        if !source.exists() {
            continue;
        }
        let stored = source.strip_prefix("/").unwrap_or(source);
        builder.append_dir_all(stored, source)?;
    }
    builder.into_inner()?.finish()?.sync_all()?;
    Ok(())
}

/// Unpacks an archive produced by [`create`] at the given filesystem root.
pub fn unpack(archive: &Path, root: &Path) -> io::Result<()> {
    let file = File::open(archive)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.unpack(root)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_restore_archived_tree_at_another_root() {
        let source_root = tempfile::tempdir().unwrap();
        let www = source_root.path().join("www");
        std::fs::create_dir_all(www.join("site")).unwrap();
        std::fs::write(www.join("site").join("index.html"), "<h1>hi</h1>").unwrap();

        let archive_dir = tempfile::tempdir().unwrap();
        let archive_path = archive_dir.path().join("www.tar.gz");
        create(&archive_path, &[&www]).unwrap();

        let restore_root = tempfile::tempdir().unwrap();
        unpack(&archive_path, restore_root.path()).unwrap();

        // entries were stored relative to /, so the full source path reappears
        // under the restore root
        let restored = restore_root
            .path()
            .join(www.strip_prefix("/").unwrap())
            .join("site")
            .join("index.html");
        assert_eq!(
            std::fs::read_to_string(restored).unwrap(),
            "<h1>hi</h1>"
        );
    }

    #[test]
    fn should_skip_missing_sources() {
        let archive_dir = tempfile::tempdir().unwrap();
        let archive_path = archive_dir.path().join("empty.tar.gz");

        create(&archive_path, &[Path::new("/does/not/exist")]).unwrap();

        assert!(archive_path.is_file());
    }
}
