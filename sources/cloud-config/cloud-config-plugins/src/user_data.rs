//! This module turns raw user data, which may be gzip-compressed, into a `ConfigDocument`.

use crate::document::is_cloud_config;
use crate::error;
use crate::{ConfigDocument, Result};
use flate2::read::GzDecoder;
use snafu::ResultExt;
use std::fs;
use std::io::{self, ErrorKind, Read};
use std::path::Path;

/// These bytes are at the start of any gzip-compressed data.
/// https://en.wikipedia.org/wiki/List_of_file_signatures
const GZ_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Takes bytes of UTF-8 text, which may be gzip-compressed, and returns the uncompressed string.
pub fn expand_slice_maybe(input: &[u8]) -> io::Result<String> {
    let mut output = String::new();
    if input.starts_with(&GZ_MAGIC) {
        GzDecoder::new(input).read_to_string(&mut output)?;
    } else {
        output = String::from_utf8(input.to_vec())
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
    }
    Ok(output)
}

/// Reads user data from `path`, decompressing it if needed.  A missing file is not an error;
/// it just means there's no user data.
pub fn read_user_data<P>(path: P) -> Result<Option<String>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("{} does not exist, not using it", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e).context(error::UserDataReadSnafu { path }),
    };

    let user_data = expand_slice_maybe(&raw).context(error::UserDataReadSnafu { path })?;
    if user_data.trim().is_empty() {
        warn!("{} exists but is empty", path.display());
        return Ok(None);
    }

    trace!("Received user data: {}", user_data);
    Ok(Some(user_data))
}

/// Parses user data into a document, or returns `None` if the user data isn't cloud-config.
pub fn parse_user_data<S>(user_data: S) -> Result<Option<ConfigDocument>>
where
    S: AsRef<str>,
{
    let user_data = user_data.as_ref();
    if !is_cloud_config(user_data) {
        info!("User data is not cloud-config, ignoring it");
        return Ok(None);
    }
    ConfigDocument::from_yaml_str(user_data).map(Some)
}

/// Reads and parses the user data at `path`.  `None` means there's nothing for us to do.
pub fn load_document<P>(path: P) -> Result<Option<ConfigDocument>>
where
    P: AsRef<Path>,
{
    match read_user_data(path)? {
        Some(user_data) => parse_user_data(user_data),
        None => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    const USER_DATA: &str = "#cloud-config\nntp:\n  servers: [10.0.0.1]\n";

    fn gzip(data: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn plain_and_gzip_match() {
        assert_eq!(expand_slice_maybe(USER_DATA.as_bytes()).unwrap(), USER_DATA);
        assert_eq!(expand_slice_maybe(&gzip(USER_DATA)).unwrap(), USER_DATA);
        assert_eq!(expand_slice_maybe(&gzip("")).unwrap(), "");
    }

    #[test]
    fn magic_prefix() {
        // Half of the gzip magic is just data.
        assert_eq!(expand_slice_maybe(&[0x1f]).unwrap(), "\u{1f}");
    }

    #[test]
    fn invalid_utf8() {
        let err = expand_slice_maybe(&[0xff, 0xfe, 0xfd]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn missing_and_empty_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user-data");
        assert_eq!(load_document(&path).unwrap(), None);

        fs::write(&path, "  \n").unwrap();
        assert_eq!(load_document(&path).unwrap(), None);
    }

    #[test]
    fn compressed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user-data");
        fs::write(&path, gzip(USER_DATA)).unwrap();

        let doc = load_document(&path).unwrap().unwrap();
        assert!(doc.get("ntp").is_some());
    }

    #[test]
    fn not_cloud_config() {
        assert_eq!(parse_user_data("#!/bin/sh\necho hi\n").unwrap(), None);
        assert_eq!(parse_user_data("ntp: {servers: [a]}\n").unwrap(), None);
    }

    #[test]
    fn unreadable_file() {
        let dir = TempDir::new().unwrap();
        // Reading a directory fails with something other than NotFound.
        let err = read_user_data(dir.path()).unwrap_err();
        assert!(matches!(err, Error::UserDataRead { .. }));
    }
}
