//! [`Storage`] of binary objects.

use std::{io, path::PathBuf};

use derive_more::{Debug, Display, Error as StdError, From};
use tokio::fs;
use tracerr::Traced;

/// Storage operation.
pub use common::Handler as Storage;

/// Operation to upload an object into a [`Storage`], returning its public URL.
#[derive(Clone, Debug)]
pub struct Upload {
    /// Bucket to upload the object into.
    pub bucket: &'static str,

    /// `/`-separated path of the object inside the bucket.
    pub path: String,

    /// Contents of the object.
    #[debug("{} bytes", bytes.len())]
    pub bytes: Vec<u8>,
}

/// [`Storage`] keeping objects as files in a local directory.
#[derive(Clone, Debug)]
pub struct Fs {
    /// Directory the buckets are created in.
    root: PathBuf,

    /// Base URL the `root` directory is publicly served under.
    public_url: String,
}

impl Fs {
    /// Creates a new [`Fs`] storage in the provided `root` directory, which is
    /// served under the provided `public_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Returns the directory this [`Fs`] storage keeps its objects in.
    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl Storage<Upload> for Fs {
    type Ok = String;
    type Err = Traced<Error>;

    async fn execute(&self, upload: Upload) -> Result<Self::Ok, Self::Err> {
        let Upload {
            bucket,
            path,
            bytes,
        } = upload;

        let segments = path.split('/').collect::<Vec<_>>();
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('\\'))
        {
            return Err(tracerr::new!(Error::InvalidPath(path)));
        }

        let file = segments
            .iter()
            .fold(self.root.join(bucket), |dir, s| dir.join(s));
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(tracerr::from_and_wrap!(=> Error))?;
        }
        fs::write(&file, bytes)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        Ok(format!("{}/{bucket}/{path}", self.public_url))
    }
}

/// [`Storage`] error.
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Filesystem error.
    #[display("Filesystem operation failed: {_0}")]
    Io(io::Error),

    /// Object path is not a plain relative path.
    #[display("Invalid object path: `{_0}`")]
    #[from(ignore)]
    InvalidPath(#[error(not(source))] String),
}

#[cfg(test)]
pub mod memory {
    //! In-memory [`Storage`] used in tests.

    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use tracerr::Traced;

    use super::{Error, Storage, Upload};

    /// In-memory [`Storage`] keeping uploaded objects by their URLs.
    #[derive(Clone, Debug, Default)]
    pub struct Memory(Arc<Mutex<HashMap<String, Vec<u8>>>>);

    impl Memory {
        /// Returns URLs of all the uploaded objects.
        pub fn urls(&self) -> Vec<String> {
            let mut urls =
                self.0.lock().unwrap().keys().cloned().collect::<Vec<_>>();
            urls.sort();
            urls
        }
    }

    impl Storage<Upload> for Memory {
        type Ok = String;
        type Err = Traced<Error>;

        async fn execute(&self, upload: Upload) -> Result<Self::Ok, Self::Err> {
            let url = format!("/storage/{}/{}", upload.bucket, upload.path);
            _ = self.0.lock().unwrap().insert(url.clone(), upload.bytes);
            Ok(url)
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{Error, Fs, Storage as _, Upload};

    #[tokio::test]
    async fn writes_objects_under_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Fs::new(dir.path(), "http://localhost:8080/storage/");

        let url = storage
            .execute(Upload {
                bucket: "property-images",
                path: "landlord/property/photo.png".into(),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap();

        assert_eq!(
            url,
            "http://localhost:8080/storage/property-images/landlord/property/\
             photo.png",
        );
        let written = tokio::fs::read(
            dir.path().join("property-images/landlord/property/photo.png"),
        )
        .await
        .unwrap();
        assert_eq!(written, [1, 2, 3]);
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Fs::new(dir.path(), "/storage");

        for path in ["../secret.png", "a//b.png", "/abs.png", "a/./b.png"] {
            let err = storage
                .execute(Upload {
                    bucket: "property-images",
                    path: path.into(),
                    bytes: vec![],
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err.as_ref(), Error::InvalidPath(_)),
                "path: {path}",
            );
        }
    }
}
