//! Storage for uploaded venue images
//!
//! Images are stored under a new unique name (a UUIDv7, keeping the file extension) and are
//! referenced from the venue by their public URL. The web application serves them back at
//! `/images/{name}`.

use crate::cli_error::CliError;
use crate::setup;
use log::info;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub trait ImageStore: Send + Sync {
    /// Store the image data and return the public URL of the stored image.
    ///
    /// The file extension of the stored image is taken from `file_name` if possible, otherwise it
    /// is guessed from `content_type`.
    fn store_image(
        &self,
        data: &[u8],
        content_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<String, ImageStoreError>;

    /// Read back a stored image by its name (the last segment of its public URL)
    fn read_image(&self, name: &str) -> Result<Vec<u8>, ImageStoreError>;

    /// Remove a stored image by its public URL. URLs of images outside this store and images
    /// which are already gone are ignored.
    fn delete_image(&self, image_url: &str) -> Result<(), ImageStoreError>;
}

/// Get a [FileSystemImageStore], according to the "IMAGE_DIRECTORY" and "PUBLIC_BASE_URL"
/// environment variables. The image directory is created if it does not exist yet.
pub fn get_image_store_from_env() -> Result<FileSystemImageStore, CliError> {
    let directory = setup::get_image_directory_from_env()?;
    if let Err(error) = std::fs::create_dir_all(&directory) {
        return Err(CliError::ImageDirectoryError {
            path: directory,
            error,
        });
    }
    Ok(FileSystemImageStore::new(
        directory,
        setup::get_public_base_url_from_env()?,
    ))
}

pub struct FileSystemImageStore {
    directory: PathBuf,
    public_base_url: url::Url,
}

impl FileSystemImageStore {
    pub fn new(directory: PathBuf, mut public_base_url: url::Url) -> Self {
        if !public_base_url.path().ends_with('/') {
            let path = format!("{}/", public_base_url.path());
            public_base_url.set_path(&path);
        }
        Self {
            directory,
            public_base_url,
        }
    }
}

impl ImageStore for FileSystemImageStore {
    fn store_image(
        &self,
        data: &[u8],
        content_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<String, ImageStoreError> {
        if data.is_empty() {
            return Err(ImageStoreError::EmptyImage);
        }
        let name = new_image_name(content_type, file_name);
        std::fs::write(self.directory.join(&name), data)?;
        info!("Stored image {} ({} bytes)", name, data.len());
        Ok(public_image_url(&self.public_base_url, &name)?)
    }

    fn read_image(&self, name: &str) -> Result<Vec<u8>, ImageStoreError> {
        check_image_name(name)?;
        match std::fs::read(self.directory.join(name)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ImageStoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_image(&self, image_url: &str) -> Result<(), ImageStoreError> {
        let images_url = public_image_url(&self.public_base_url, "")?;
        let Some(name) = image_url.strip_prefix(&images_url) else {
            return Ok(());
        };
        check_image_name(name)?;
        match std::fs::remove_file(self.directory.join(name)) {
            Ok(()) => {
                info!("Deleted image {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn new_image_name(content_type: Option<&str>, file_name: Option<&str>) -> String {
    let extension = file_name
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .or_else(|| {
            content_type
                .and_then(mime_guess::get_mime_extensions_str)
                .and_then(|extensions| extensions.first())
                .map(|e| (*e).to_owned())
        });
    match extension {
        Some(extension) => format!("{}.{}", Uuid::now_v7(), extension),
        None => Uuid::now_v7().to_string(),
    }
}

fn public_image_url(base_url: &url::Url, name: &str) -> Result<String, url::ParseError> {
    Ok(base_url.join("images/")?.join(name)?.to_string())
}

/// Only plain file names are valid image names, to prevent path traversal
fn check_image_name(name: &str) -> Result<(), ImageStoreError> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
    {
        return Err(ImageStoreError::InvalidName);
    }
    Ok(())
}

#[derive(Debug)]
pub enum ImageStoreError {
    /// The uploaded image does not contain any data
    EmptyImage,
    /// The requested image name is not a plain file name
    InvalidName,
    /// No image with the requested name exists
    NotFound,
    /// Reading or writing the image file failed
    IoError(std::io::Error),
    /// The public URL of the image could not be built from the configured base URL
    UrlError(url::ParseError),
}

impl From<std::io::Error> for ImageStoreError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<url::ParseError> for ImageStoreError {
    fn from(value: url::ParseError) -> Self {
        Self::UrlError(value)
    }
}

impl Display for ImageStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyImage => f.write_str("Uploaded image is empty"),
            Self::InvalidName => f.write_str("Invalid image name"),
            Self::NotFound => f.write_str("Image does not exist"),
            Self::IoError(e) => write!(f, "Could not access image file: {}", e),
            Self::UrlError(e) => write!(f, "Could not build public image URL: {}", e),
        }
    }
}

impl std::error::Error for ImageStoreError {}

/// An [ImageStore] keeping the images in memory, for testing
#[cfg(test)]
#[derive(Default)]
pub struct MemoryImageStore {
    pub images: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl ImageStore for MemoryImageStore {
    fn store_image(
        &self,
        data: &[u8],
        content_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<String, ImageStoreError> {
        if data.is_empty() {
            return Err(ImageStoreError::EmptyImage);
        }
        let name = new_image_name(content_type, file_name);
        self.images
            .lock()
            .expect("Error while locking mutex.")
            .insert(name.clone(), data.to_vec());
        Ok(format!("http://localhost/images/{}", name))
    }

    fn read_image(&self, name: &str) -> Result<Vec<u8>, ImageStoreError> {
        check_image_name(name)?;
        self.images
            .lock()
            .expect("Error while locking mutex.")
            .get(name)
            .cloned()
            .ok_or(ImageStoreError::NotFound)
    }

    fn delete_image(&self, image_url: &str) -> Result<(), ImageStoreError> {
        if let Some(name) = image_url.strip_prefix("http://localhost/images/") {
            self.images
                .lock()
                .expect("Error while locking mutex.")
                .remove(name);
        }
        Ok(())
    }
}
