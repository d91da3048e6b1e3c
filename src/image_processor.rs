use image::RgbImage;
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("image file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to load image from {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to save image to {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Decodes files into RGB buffers and writes buffers back out. Colour
/// profiles and metadata are not preserved, only raw pixels.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    supported_formats: Vec<&'static str>,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        Self {
            supported_formats: vec!["png", "jpg", "jpeg", "bmp", "gif", "tiff", "webp"],
        }
    }

    pub fn supported_formats(&self) -> &[&'static str] {
        &self.supported_formats
    }

    fn check_extension(&self, path: &Path) -> Result<(), LoaderError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(extension) => {
                let ext_lower = extension.to_lowercase();
                if self.supported_formats.contains(&ext_lower.as_str()) {
                    Ok(())
                } else {
                    Err(LoaderError::UnsupportedFormat(extension.to_string()))
                }
            }
            None => Err(LoaderError::UnsupportedFormat(format!(
                "no file extension on {}",
                path.display()
            ))),
        }
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<RgbImage, LoaderError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }
        self.check_extension(path)?;

        let img = image::open(path).map_err(|source| LoaderError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgb_img = img.to_rgb8();

        debug!("Successfully loaded image: {}x{}", rgb_img.width(), rgb_img.height());
        Ok(rgb_img)
    }

    pub fn save<P: AsRef<Path>>(&self, image: &RgbImage, path: P) -> Result<(), LoaderError> {
        let path = path.as_ref();
        self.check_extension(path)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LoaderError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        image.save(path).map_err(|source| LoaderError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Image saved successfully to {}", path.display());
        Ok(())
    }
}
