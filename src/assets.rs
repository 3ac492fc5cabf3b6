use std::path::{Path, PathBuf};
use url::Url;

use crate::popup::layout::Size;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("remote image {0} is not fetched")]
    Remote(String),
    #[error("unsupported image source {0}")]
    Unsupported(String),
    #[error("cannot read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Map an `<img src>` to a local file. Relative paths resolve against `root`.
pub fn resolve_image_path(src: &str, root: &Path) -> Result<PathBuf, AssetError> {
    match Url::parse(src) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| AssetError::Unsupported(src.to_string())),
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Err(AssetError::Remote(src.to_string()))
        }
        // Windows drive letters parse as a one-letter scheme.
        Ok(url) if url.scheme().len() > 1 => Err(AssetError::Unsupported(src.to_string())),
        _ => Ok(root.join(src)),
    }
}

/// Natural pixel size of the image at `src`, read from its header.
pub fn probe_image(src: &str, root: &Path) -> Result<Size, AssetError> {
    let path = resolve_image_path(src, root)?;
    let (width, height) =
        image::image_dimensions(&path).map_err(|source| AssetError::Image { path, source })?;
    Ok(Size::new(f64::from(width), f64::from(height)))
}
