use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{info, warn};

use crate::config::Config;

const RECIPE_IMAGES_DIR: &str = "recipes_images";
const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decodes `data:image/<ext>;base64,<payload>`.
pub fn decode_data_uri(raw: &str) -> Result<ImageUpload, &'static str> {
    let rest = raw
        .strip_prefix("data:image/")
        .ok_or("Upload a valid image encoded as a data URI.")?;
    let (extension, payload) = rest
        .split_once(";base64,")
        .ok_or("Upload a valid image encoded as a data URI.")?;
    let extension = extension.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err("Unsupported image format.");
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| "Image payload is not valid base64.")?;
    if bytes.is_empty() {
        return Err("The submitted image is empty.");
    }
    Ok(ImageUpload { extension, bytes })
}

/// Writes the image under the media root and returns its public URL.
pub async fn store_image(config: &Config, upload: &ImageUpload) -> std::io::Result<String> {
    let dir = config.media_root.join(RECIPE_IMAGES_DIR);
    tokio::fs::create_dir_all(&dir).await?;
    let stem: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let file_name = format!("{}.{}", stem.to_ascii_lowercase(), upload.extension);
    tokio::fs::write(dir.join(&file_name), &upload.bytes).await?;
    info!("Stored recipe image {}", file_name);
    Ok(format!(
        "{}/{}/{}",
        config.media_url, RECIPE_IMAGES_DIR, file_name
    ))
}

/// Best-effort removal of a previously stored image.
pub async fn remove_image(config: &Config, url: &str) {
    let Some(path) = local_path(config, url) else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!("Could not remove image {}: {}", path.display(), e);
    }
}

fn local_path(config: &Config, url: &str) -> Option<PathBuf> {
    let relative = url.strip_prefix(&config.media_url)?.trim_start_matches('/');
    if relative.is_empty() || relative.split('/').any(|part| part == "..") {
        return None;
    }
    Some(config.media_root.join(relative))
}
