use std::path::PathBuf;

use chrono::Utc;
use tokio::fs::{create_dir_all, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::err::Error;

// Filesystem-backed blob store for profile photos. Objects are written under
// a configured root and addressed by a public base URL.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    public_base: String,
}

impl PhotoStore {
    pub fn new<P: Into<PathBuf>>(root: P, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn save(
        &self,
        roll_number: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, Error> {
        let key = format!(
            "students/{}_{}_{}",
            sanitize(roll_number),
            Utc::now().timestamp_millis(),
            sanitize(file_name)
        );
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            create_dir_all(parent).await?;
        }
        let file = File::create(&path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).await?;
        writer.flush().await?;
        log::debug!("Stored photo at {}", path.display());
        Ok(format!("{}/{}", self.public_base, key))
    }
}

// Object keys must stay flat: strip anything that could walk the tree.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize("me photo.png"), "me_photo.png");
        assert_eq!(sanitize("R-042_a.jpg"), "R-042_a.jpg");
    }

    #[tokio::test]
    async fn save_writes_bytes_and_returns_public_url() {
        let root = std::env::temp_dir().join(format!("rollcall-store-{}", Uuid::new_v4()));
        let store = PhotoStore::new(&root, "https://cdn.example.com/media/");

        let url = store.save("R1", "face.png", b"png-bytes").await.unwrap();
        assert!(url.starts_with("https://cdn.example.com/media/students/R1_"));
        assert!(url.ends_with("_face.png"));

        let key = url
            .strip_prefix("https://cdn.example.com/media/")
            .unwrap();
        let stored = tokio::fs::read(root.join(key)).await.unwrap();
        assert_eq!(stored, b"png-bytes");

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
