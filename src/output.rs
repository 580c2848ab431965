//! Writing JSON output to a file or standard output.

use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt as _, BufWriter},
};

use crate::prelude::*;

/// Create an [`AsyncWrite`] for a file or stdout.
pub async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create file at path: {:?}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write a value as pretty-printed JSON, followed by a newline.
pub async fn write_json<T>(path: Option<&Path>, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    let mut writer = BufWriter::new(create_writer(path).await?);
    writer
        .write_all(json.as_bytes())
        .await
        .context("Failed to write JSON to output")?;
    writer
        .write_all(b"\n")
        .await
        .context("Failed to write newline to output")?;
    writer.flush().await.context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(Some(&path), &json!({ "words": [] })).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        let parsed: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, json!({ "words": [] }));
    }
}
