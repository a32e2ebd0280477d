//! Batch download of the files attached to one submission

use crate::client::AnytaskClient;
use crate::models::Submission;
use crate::parser::format_student_folder;
use crate::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Replaces path separators so an attachment name stays inside its folder
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "file".to_string(),
        _ => cleaned,
    }
}

fn student_dir(base_dir: &Path, submission: &Submission) -> PathBuf {
    let folder = format_student_folder(&submission.student_name);
    if folder.is_empty() {
        base_dir.join(submission.issue_id.to_string())
    } else {
        base_dir.join(sanitize_file_name(&folder))
    }
}

/// Downloads every attachment and Colab notebook of a submission
///
/// Files land in `<base_dir>/<student folder>/`. The n-th Colab link (from 1)
/// is saved as `colab_<issue>_<n>.ipynb`, or as `colab_<issue>_<n>.url.txt`
/// holding the link when the notebook cannot be fetched.
///
/// # Returns
///
/// Saved paths keyed by attachment file name or Colab link. Failed
/// downloads are logged and skipped; only authentication failures abort.
pub async fn download_submission_files(
    client: &AnytaskClient,
    submission: &Submission,
    base_dir: &Path,
) -> Result<BTreeMap<String, PathBuf>> {
    let dir = student_dir(base_dir, submission);
    tokio::fs::create_dir_all(&dir).await?;

    let mut downloaded = BTreeMap::new();

    for file in submission.files() {
        let dest = dir.join(sanitize_file_name(&file.filename));
        let result = client.download_file(&file.download_url, &dest).await?;
        if result.is_success() {
            downloaded.insert(file.filename.clone(), dest);
        } else {
            tracing::warn!(
                "Skipping {} for issue {}: {}",
                file.filename,
                submission.issue_id,
                result.reason()
            );
        }
    }

    let colab_links = submission
        .links()
        .filter(|link| link.contains("colab.research.google.com"));

    for (n, link) in colab_links.enumerate() {
        let stem = format!("colab_{}_{}", submission.issue_id, n + 1);
        let dest = dir.join(format!("{}.ipynb", stem));
        let result = client.download_colab_notebook(link, &dest).await;
        if result.is_success() {
            downloaded.insert(link.to_string(), dest);
            continue;
        }

        let url_file = dir.join(format!("{}.url.txt", stem));
        match tokio::fs::write(&url_file, link).await {
            Ok(()) => {
                downloaded.insert(link.to_string(), url_file);
            }
            Err(e) => tracing::warn!("Failed to write {}: {}", url_file.display(), e),
        }
    }

    tracing::info!(
        "Downloaded {} file(s) for issue {} into {}",
        downloaded.len(),
        submission.issue_id,
        dir.display()
    );
    Ok(downloaded)
}
