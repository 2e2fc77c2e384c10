// Scripted run: the fixed sequence of Drive operations the binary
// performs. The remote ids are hard-coded, the flow is strictly linear
// and the first failing step aborts everything after it.

use crate::drive::{presentation_link, DriveClient};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::path::Path;

/// Folder the placeholder upload is created under.
pub const UPLOAD_FOLDER_ID: &str = "1jzeyuwpA8R-WG7mcdbB8eCIm1JF8i4rJ";
/// Presentation whose viewer link gets printed.
pub const LINK_FILE_ID: &str = "1PdQELlDjren_Yt7mJyx4cXkBytt5VlbbCnqHn_tgiI0";
/// Document that gets renamed.
pub const RENAME_FILE_ID: &str = "1pXhRLBmHmpVGbWqd4f8CNjz4kA9Bgq0OmtokW622gSk";

const PLACEHOLDER_NAME: &str = "created.docx";
const PLACEHOLDER_BODY: &[u8] = b"placeholder document body\n";
const RENAMED_TITLE: &str = "texto";

/// Run the whole sequence against `api`, writing the placeholder file
/// into `work_dir`:
/// 1. write the placeholder and upload it under [`UPLOAD_FOLDER_ID`],
/// 2. confirm [`LINK_FILE_ID`] exists and print its viewer link,
/// 3. rename [`RENAME_FILE_ID`].
pub fn run(api: &DriveClient, work_dir: &Path) -> Result<()> {
    let path = work_dir.join(PLACEHOLDER_NAME);
    fs::write(&path, PLACEHOLDER_BODY)
        .with_context(|| format!("Writing placeholder file {}", path.display()))?;
    let mut content = File::open(&path)
        .with_context(|| format!("Opening placeholder file {}", path.display()))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message("Uploading...");
    let uploaded = api.create_file(
        PLACEHOLDER_NAME,
        "application/octet-stream",
        &mut content,
        UPLOAD_FOLDER_ID,
    );
    spinner.finish_and_clear();
    let uploaded = uploaded?;
    println!("File '{}' uploaded successfully", uploaded.name);
    println!("File Id: '{}'", uploaded.id);

    // Fetch the metadata first so a dead id fails here instead of
    // producing a link to nothing.
    api.file_metadata(LINK_FILE_ID)?;
    println!("\n{}", presentation_link(LINK_FILE_ID));

    let renamed = api.rename_file(RENAME_FILE_ID, RENAMED_TITLE)?;
    println!("Renamed remote file to: {}", renamed.name);

    // TODO: call `export_file` on the slide deck once its target format
    // is decided; the conversion was never settled upstream.
    Ok(())
}
