// Entrypoint for the CLI application.
// - Keeps `main` small: bootstrap a token, build the Drive client and
//   hand it to the scripted run.
// - Returns `anyhow::Result` so any failed step exits non-zero with its
//   context chain printed.

use anyhow::Context;
use gdrive_tasks::auth::{self, AppSecret, ConsolePrompt, TokenStore};
use gdrive_tasks::drive::DriveClient;
use gdrive_tasks::tasks;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    // The OAuth client descriptor downloaded from the provider console,
    // expected in the working directory.
    let secret = AppSecret::from_file(Path::new("credentials.json"))?;

    // One HTTP client for the token endpoint; the Drive client builds
    // its own. First run prompts for an authorization code, later runs
    // reuse (or refresh) the saved token silently.
    let http = reqwest::blocking::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let store = TokenStore::default_location();
    let token = auth::obtain_token(&http, &secret, &store, &ConsolePrompt)?;

    let api = DriveClient::new(&token.access_token)?;
    tasks::run(&api, Path::new("."))?;
    Ok(())
}
