// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to run the scripted Drive session.
//
// Module responsibilities:
// - `auth`: OAuth credential descriptor, the cached token artifact and
//   its on-disk store, and the bootstrap that turns them into a usable
//   access token (prompting the user only when it has to).
// - `drive`: Encapsulates the HTTP calls against the Drive v3 REST
//   endpoints (create/upload, get, list, update, export).
// - `tasks`: The fixed sequence of operations the binary performs,
//   driven through a `DriveClient` handle.
//
// Keeping this separation means the Drive calls and the token bootstrap
// can be tested against a local fake backend instead of the real API.
pub mod auth;
pub mod drive;
pub mod tasks;
