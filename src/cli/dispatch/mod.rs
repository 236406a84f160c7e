//! Command-line argument dispatch.
//!
//! Parses validated CLI matches and maps them to the appropriate action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, db, jwt, oauth};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let db = db::Options::parse(matches)?;
    let jwt = jwt::Options::parse(matches)?;
    let auth = auth::Options::parse(matches)?;
    let oauth = oauth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        db,
        jwt,
        auth,
        oauth,
    }))
}
