//! CLI command implementations.

pub mod apply;
pub mod check_password;
pub mod dn;
pub mod filter;
pub mod search;

use ldaptx_conn::{Connection, LdapSessionFactory, LdapSettings};
use std::path::Path;

/// Opens a connection described by a settings file. Nothing is sent to the
/// server until the first operation.
pub fn connect(config: &Path) -> Result<(Connection, LdapSettings), Box<dyn std::error::Error>> {
    let settings = LdapSettings::from_json_file(config)?;
    let mut conn = Connection::new(LdapSessionFactory::new(settings.clone()));
    if let Some(bind_dn) = settings.bind_identity()? {
        conn = conn.with_credentials(bind_dn, settings.bind_password.clone());
    }
    Ok((conn, settings))
}
