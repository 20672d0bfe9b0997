//! Check-password command implementation.

use ldaptx_codec::Dn;
use ldaptx_core::Directory;
use std::path::Path;

/// Checks `password` for `dn`.
pub fn execute(dir: &Directory, dn: &str, password: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let dn = Dn::parse(dn)?;
    Ok(dir.check_password(&dn, password.as_bytes())?)
}

/// Runs the check-password command. A rejected password is an error so the
/// exit status reflects the verdict.
pub fn run(config: &Path, dn: &str, password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (conn, _) = super::connect(config)?;
    let dir = Directory::new(conn);
    if execute(&dir, dn, password)? {
        println!("password accepted");
        Ok(())
    } else {
        Err(format!("password rejected for {dn}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldaptx_testkit::{TestDirectory, TUX, TUX_PASSWORD};

    #[test]
    fn verdicts() {
        let test_dir = TestDirectory::new();
        assert!(execute(&test_dir, TUX, TUX_PASSWORD).unwrap());
        assert!(!execute(&test_dir, TUX, "walrus").unwrap());
        assert!(!execute(&test_dir, TUX, "").unwrap());
    }

    #[test]
    fn malformed_name_fails() {
        let test_dir = TestDirectory::new();
        assert!(execute(&test_dir, "uid", TUX_PASSWORD).is_err());
    }
}
