use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use uuid::Uuid;

/// Key size used for signing keys.
pub const KEY_BITS: usize = 2048;

/// Generates an RSA private key and writes it to `<dir>/<uuid>.pem` in
/// PKCS#8 form. The file name stem becomes the key id.
///
/// # Returns
///
/// The kid and the path written.
pub fn generate_key(dir: &Path) -> anyhow::Result<(String, PathBuf)> {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, KEY_BITS).context("generate rsa key")?;
    let pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .context("encode private key")?;

    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let kid = Uuid::new_v4().to_string();
    let path = dir.join(format!("{kid}.pem"));

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(&path)
        .with_context(|| format!("create {}", path.display()))?;
    file.write_all(pem.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;

    Ok((kid, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_auth::KeyStore;

    #[test]
    fn test_generated_key_loads_under_its_kid() {
        let dir = tempfile::tempdir().unwrap();
        let (kid, path) = generate_key(dir.path()).unwrap();

        assert_eq!(path.file_stem().unwrap().to_str().unwrap(), kid);

        let store = KeyStore::new();
        assert_eq!(store.load(dir.path()).unwrap(), 1);
        assert!(store.key(&kid).is_ok());
    }
}
