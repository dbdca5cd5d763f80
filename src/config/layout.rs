//! Conventional on-disk locations of rendered artifacts.
use std::path::{Path, PathBuf};

/// Resolves every artifact path relative to a root directory.
///
/// The root is `/` in production; tests point it at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Layout {
    /// A layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory every path is resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn at(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Home directory of `user`.
    #[must_use]
    pub fn home(&self, user: &str) -> PathBuf {
        self.at("home").join(user)
    }

    /// Samba configuration file.
    #[must_use]
    pub fn smb_conf(&self) -> PathBuf {
        self.at("etc/samba/smb.conf")
    }

    /// Samba log directory.
    #[must_use]
    pub fn samba_log_dir(&self) -> PathBuf {
        self.at("var/log/samba")
    }

    /// nginx configuration file.
    #[must_use]
    pub fn nginx_conf(&self) -> PathBuf {
        self.at("etc/nginx/nginx.conf")
    }

    /// vsftpd configuration file.
    #[must_use]
    pub fn vsftpd_conf(&self) -> PathBuf {
        self.at("etc/vsftpd/vsftpd.conf")
    }

    /// vsftpd login allow list.
    #[must_use]
    pub fn vsftpd_user_list(&self) -> PathBuf {
        self.at("etc/vsftpd/user_list")
    }

    /// vsftpd transfer and login log.
    #[must_use]
    pub fn vsftpd_log(&self) -> PathBuf {
        self.at("var/log/vsftpd.log")
    }

    /// FTP TLS certificate.
    #[must_use]
    pub fn ftp_certificate(&self) -> PathBuf {
        self.at("var/lib/sharehost/tls/ftp.crt")
    }

    /// FTP TLS private key.
    #[must_use]
    pub fn ftp_private_key(&self) -> PathBuf {
        self.at("var/lib/sharehost/tls/ftp.key")
    }

    /// OpenSSH daemon configuration file.
    #[must_use]
    pub fn sshd_config(&self) -> PathBuf {
        self.at("etc/ssh/sshd_config")
    }

    /// Host key file for `algorithm` (`ed25519`, `rsa`).
    #[must_use]
    pub fn ssh_host_key(&self, algorithm: &str) -> PathBuf {
        self.at("var/lib/sharehost/ssh")
            .join(format!("ssh_host_{algorithm}_key"))
    }

    /// NFS exports table.
    #[must_use]
    pub fn exports(&self) -> PathBuf {
        self.at("etc/exports")
    }
}
