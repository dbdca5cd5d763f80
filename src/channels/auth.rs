//! Recognition of authentication attempts in daemon output.
//!
//! Each daemon reports logins in its own format. Detection is best effort:
//! a line that does not match the channel's known markers yields nothing.

use std::fmt;

use super::Channel;

/// An authentication attempt reported by a supervised daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    /// Channel whose daemon reported the attempt.
    pub channel: Channel,
    /// Whether the login was accepted.
    pub success: bool,
    /// Login name, when the daemon reports one.
    pub user: Option<String>,
    /// Client address, when the daemon reports one.
    pub client: Option<String>,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.success { "succeeded" } else { "failed" };
        write!(f, "{} authentication {outcome}", self.channel)?;
        if let Some(user) = &self.user {
            write!(f, " for {user}")?;
        }
        if let Some(client) = &self.client {
            write!(f, " from {client}")?;
        }
        Ok(())
    }
}

/// Inspect one output line of a `channel` daemon.
#[must_use]
pub fn detect(channel: Channel, line: &str) -> Option<AuthEvent> {
    let line = line.trim();
    let (success, user, client) = match channel {
        Channel::Smb => smb(line)?,
        Channel::Webdav => webdav(line)?,
        Channel::Ftp => ftp(line)?,
        Channel::Sftp => sftp(line)?,
        Channel::Nfs => nfs(line)?,
    };
    Some(AuthEvent {
        channel,
        success,
        user: user.filter(|u| !u.is_empty()),
        client: client.filter(|c| !c.is_empty()),
    })
}

type Detected = (bool, Option<String>, Option<String>);

/// Samba JSON audit records: `{"type": "Authentication", "Authentication": {...}}`.
fn smb(line: &str) -> Option<Detected> {
    if !(line.starts_with('{') && line.ends_with('}')) {
        return None;
    }
    let record: serde_json::Value = serde_json::from_str(line).ok()?;
    if record.get("type")?.as_str()? != "Authentication" {
        return None;
    }
    let auth = record.get("Authentication")?;
    let field = |name: &str| auth.get(name).and_then(serde_json::Value::as_str).map(String::from);
    Some((
        field("status").as_deref() == Some("NT_STATUS_OK"),
        field("clientAccount"),
        field("remoteAddress"),
    ))
}

/// nginx access log: `addr - user [time] "request" status ...`.
fn webdav(line: &str) -> Option<Detected> {
    let mut head = line.split_whitespace();
    let client = head.next()?;
    let _ident = head.next()?;
    let user = head.next()?;
    if user == "-" {
        return None;
    }
    let (_, after_request) = line.split_once("\" ")?;
    let status = after_request.split_whitespace().next()?;
    let status: u16 = status.parse().ok()?;
    Some((
        !matches!(status, 401 | 403),
        Some(user.to_string()),
        Some(client.to_string()),
    ))
}

/// vsftpd log: `... [pid 12] [alice] OK LOGIN: Client "10.0.0.2"`.
fn ftp(line: &str) -> Option<Detected> {
    let success = if line.contains("OK LOGIN") {
        true
    } else if line.contains("FAIL LOGIN") {
        false
    } else {
        return None;
    };
    let user = line
        .split('[')
        .skip(1)
        .filter_map(|part| part.split_once(']').map(|(inside, _)| inside))
        .find(|inside| !inside.starts_with("pid "))
        .map(String::from);
    let client = line
        .split_once("Client \"")
        .and_then(|(_, rest)| rest.split_once('"'))
        .map(|(client, _)| client.to_string());
    Some((success, user, client))
}

/// sshd: `Accepted password for alice from 10.0.0.2 port 50022 ssh2`.
fn sftp(line: &str) -> Option<Detected> {
    let (success, rest) = if let Some((_, rest)) = line.split_once("Accepted ") {
        (true, rest)
    } else if let Some((_, rest)) = line.split_once("Failed ") {
        (false, rest)
    } else {
        return None;
    };
    let mut words = rest.split_whitespace();
    let _method = words.next()?;
    if words.next()? != "for" {
        return None;
    }
    let mut user = words.next()?;
    if user == "invalid" && words.next()? == "user" {
        user = words.next()?;
    }
    let client = match words.next() {
        Some("from") => words.next().map(String::from),
        _ => None,
    };
    Some((success, Some(user.to_string()), client))
}

/// rpc.mountd: `authenticated mount request from 10.0.0.5:812 for /data (/data)`.
fn nfs(line: &str) -> Option<Detected> {
    let (success, rest) = if let Some((_, rest)) = line.split_once("authenticated mount request") {
        (true, rest)
    } else if let Some((_, rest)) = line.split_once("refused mount request") {
        (false, rest)
    } else {
        return None;
    };
    let client = rest
        .trim_start()
        .strip_prefix("from ")
        .and_then(|r| r.split_whitespace().next())
        .map(String::from);
    Some((success, None, client))
}
