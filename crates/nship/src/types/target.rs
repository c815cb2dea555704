use serde::{Deserialize, Serialize};

pub const DEFAULT_SSH_PORT: u16 = 22;

fn default_port() -> u16 {
  DEFAULT_SSH_PORT
}

/// A remote host that jobs are deployed to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Target {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  pub host: String,
  pub user: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
  #[serde(
    default,
    rename = "private_key",
    alias = "private-key",
    skip_serializing_if = "Option::is_none"
  )]
  pub private_key: Option<String>,
  #[serde(default = "default_port")]
  pub port: u16,
}

impl Target {
  pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
    Target {
      name: None,
      host: host.into(),
      user: user.into(),
      password: None,
      private_key: None,
      port: DEFAULT_SSH_PORT,
    }
  }

  pub fn name(&self) -> &str {
    match &self.name {
      Some(name) if !name.is_empty() => name,
      _ => &self.host,
    }
  }

  /// `host:port`, with IPv6 literals in brackets.
  pub fn address(&self) -> String {
    if self.host.contains(':') && !self.host.starts_with('[') {
      format!("[{}]:{}", self.host, self.port)
    } else {
      format!("{}:{}", self.host, self.port)
    }
  }

  pub fn has_auth(&self) -> bool {
    let non_empty = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());

    non_empty(&self.password) || non_empty(&self.private_key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_name_defaults_to_host() {
    let mut target = Target::new("10.0.0.1", "deploy");
    assert_eq!(target.name(), "10.0.0.1");

    target.name = Some(String::new());
    assert_eq!(target.name(), "10.0.0.1");

    target.name = Some("web".to_string());
    assert_eq!(target.name(), "web");
  }

  #[test]
  fn test_port_default() {
    let target: Target = serde_yaml::from_str("host: example.com\nuser: root\n").unwrap();

    assert_eq!(target.port, 22);
    assert_eq!(target.address(), "example.com:22");
    assert!(!target.has_auth());
  }

  #[test]
  fn test_address() {
    let mut target = Target::new("example.com", "deploy");
    assert_eq!(target.address(), "example.com:22");

    target.host = "::1".to_string();
    target.port = 2222;
    assert_eq!(target.address(), "[::1]:2222");

    target.host = "[fe80::1]".to_string();
    assert_eq!(target.address(), "[fe80::1]:2222");

    let resolved: Vec<std::net::SocketAddr> =
      std::net::ToSocketAddrs::to_socket_addrs(&Target::new("::1", "root").address())
        .unwrap()
        .collect();
    assert_eq!(resolved, vec!["[::1]:22".parse().unwrap()]);
  }

  #[test]
  fn test_has_auth() {
    let mut target = Target::new("example.com", "root");
    target.private_key = Some("~/.ssh/id_ed25519".to_string());

    assert!(target.has_auth());
  }
}
