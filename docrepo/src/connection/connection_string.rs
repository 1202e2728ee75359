use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};

/// A parsed `scheme://[user[:password]@]host[,host...][/database][?key=value&...]` string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    scheme: String,
    username: Option<String>,
    password: Option<String>,
    hosts: Vec<String>,
    database: Option<String>,
    options: BTreeMap<String, String>,
}

impl ConnectionString {
    pub fn parse(value: &str) -> DocRepoResult<ConnectionString> {
        let value = value.trim();
        let (scheme, rest) = match value.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() => (scheme, rest),
            _ => return Err(invalid("missing scheme")),
        };

        let (authority, tail) = match rest.find(['/', '?']) {
            Some(pos) => rest.split_at(pos),
            None => (rest, ""),
        };

        let (credentials, host_list) = match authority.rsplit_once('@') {
            Some((credentials, hosts)) => (Some(credentials), hosts),
            None => (None, authority),
        };
        let (username, password) = match credentials {
            Some(credentials) => match credentials.split_once(':') {
                Some((user, password)) => (Some(user.to_string()), Some(password.to_string())),
                None => (Some(credentials.to_string()), None),
            },
            None => (None, None),
        };

        let hosts: Vec<String> = host_list
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect();
        if hosts.is_empty() {
            return Err(invalid("no host given"));
        }

        let (path, query) = match tail.split_once('?') {
            Some((path, query)) => (path, query),
            None => (tail, ""),
        };
        let database = path.trim_start_matches('/');
        let database = (!database.is_empty()).then(|| database.to_string());

        let mut options = BTreeMap::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() {
                return Err(invalid("empty option name"));
            }
            options.insert(key.to_string(), value.to_string());
        }

        Ok(ConnectionString {
            scheme: scheme.to_lowercase(),
            username,
            password,
            hosts,
            database,
            options,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Default database named in the path, if any.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

impl FromStr for ConnectionString {
    type Err = DocRepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionString::parse(s)
    }
}

// never prints the password
impl Display for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(username) = &self.username {
            write!(f, "{}", username)?;
            if self.password.is_some() {
                write!(f, ":****")?;
            }
            write!(f, "@")?;
        }
        write!(f, "{}", self.hosts.join(","))?;
        if let Some(database) = &self.database {
            write!(f, "/{}", database)?;
        }
        if !self.options.is_empty() {
            let query: Vec<String> = self
                .options
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            if self.database.is_none() {
                write!(f, "/")?;
            }
            write!(f, "?{}", query.join("&"))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionString({})", self)
    }
}

fn invalid(reason: &str) -> DocRepoError {
    log::error!("Invalid connection string: {}", reason);
    DocRepoError::new(
        &format!("Invalid connection string: {}", reason),
        ErrorKind::InvalidConfiguration,
    )
}
