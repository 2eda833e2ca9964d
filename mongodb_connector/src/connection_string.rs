//! A minimal model of the `mongodb://` connection string.
//!
//! Only the parts the connector reasons about are broken out: credentials, the host list,
//! the default database and the options. Everything else is carried through untouched when
//! the string is rendered back.

use std::{borrow::Cow, fmt};

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

const STANDARD_SCHEME: &str = "mongodb://";
const SRV_SCHEME: &str = "mongodb+srv://";
const REPLICA_SET_OPTION: &str = "replicaSet";
const PASSWORD_MASK: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Standard,
    Srv,
}

/// A parsed connection string.
///
/// Credentials are kept percent-encoded, as written, so [`Display`](fmt::Display) renders
/// the input back. The accessors decode them.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionString {
    scheme: Scheme,
    username: Option<String>,
    password: Option<String>,
    hosts: Vec<String>,
    database: Option<String>,
    options: Vec<(String, String)>,
}

impl ConnectionString {
    /// Parses a `mongodb://` or `mongodb+srv://` string.
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let (scheme, rest) = if let Some(rest) = input.strip_prefix(STANDARD_SCHEME) {
            (Scheme::Standard, rest)
        } else if let Some(rest) = input.strip_prefix(SRV_SCHEME) {
            (Scheme::Srv, rest)
        } else {
            return Err(anyhow::anyhow!(
                "Connection string must start with `{}` or `{}`",
                STANDARD_SCHEME,
                SRV_SCHEME
            ));
        };

        let (authority, path) = match rest.find(['/', '?']) {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        // Credentials may contain '@' only when percent-encoded, so the last one delimits them.
        let (userinfo, host_list) = match authority.rsplit_once('@') {
            Some((userinfo, hosts)) => (Some(userinfo), hosts),
            None => (None, authority),
        };
        let (username, password) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
                None => (Some(info.to_string()), None),
            },
            None => (None, None),
        };

        let hosts = host_list
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if hosts.is_empty() {
            return Err(anyhow::anyhow!(
                "Connection string `{}` does not name any host",
                redact(input)
            ));
        }

        let path = path.strip_prefix('/').unwrap_or(path);
        let (database, query) = path.split_once('?').unwrap_or((path, ""));
        let database = (!database.is_empty()).then(|| database.to_string());
        let options = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect::<Vec<_>>();

        Ok(Self {
            scheme,
            username,
            password,
            hosts,
            database,
            options,
        })
    }

    /// Builds a standard connection string for a comma separated host list.
    pub fn from_hosts(host_list: &str) -> anyhow::Result<Self> {
        Self::parse(&format!("{}{}/", STANDARD_SCHEME, host_list))
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// The percent-decoded user name.
    pub fn username(&self) -> Option<Cow<'_, str>> {
        self.username.as_deref().map(decode)
    }

    /// The percent-decoded password.
    pub fn password(&self) -> Option<Cow<'_, str>> {
        self.password.as_deref().map(decode)
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Returns the first value of option `key`, compared case-insensitively.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn replica_set(&self) -> Option<&str> {
        self.option(REPLICA_SET_OPTION)
    }

    /// Returns a copy with option `key` set to `value`, replacing any existing value.
    pub fn with_option(&self, key: &str, value: &str) -> Self {
        let mut copy = self.clone();
        copy.options.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        copy.options.push((key.to_string(), value.to_string()));
        copy
    }

    pub fn with_replica_set(&self, replica_set_name: &str) -> Self {
        self.with_option(REPLICA_SET_OPTION, replica_set_name)
    }

    /// The rendered string with the password replaced by `***`, for logs and errors.
    pub fn masked(&self) -> String {
        redact(&self.to_string()).into_owned()
    }
}

fn decode(value: &str) -> Cow<'_, str> {
    percent_decode_str(value).decode_utf8_lossy()
}

/// Replaces the password in `input` with `***`.
///
/// Input without a `user:password@` part is returned as is.
pub fn redact(input: &str) -> Cow<'_, str> {
    let scheme_end = match input.find("://") {
        Some(idx) => idx + "://".len(),
        None => return Cow::Borrowed(input),
    };
    let rest = &input[scheme_end..];
    let authority = &rest[..rest.find(['/', '?']).unwrap_or(rest.len())];
    let userinfo = match authority.rsplit_once('@') {
        Some((userinfo, _)) => userinfo,
        None => return Cow::Borrowed(input),
    };
    match userinfo.split_once(':') {
        Some((user, _)) => Cow::Owned(format!(
            "{}{}:{}{}",
            &input[..scheme_end],
            user,
            PASSWORD_MASK,
            &rest[userinfo.len()..]
        )),
        None => Cow::Borrowed(input),
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| PASSWORD_MASK))
            .field("hosts", &self.hosts)
            .field("database", &self.database)
            .field("options", &self.options)
            .finish()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::Standard => f.write_str(STANDARD_SCHEME)?,
            Scheme::Srv => f.write_str(SRV_SCHEME)?,
        }
        if let Some(user) = &self.username {
            f.write_str(user)?;
            if let Some(pass) = &self.password {
                write!(f, ":{}", pass)?;
            }
            f.write_str("@")?;
        }
        write!(f, "{}/", self.hosts.join(","))?;
        if let Some(db) = &self.database {
            f.write_str(db)?;
        }
        if !self.options.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.options.iter())
                .finish();
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}
