//! Connection settings for the document database.
//!
//! Where the URL comes from (flag, environment, config file) is decided by
//! the caller; this type only carries it and knows how to take it apart.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL, possibly with credentials.
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// A connection URL split around its database path.
struct UrlParts<'a> {
    /// Scheme and authority, e.g. `postgresql://user:pw@host:5432`.
    base: &'a str,
    /// Everything between the first `/` after the authority and the query.
    path: &'a str,
    query: Option<&'a str>,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/vowplan";

    /// Three concurrent record writes per request, a handful of requests.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    fn parts(&self) -> UrlParts<'_> {
        let (rest, query) = match self.database_url.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (self.database_url.as_str(), None),
        };
        let authority_start = rest.find("://").map_or(0, |i| i + 3);
        match rest[authority_start..].find('/') {
            Some(i) => UrlParts {
                base: &rest[..authority_start + i],
                path: &rest[authority_start + i + 1..],
                query,
            },
            None => UrlParts {
                base: rest,
                path: "",
                query,
            },
        }
    }

    /// The database name from the URL path. `None` when the path is empty.
    pub fn database_name(&self) -> Option<&str> {
        Some(self.parts().path).filter(|p| !p.is_empty() && !p.contains('/'))
    }

    /// Same server and options, but the `postgres` maintenance database.
    /// Used to issue `CREATE DATABASE` when the target does not exist yet.
    pub fn maintenance_url(&self) -> String {
        let parts = self.parts();
        match parts.query {
            Some(query) => format!("{}/postgres?{query}", parts.base),
            None => format!("{}/postgres", parts.base),
        }
    }

    /// The URL with any password replaced by `***`, for logs and errors.
    pub fn redacted_url(&self) -> String {
        redact(&self.database_url)
    }
}

fn redact(url: &str) -> String {
    let start = url.find("://").map_or(0, |i| i + 3);
    let end = url[start..]
        .find(['/', '?'])
        .map_or(url.len(), |i| start + i);
    let Some((userinfo, host)) = url[start..end].rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _password)) => {
            format!("{}{user}:***@{host}{}", &url[..start], &url[end..])
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_name(), Some("vowplan"));
        assert_eq!(cfg.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn database_name_strips_query_string() {
        let cfg = DbConfig::new("postgresql://localhost:5432/planner?sslmode=disable");
        assert_eq!(cfg.database_name(), Some("planner"));
    }

    #[test]
    fn database_name_missing() {
        assert_eq!(DbConfig::new("postgresql://localhost:5432/").database_name(), None);
        assert_eq!(DbConfig::new("postgresql://localhost:5432").database_name(), None);
    }

    #[test]
    fn maintenance_url_keeps_credentials_and_options() {
        let cfg = DbConfig::new("postgresql://app:pw@db.internal:5432/vowplan?sslmode=require");
        assert_eq!(
            cfg.maintenance_url(),
            "postgresql://app:pw@db.internal:5432/postgres?sslmode=require"
        );
        assert_eq!(
            DbConfig::new("postgresql://localhost:5432/vowplan").maintenance_url(),
            "postgresql://localhost:5432/postgres"
        );
    }

    #[test]
    fn redaction_hides_only_the_password() {
        let cfg = DbConfig::new("postgresql://app:s3cret@db:5432/vowplan?sslmode=require");
        assert_eq!(
            cfg.redacted_url(),
            "postgresql://app:***@db:5432/vowplan?sslmode=require"
        );
        assert_eq!(
            DbConfig::new("postgresql://app@db/vowplan").redacted_url(),
            "postgresql://app@db/vowplan"
        );
        assert_eq!(
            DbConfig::new(DbConfig::DEFAULT_URL).redacted_url(),
            DbConfig::DEFAULT_URL
        );
    }

    #[test]
    fn pool_size_is_at_least_one() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL).with_max_connections(0);
        assert_eq!(cfg.max_connections, 1);
    }
}
