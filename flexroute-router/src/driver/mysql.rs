//! MySQL driver built on `sqlx`.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode};
use sqlx::{ConnectOptions as _, Connection as _, Executor as _, Row as _};
use tracing::warn;

use flexroute_core::{DriverError, HostSpec};

use super::{BoxConnection, ConnectOptions, Connection, Connector};

/// Port used when a host entry has none.
pub const DEFAULT_PORT: u16 = 3306;

const READ_ONLY_QUERY: &str = "SELECT @@read_only";

/// Connects to MySQL servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlConnector;

impl MySqlConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }

    fn connect_options(
        host: &HostSpec,
        options: &ConnectOptions,
    ) -> Result<MySqlConnectOptions, DriverError> {
        let mut opts = MySqlConnectOptions::new()
            .host(&host.host)
            .port(host.port_or(DEFAULT_PORT))
            .username(&options.username);

        if let Some(password) = &options.password {
            opts = opts.password(password);
        }
        if let Some(database) = &options.database {
            opts = opts.database(database);
        }

        for (key, value) in &options.options {
            match key.as_str() {
                "charset" => opts = opts.charset(value),
                "ssl_mode" => {
                    let mode = value.parse::<MySqlSslMode>().map_err(|e| {
                        DriverError::Connect(format!("invalid ssl_mode {value:?}: {e}"))
                    })?;
                    opts = opts.ssl_mode(mode);
                }
                other => warn!(option = other, "ignoring unsupported mysql option"),
            }
        }

        Ok(opts)
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(
        &self,
        host: &HostSpec,
        options: &ConnectOptions,
    ) -> Result<BoxConnection, DriverError> {
        let opts = Self::connect_options(host, options)?;
        let inner = opts
            .connect()
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        Ok(Box::new(MySqlSession { inner: Some(inner) }))
    }
}

struct MySqlSession {
    inner: Option<MySqlConnection>,
}

impl MySqlSession {
    fn conn(&mut self) -> Result<&mut MySqlConnection, DriverError> {
        self.inner
            .as_mut()
            .ok_or_else(|| DriverError::Query("connection already closed".to_string()))
    }
}

/// `@@read_only` comes back signed or unsigned depending on the server.
fn read_only_flag(row: &MySqlRow) -> Result<bool, DriverError> {
    decode_flag(row.try_get::<i64, _>(0), || row.try_get::<u64, _>(0))
}

fn decode_flag<E: std::fmt::Display>(
    signed: Result<i64, E>,
    unsigned: impl FnOnce() -> Result<u64, E>,
) -> Result<bool, DriverError> {
    match signed {
        Ok(flag) => Ok(flag != 0),
        Err(_) => unsigned()
            .map(|flag| flag != 0)
            .map_err(|e| DriverError::Query(format!("unexpected read_only value: {e}"))),
    }
}

#[async_trait]
impl Connection for MySqlSession {
    async fn read_only(&mut self) -> Result<bool, DriverError> {
        let conn = self.conn()?;
        let row = sqlx::query(READ_ONLY_QUERY)
            .fetch_one(conn)
            .await
            .map_err(|e| DriverError::Query(e.to_string()))?;
        read_only_flag(&row)
    }

    async fn execute(&mut self, statement: &str) -> Result<u64, DriverError> {
        let conn = self.conn()?;
        let result = conn
            .execute(statement)
            .await
            .map_err(|e| DriverError::Query(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        match self.inner.take() {
            Some(conn) => conn
                .close()
                .await
                .map_err(|e| DriverError::Close(e.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_flag_accepts_signed_and_unsigned() {
        let mismatch = || Err::<i64, String>("mismatched types".to_string());

        assert!(decode_flag(Ok::<_, String>(1), || Ok(0)).unwrap());
        assert!(!decode_flag(Ok::<_, String>(0), || Ok(1)).unwrap());
        assert!(decode_flag(mismatch(), || Ok(1)).unwrap());
        assert!(!decode_flag(mismatch(), || Ok(0)).unwrap());

        let err = decode_flag(mismatch(), || Err("NULL".to_string())).unwrap_err();
        assert!(matches!(err, DriverError::Query(_)));
    }

    #[test]
    fn test_rejects_bad_ssl_mode() {
        let mut options = ConnectOptions {
            username: "root".to_string(),
            ..Default::default()
        };
        options
            .options
            .insert("ssl_mode".to_string(), "sometimes".to_string());

        let err = MySqlConnector::connect_options(&HostSpec::new("db", None), &options).unwrap_err();
        assert!(matches!(err, DriverError::Connect(_)));
    }

    #[test]
    fn test_accepts_known_options() {
        let mut options = ConnectOptions {
            username: "app".to_string(),
            password: Some("secret".to_string()),
            database: Some("orders".to_string()),
            ..Default::default()
        };
        options
            .options
            .insert("charset".to_string(), "utf8mb4".to_string());
        options
            .options
            .insert("ssl_mode".to_string(), "disabled".to_string());

        assert!(MySqlConnector::connect_options(&HostSpec::new("db", Some(3307)), &options).is_ok());
    }
}
