use crate::Result;

use tablet_core::{
    async_trait,
    driver::{Capability, Connection, Driver},
    err, Error,
};
use url::Url;

/// A driver picked from a connection URL's scheme.
#[derive(Debug)]
pub struct Connect {
    driver: Box<dyn Driver>,
}

impl Connect {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(Error::driver_operation_failed)?;

        let driver = match url.scheme() {
            "mysql" => connect_mysql(&url)?,
            "sqlite" => connect_sqlite(&url)?,
            scheme => return Err(err!("unsupported database; scheme={scheme}; url={url}")),
        };

        Ok(Self { driver })
    }
}

#[async_trait]
impl Driver for Connect {
    fn capability(&self) -> &'static Capability {
        self.driver.capability()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        self.driver.connect().await
    }

    fn max_connections(&self) -> Option<usize> {
        self.driver.max_connections()
    }
}

#[cfg(feature = "mysql")]
fn connect_mysql(url: &Url) -> Result<Box<dyn Driver>> {
    Ok(Box::new(tablet_driver_mysql::MySQL::new(url.as_str())?))
}

#[cfg(not(feature = "mysql"))]
fn connect_mysql(_url: &Url) -> Result<Box<dyn Driver>> {
    Err(err!("`mysql` feature not enabled"))
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &Url) -> Result<Box<dyn Driver>> {
    Ok(Box::new(tablet_driver_sqlite::Sqlite::new(url.as_str())?))
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(_url: &Url) -> Result<Box<dyn Driver>> {
    Err(err!("`sqlite` feature not enabled"))
}
