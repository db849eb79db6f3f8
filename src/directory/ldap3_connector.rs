use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};

use super::{DirectoryError, DirectoryResult, LdapConnector, LdapEntry};
use crate::config::LdapConfig;

/// `noSuchObject` result code.
const RC_NO_SUCH_OBJECT: u32 = 32;

/// [`LdapConnector`] over a plain `ldap://` connection.
#[derive(Debug, Clone)]
pub struct Ldap3Connector {
    url: String,
    connect_timeout: Duration,
}

impl Ldap3Connector {
    pub fn new(config: &LdapConfig) -> Self {
        Self {
            url: config.url(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    async fn connect(&self) -> DirectoryResult<Ldap> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.url)
            .await
            .map_err(backend)?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::debug!(error = %e, "LDAP connection closed with error");
            }
        });

        Ok(ldap)
    }
}

fn backend(e: LdapError) -> DirectoryError {
    DirectoryError::Backend(e.to_string())
}

#[async_trait]
impl LdapConnector for Ldap3Connector {
    async fn bind(&self, dn: &str, password: &str) -> DirectoryResult<()> {
        let mut ldap = self.connect().await?;
        let result = match ldap.simple_bind(dn, password).await {
            Ok(res) => res.success().map(|_| ()),
            Err(e) => Err(e),
        };
        let _ = ldap.unbind().await;
        result.map_err(backend)
    }

    async fn read_entry(
        &self,
        dn: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Option<LdapEntry>> {
        let mut ldap = self.connect().await?;
        let result = match ldap
            .search(dn, Scope::Base, "(objectClass=*)", attributes.to_vec())
            .await
        {
            Ok(res) => res.success(),
            Err(e) => Err(e),
        };
        let _ = ldap.unbind().await;

        match result {
            Ok((entries, _)) => Ok(entries.into_iter().next().map(|entry| {
                let entry = SearchEntry::construct(entry);
                LdapEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })),
            Err(LdapError::LdapResult { result }) if result.rc == RC_NO_SUCH_OBJECT => Ok(None),
            Err(e) => Err(backend(e)),
        }
    }
}
