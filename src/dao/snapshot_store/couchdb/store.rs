use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::{
    dao::{
        snapshot_store::SnapshotStore,
        storage::{StorageError, StorageResult},
    },
    state::match_state::{MatchState, Settings},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchRecordDocument, LAST_MATCH_DOC_ID, SETTINGS_DOC_ID},
};

/// Snapshot store keeping both records as documents of a CouchDB database.
#[derive(Clone)]
pub struct CouchSnapshotStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchSnapshotStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);
        let mut builder = self.client.get(&url);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
        }

        let response = builder
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let mut builder = self.client.put(&url);
                if let Some((ref user, ref pass)) = self.auth {
                    builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
                }
                let create =
                    builder
                        .send()
                        .await
                        .map_err(|source| CouchDaoError::DatabaseCreate {
                            database: database.clone(),
                            source,
                        })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document(&self, doc_id: &str) -> CouchResult<Option<CouchRecordDocument>> {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchRecordDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document(&self, document: &CouchRecordDocument) -> CouchResult<()> {
        let response = self
            .request(Method::PUT, &document.id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: document.id.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: document.id.clone(),
                status: response.status(),
            })
        }
    }

    /// Overwrite a record, carrying over the current revision.
    async fn replace_record<T: Serialize>(&self, doc_id: &str, record: &T) -> StorageResult<()> {
        let body = serde_json::to_value(record).map_err(|err| {
            StorageError::malformed(format!("failed to encode `{doc_id}`"), err)
        })?;
        let rev = self.get_document(doc_id).await?.and_then(|doc| doc.rev);
        let document = CouchRecordDocument::new(doc_id, rev, body);
        self.put_document(&document).await.map_err(Into::into)
    }

    async fn load_record(&self, doc_id: &str) -> StorageResult<Option<Value>> {
        let document = self.get_document(doc_id).await?;
        Ok(document.map(CouchRecordDocument::into_record))
    }
}

impl SnapshotStore for CouchSnapshotStore {
    fn load_last_match(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        Box::pin(async move { store.load_record(LAST_MATCH_DOC_ID).await })
    }

    fn save_last_match(&self, state: MatchState) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.replace_record(LAST_MATCH_DOC_ID, &state).await })
    }

    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        Box::pin(async move { store.load_record(SETTINGS_DOC_ID).await })
    }

    fn save_settings(&self, settings: Settings) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.replace_record(SETTINGS_DOC_ID, &settings).await })
    }
}
