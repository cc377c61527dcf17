use anyhow::{Context, bail};
use reqwest::Url;
use tokio::task::JoinHandle;

use crate::{
    ArcStr,
    app::{
        config::{Config, StrOpt},
        store::Store,
    },
    log::Log,
    net::Net,
};

use super::{
    data::{AccountPage, Did, PageQuery, PostPage, PostQuery, ProfileSummary},
    message::Message,
    parse,
};

const SCOPE: &str = "api.atproto";
/// Largest page `app.bsky.graph.getFollows` accepts
const FOLLOWS_PAGE: usize = 100;

/// Builds `{base}/xrpc/{nsid}?{params}` with the parameters form-encoded.
pub fn xrpc_url(base: &str, nsid: &str, params: &[(&str, &str)]) -> anyhow::Result<ArcStr> {
    let url = Url::parse_with_params(
        &format!("{}/xrpc/{nsid}", base.trim_end_matches('/')),
        params,
    )
    .with_context(|| format!("Building URL for {nsid}"))?;
    Ok(ArcStr::from(url.as_str()))
}

/// Where the DID document of `did` is published.
pub fn did_document_url(plc: &str, did: &str) -> anyhow::Result<ArcStr> {
    if did.starts_with("did:plc:") {
        return Ok(ArcStr::from(format!("{}/{did}", plc.trim_end_matches('/')).as_str()));
    }

    let Some(rest) = did.strip_prefix("did:web:") else {
        bail!("Unsupported DID method: {did}");
    };
    let mut parts = rest.split(':');
    let host = parts.next().unwrap_or_default().replace("%3A", ":");
    if host.is_empty() {
        bail!("Malformed did:web identifier: {did}");
    }
    let path: Vec<&str> = parts.collect();
    let url = if path.is_empty() {
        format!("https://{host}/.well-known/did.json")
    } else {
        format!("https://{host}/{}/did.json", path.join("/"))
    };
    Ok(ArcStr::from(url.as_str()))
}

/// Talks XRPC over the [`Net`] actor. Handle and storage host lookups are
/// cached in the [`Store`].
///
/// Each message is served by its own task, so one slow storage host does not
/// hold up requests to other hosts.
#[derive(Debug, Clone)]
pub struct Core {
    net: Net,
    store: Store,
    log: Log,
    appview: ArcStr,
    relay: ArcStr,
    plc: ArcStr,
}

impl Core {
    pub async fn new(net: Net, store: Store, config: Config, log: Log) -> Self {
        Self {
            net,
            store,
            log,
            appview: config.string(StrOpt::AppViewUrl).await,
            relay: config.string(StrOpt::RelayUrl).await,
            plc: config.string(StrOpt::PlcUrl).await,
        }
    }

    pub fn spawn(self) -> (super::AtprotoApi, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let core = self.clone();
                tokio::spawn(async move { core.serve(message).await });
            }
        });
        (super::AtprotoApi::Actual(tx), handle)
    }

    async fn serve(self, message: Message) {
        match message {
            Message::ResolveHandle { handle, tx } => {
                let _ = tx.send(self.resolve_handle(&handle).await);
            }
            Message::ResolveStorageHost { did, tx } => {
                let _ = tx.send(self.resolve_storage_host(&did).await);
            }
            Message::ResolveFollows { viewer, cap, tx } => {
                let _ = tx.send(self.resolve_follows(&viewer, cap).await);
            }
            Message::ListRecentPosts {
                host,
                did,
                query,
                tx,
            } => {
                let _ = tx.send(self.list_recent_posts(&host, &did, &query).await);
            }
            Message::ListAccountsByCategory {
                category,
                query,
                tx,
            } => {
                let _ = tx.send(self.list_accounts_by_category(&category, &query).await);
            }
            Message::FetchProfileSummary { did, tx } => {
                let _ = tx.send(self.fetch_profile_summary(&did).await);
            }
        }
    }

    async fn resolve_handle(&self, handle: &str) -> anyhow::Result<Did> {
        let handle = handle.trim_start_matches('@');
        if handle.starts_with("did:") {
            return Ok(Did::from(handle));
        }
        if let Some(did) = self.store.handle(handle.into()).await {
            return Ok(did);
        }

        let url = xrpc_url(
            &self.appview,
            "com.atproto.identity.resolveHandle",
            &[("handle", handle)],
        )?;
        let did = parse::resolved_handle(&self.net.get(url).await?)?;
        self.store.put_handle(handle.into(), did.clone()).await?;
        Ok(did)
    }

    async fn resolve_storage_host(&self, did: &str) -> anyhow::Result<ArcStr> {
        if let Some(host) = self.store.storage_host(did.into()).await {
            return Ok(host);
        }

        let url = did_document_url(&self.plc, did)?;
        let body = self
            .net
            .get(url)
            .await
            .with_context(|| format!("Fetching DID document of {did}"))?;
        let host = parse::storage_host(&body).with_context(|| format!("Resolving {did}"))?;
        self.store.put_storage_host(did.into(), host.clone()).await?;
        Ok(host)
    }

    /// Pages through the social graph until `cap` accounts are collected.
    /// A failure after the first page ends the walk with what was gathered.
    async fn resolve_follows(&self, viewer: &str, cap: usize) -> anyhow::Result<Vec<Did>> {
        let mut follows = Vec::new();
        let mut cursor: Option<ArcStr> = None;
        let limit = FOLLOWS_PAGE.to_string();

        while follows.len() < cap {
            let mut params = vec![("actor", viewer), ("limit", limit.as_str())];
            if let Some(cursor) = &cursor {
                params.push(("cursor", &**cursor));
            }
            let url = xrpc_url(&self.appview, "app.bsky.graph.getFollows", &params)?;

            let page = match self.net.get(url).await.and_then(|body| parse::follows(&body)) {
                Ok(page) => page,
                Err(e) if follows.is_empty() => {
                    return Err(e).with_context(|| format!("Fetching follows of {viewer}"));
                }
                Err(e) => {
                    self.log.warn(
                        SCOPE,
                        format!("Follow list of {viewer} cut short at {}: {e:#}", follows.len()),
                    );
                    break;
                }
            };

            let (dids, next) = page;
            follows.extend(dids);
            cursor = next;
            if cursor.is_none() {
                break;
            }
        }

        follows.truncate(cap);
        Ok(follows)
    }

    async fn list_recent_posts(
        &self,
        host: &str,
        did: &str,
        query: &PostQuery,
    ) -> anyhow::Result<PostPage> {
        let limit = query.limit.to_string();
        let mut params = vec![
            ("repo", did),
            ("collection", &*query.collection),
            ("limit", limit.as_str()),
        ];
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", &**cursor));
        }
        if query.newest_first {
            params.push(("reverse", "true"));
        }

        let url = xrpc_url(host, "com.atproto.repo.listRecords", &params)?;
        parse::post_page(&self.net.get(url).await?)
    }

    async fn list_accounts_by_category(
        &self,
        category: &str,
        query: &PageQuery,
    ) -> anyhow::Result<AccountPage> {
        let limit = query.limit.to_string();
        let mut params = vec![("collection", category), ("limit", limit.as_str())];
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", &**cursor));
        }

        let url = xrpc_url(&self.relay, "com.atproto.sync.listReposByCollection", &params)?;
        parse::account_page(&self.net.get(url).await?)
    }

    async fn fetch_profile_summary(&self, did: &str) -> anyhow::Result<ProfileSummary> {
        let url = xrpc_url(&self.appview, "app.bsky.actor.getProfile", &[("actor", did)])?;
        parse::profile(&self.net.get(url).await?)
    }
}
