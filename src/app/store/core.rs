use std::io::ErrorKind;

use anyhow::Context;
use tokio::task::JoinHandle;

use crate::{
    ArcPath,
    app::config::{Config, PathOpt},
    fs::Fs,
    log::Log,
};

use super::{
    data::{TableName, Tables},
    message::Message,
};

const SCOPE: &str = "store";

/// Owns the cache tables. Messages are served one at a time, which makes
/// every upsert whole: no reader ever sees half of a write.
#[derive(Debug)]
pub struct Core {
    fs: Fs,
    log: Log,
    cache_dir: ArcPath,
    tables: Tables,
}

impl Core {
    /// Loads every table found under the configured cache directory.
    ///
    /// # Errors
    /// If the directory cannot be created or a table file exists but cannot
    /// be read. A file that does not parse is logged and replaced by an empty
    /// table.
    pub async fn build(fs: Fs, config: Config, log: Log) -> anyhow::Result<Self> {
        let cache_dir = config.path(PathOpt::CacheDir).await;
        fs.mkdir(cache_dir.clone())
            .await
            .with_context(|| format!("Creating cache directory {}", cache_dir.display()))?;

        let mut core = Self {
            fs,
            log,
            cache_dir,
            tables: Tables::new(config.ttls().await),
        };
        for table in TableName::ALL {
            core.load(table).await?;
        }
        Ok(core)
    }

    fn table_path(&self, table: TableName) -> ArcPath {
        ArcPath::from(self.cache_dir.join(table.file_name()).as_path())
    }

    async fn load(&mut self, table: TableName) -> anyhow::Result<()> {
        let path = self.table_path(table);
        let contents = match self.fs.read_to_string(path.clone()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("Reading cache table {}", path.display()));
            }
        };

        if let Err(e) = self.tables.load_toml(table, &contents) {
            self.log.warn(
                SCOPE,
                format!("Discarding unreadable cache table {}: {e}", path.display()),
            );
        }
        Ok(())
    }

    async fn persist(&self, table: TableName) -> anyhow::Result<()> {
        let path = self.table_path(table);
        let contents = self
            .tables
            .to_toml(table)
            .with_context(|| format!("Serializing cache table {}", table.file_name()))?;
        self.fs
            .write(path.clone(), contents)
            .await
            .with_context(|| format!("Writing cache table {}", path.display()))
    }

    /// Applies `change` to `table` and writes the table out when `dirty`
    /// holds for the outcome. If the write fails the table is put back, so
    /// memory never runs ahead of disk.
    async fn commit<T>(
        &mut self,
        table: TableName,
        change: impl FnOnce(&mut Tables) -> T,
        dirty: impl FnOnce(&T) -> bool,
    ) -> anyhow::Result<T> {
        let before = self.tables.snapshot(table);
        let outcome = change(&mut self.tables);
        if !dirty(&outcome) {
            return Ok(outcome);
        }
        if let Err(e) = self.persist(table).await {
            self.tables.restore(table, before);
            return Err(e);
        }
        Ok(outcome)
    }

    pub fn spawn(mut self) -> (super::Store, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                self.serve(message).await;
            }
        });
        (super::Store::Actual(tx), handle)
    }

    async fn serve(&mut self, message: Message) {
        use Message::*;
        let always = |_: &()| true;
        match message {
            Handle { handle, now, tx } => {
                let _ = tx.send(self.tables.handle(&handle, now));
            }
            PutHandle {
                handle,
                did,
                now,
                tx,
            } => {
                let res = self
                    .commit(TableName::Handles, |t| t.put_handle(&handle, did, now), always)
                    .await;
                let _ = tx.send(res);
            }
            StorageHost { did, now, tx } => {
                let _ = tx.send(self.tables.storage_host(&did, now));
            }
            PutStorageHost { did, host, now, tx } => {
                let res = self
                    .commit(
                        TableName::StorageHosts,
                        |t| t.put_storage_host(&did, host, now),
                        always,
                    )
                    .await;
                let _ = tx.send(res);
            }
            AuthorPage {
                did,
                collection,
                cursor,
                now,
                tx,
            } => {
                let _ = tx.send(
                    self.tables
                        .author_page(&did, &collection, cursor.as_deref(), now),
                );
            }
            PutAuthorPage {
                did,
                collection,
                cursor,
                page,
                now,
                tx,
            } => {
                let res = self
                    .commit(
                        TableName::AuthorPages,
                        |t| t.put_author_page(&did, &collection, cursor.as_deref(), page, now),
                        always,
                    )
                    .await;
                let _ = tx.send(res);
            }
            Follows { viewer, now, tx } => {
                let _ = tx.send(self.tables.follows(&viewer, now));
            }
            PutFollows {
                viewer,
                follows,
                now,
                tx,
            } => {
                let res = self
                    .commit(TableName::Follows, |t| t.put_follows(&viewer, follows, now), always)
                    .await;
                let _ = tx.send(res);
            }
            Profile { did, now, tx } => {
                let _ = tx.send(self.tables.profile(&did, now));
            }
            PutProfile {
                did,
                profile,
                now,
                tx,
            } => {
                let res = self
                    .commit(TableName::Profiles, |t| t.put_profile(&did, profile, now), always)
                    .await;
                let _ = tx.send(res);
            }
            AccountIndex { category, now, tx } => {
                let _ = tx.send(self.tables.account_index(&category, now));
            }
            PutAccountIndex {
                category,
                accounts,
                now,
                tx,
            } => {
                let res = self
                    .commit(
                        TableName::AccountIndex,
                        |t| t.put_account_index(&category, accounts, now),
                        always,
                    )
                    .await;
                let _ = tx.send(res);
            }
            PrependToIndex { category, did, tx } => {
                let res = self
                    .commit(
                        TableName::AccountIndex,
                        |t| t.prepend_to_index(&category, did),
                        |changed| *changed,
                    )
                    .await;
                let _ = tx.send(res);
            }
            Activity {
                category,
                did,
                now,
                tx,
            } => {
                let _ = tx.send(self.tables.activity(&category, &did, now));
            }
            PutActivities { records, tx } => {
                let dirty = !records.is_empty();
                let res = self
                    .commit(
                        TableName::Activity,
                        |t| records.into_iter().for_each(|r| t.put_activity(r)),
                        |_| dirty,
                    )
                    .await;
                let _ = tx.send(res);
            }
            TrimActivity { max, tx } => {
                let res = self
                    .commit(
                        TableName::Activity,
                        |t| t.trim_activity(max),
                        |removed| *removed > 0,
                    )
                    .await;
                if let Ok(removed) = &res {
                    if *removed > 0 {
                        self.log
                            .info(SCOPE, format!("Evicted {removed} activity records"));
                    }
                }
                let _ = tx.send(res);
            }
            SeenMarkers { viewer, tx } => {
                let _ = tx.send(self.tables.seen_markers(&viewer));
            }
            MarkSeen {
                viewer,
                author,
                created_at,
                tx,
            } => {
                let res = self
                    .commit(
                        TableName::Seen,
                        |t| t.mark_seen(&viewer, &author, created_at),
                        |moved| *moved,
                    )
                    .await;
                let _ = tx.send(res);
            }
            DeleteExpired { now, tx } => {
                let _ = tx.send(self.delete_expired(now).await);
            }
        }
    }

    /// Sweeps every table, then writes out those that lost entries. Tables
    /// whose write fails, and those after it, go back to their swept-out
    /// state.
    async fn delete_expired(&mut self, now: chrono::DateTime<chrono::Utc>) -> anyhow::Result<usize> {
        let before = self.tables.clone();
        let swept = self.tables.delete_expired(now);

        let mut total = 0;
        for (i, &(table, removed)) in swept.iter().enumerate() {
            if let Err(e) = self.persist(table).await {
                for &(table, _) in &swept[i..] {
                    self.tables.restore(table, before.snapshot(table));
                }
                return Err(e);
            }
            self.log.info(
                SCOPE,
                format!("Deleted {removed} expired entries from {}", table.file_name()),
            );
            total += removed;
        }
        Ok(total)
    }
}
