//! Generation and entry CRUD operations.
//!
//! A generation is a named container of response snapshots; the store keeps
//! any number of them, but the manager only ever serves from the one it has
//! promoted. Entry writes are last-write-wins by request key.

use super::connection::GenerationStore;
use crate::Error;
use crate::snapshot::Snapshot;
use bytes::Bytes;
use serde::Serialize;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Summary of one stored generation, as reported by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationInfo {
    pub name: String,
    pub ready: bool,
    pub entries: u64,
    pub created_at: String,
}

fn encode_headers(snapshot: &Snapshot) -> Result<String, Error> {
    serde_json::to_string(&snapshot.headers).map_err(|e| Error::Encoding(e.to_string()))
}

fn decode_headers(json: &str) -> Result<Vec<(String, String)>, Error> {
    serde_json::from_str(json).map_err(|e| Error::Encoding(e.to_string()))
}

impl GenerationStore {
    /// Create the named generation if it does not exist yet.
    ///
    /// A pre-existing generation keeps its entries and ready flag; reopening
    /// is a no-op so a restart never clobbers a ready generation.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, ready, created_at) VALUES (?1, 0, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Write the full precache result for an install in one transaction.
    ///
    /// All-or-nothing: either every snapshot lands or none does. The ready
    /// flag is not touched here; `mark_ready` is the install's commit point.
    pub async fn install_entries(&self, generation: &str, snapshots: Vec<Snapshot>) -> Result<(), Error> {
        let generation = generation.to_string();
        let mut rows = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            rows.push((encode_headers(snapshot)?, snapshot.clone()));
        }

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (headers_json, snapshot) in &rows {
                    tx.execute(
                        "INSERT OR REPLACE INTO entries
                            (generation, key, method, url, status, content_type, headers_json, body, fetched_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            generation,
                            snapshot.key,
                            snapshot.method,
                            snapshot.url,
                            snapshot.status,
                            snapshot.content_type,
                            headers_json,
                            snapshot.body.as_ref(),
                            snapshot.fetched_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Flip the named generation's ready flag.
    pub async fn mark_ready(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("UPDATE generations SET ready = 1 WHERE name = ?1", params![name])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// True if the named generation exists and is ready.
    pub async fn is_ready(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let ready: Option<bool> = conn
                    .query_row("SELECT ready FROM generations WHERE name = ?1", params![name], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(ready.unwrap_or(false))
            })
            .await
            .map_err(Error::from)
    }

    /// Store one snapshot in the named generation (last write wins).
    pub async fn put_entry(&self, generation: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let generation = generation.to_string();
        let headers_json = encode_headers(snapshot)?;
        let snapshot = snapshot.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO entries
                        (generation, key, method, url, status, content_type, headers_json, body, fetched_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        generation,
                        snapshot.key,
                        snapshot.method,
                        snapshot.url,
                        snapshot.status,
                        snapshot.content_type,
                        headers_json,
                        snapshot.body.as_ref(),
                        snapshot.fetched_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a stored snapshot by request key.
    pub async fn get_entry(&self, generation: &str, key: &str) -> Result<Option<Snapshot>, Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let row = conn
                    .query_row(
                        "SELECT key, method, url, status, content_type, headers_json, body, fetched_at
                         FROM entries WHERE generation = ?1 AND key = ?2",
                        params![generation, key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, u16>(3)?,
                                row.get::<_, Option<String>>(4)?,
                                row.get::<_, String>(5)?,
                                row.get::<_, Vec<u8>>(6)?,
                                row.get::<_, String>(7)?,
                            ))
                        },
                    )
                    .optional()?;

                match row {
                    None => Ok(None),
                    Some((key, method, url, status, content_type, headers_json, body, fetched_at)) => {
                        Ok(Some(Snapshot {
                            key,
                            method,
                            url,
                            status,
                            content_type,
                            headers: decode_headers(&headers_json)?,
                            body: Bytes::from(body),
                            fetched_at,
                        }))
                    }
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in the named generation.
    pub async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Every stored generation, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.ready, g.created_at,
                            (SELECT COUNT(*) FROM entries e WHERE e.generation = g.name)
                     FROM generations g ORDER BY g.created_at ASC, g.name ASC",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(GenerationInfo {
                        name: row.get(0)?,
                        ready: row.get(1)?,
                        created_at: row.get(2)?,
                        entries: row.get::<_, i64>(3)? as u64,
                    })
                })?;

                let mut generations = Vec::new();
                for info in rows {
                    generations.push(info?);
                }
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the named generation and, by cascade, all its entries.
    pub async fn delete_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Newest ready generation, if any. Used as the fallback target when a
    /// fresh install dies.
    pub async fn newest_ready(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let name = conn
                    .query_row(
                        "SELECT name FROM generations WHERE ready = 1 ORDER BY created_at DESC, name DESC LIMIT 1",
                        [],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(name)
            })
            .await
            .map_err(Error::from)
    }
}
